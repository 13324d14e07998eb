use clap::Subcommand;
use serde_json::json;

use crate::auth::users::hash_password;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Hash a password for the user store")]
    HashPassword {
        #[arg(help = "Plain-text password")]
        password: String,
    },
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        UserCommands::HashPassword { password } => {
            let hash = hash_password(&password)?;

            match output_format {
                OutputFormat::Json => output_success(&output_format, "Password hashed", Some(json!({ "password": hash }))),
                OutputFormat::Text => {
                    println!("{}", hash);
                    Ok(())
                }
            }
        }
    }
}
