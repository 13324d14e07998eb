use clap::Subcommand;
use serde_json::json;

use crate::auth::TrackTokenService;
use crate::cli::utils::{output_error, output_rows, output_success};
use crate::cli::OutputFormat;
use crate::config;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Sign a track token for one organism/assembly")]
    Issue {
        #[arg(help = "Organism name")]
        organism: String,
        #[arg(help = "Assembly name")]
        assembly: String,
        #[arg(long, help = "Lifetime in seconds (defaults to the configured TTL)")]
        ttl: Option<i64>,
    },

    #[command(about = "Verify a track token and print its scope")]
    Verify {
        #[arg(help = "Token string")]
        token: String,
        #[arg(long, help = "Accept an expired token if the signature is valid")]
        ignore_expiry: bool,
    },
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config::config();

    match cmd {
        TokenCommands::Issue { organism, assembly, ttl } => {
            let ttl = ttl.map(chrono::Duration::seconds).unwrap_or_else(|| config.token_ttl());
            let service = TrackTokenService::from_key_files(
                config.tokens.private_key_path.as_deref(),
                config.tokens.public_key_path.as_deref(),
                ttl,
            );
            let token = service.issue_token(&organism, &assembly)?;

            match output_format {
                OutputFormat::Json => output_success(
                    &output_format,
                    "Token issued",
                    Some(json!({
                        "organism": organism,
                        "assembly": assembly,
                        "expires_in": ttl.num_seconds(),
                        "token": token,
                    })),
                ),
                OutputFormat::Text => {
                    println!("{}", token);
                    Ok(())
                }
            }
        }
        TokenCommands::Verify { token, ignore_expiry } => {
            let service = TrackTokenService::from_key_files(None, config.tokens.public_key_path.as_deref(), config.token_ttl());
            let verified = if ignore_expiry {
                service.verify_ignoring_expiry(&token)
            } else {
                service.verify_token(&token)
            };

            match verified {
                Ok(scope) => match output_format {
                    OutputFormat::Json => output_success(&output_format, "Token valid", Some(json!(scope))),
                    OutputFormat::Text => {
                        output_rows(&[("organism", scope.organism), ("assembly", scope.assembly)]);
                        Ok(())
                    }
                },
                Err(e) => {
                    output_error(&output_format, &e.to_string(), Some("TOKEN_INVALID"))?;
                    Err(e.into())
                }
            }
        }
    }
}
