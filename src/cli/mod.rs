pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "moop")]
#[command(about = "MOOP CLI - Operator tooling for the MOOP access gateway")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Issue and verify JBrowse2 track tokens")]
    Token {
        #[command(subcommand)]
        cmd: commands::token::TokenCommands,
    },

    #[command(about = "Inspect the organism/assembly group file")]
    Groups {
        #[command(subcommand)]
        cmd: commands::groups::GroupsCommands,
    },

    #[command(about = "Debug access decisions for a stored account")]
    Access {
        #[command(subcommand)]
        cmd: commands::access::AccessCommands,
    },

    #[command(about = "User store helpers")]
    User {
        #[command(subcommand)]
        cmd: commands::user::UserCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Token { cmd } => commands::token::handle(cmd, output_format).await,
        Commands::Groups { cmd } => commands::groups::handle(cmd, output_format).await,
        Commands::Access { cmd } => commands::access::handle(cmd, output_format).await,
        Commands::User { cmd } => commands::user::handle(cmd, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_token_issue() {
        let cli = Cli::try_parse_from(["moop", "--json", "token", "issue", "Tardigrade", "AsmPub"]).unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        assert!(matches!(
            cli.command,
            Commands::Token {
                cmd: commands::token::TokenCommands::Issue { .. }
            }
        ));
    }

    #[test]
    fn access_check_assembly_is_optional() {
        let cli = Cli::try_parse_from(["moop", "access", "check", "bob", "Tardigrade"]).unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Text));
        match cli.command {
            Commands::Access {
                cmd: commands::access::AccessCommands::Check { assembly, .. },
            } => assert_eq!(assembly, None),
            _ => panic!("expected access check"),
        }
    }
}
