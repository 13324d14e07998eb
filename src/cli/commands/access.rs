use clap::Subcommand;
use serde_json::json;

use crate::access::{load_groups, AccessReport, GroupSnapshot};
use crate::auth::UserStore;
use crate::cli::utils::{output_error, output_rows, output_success};
use crate::cli::OutputFormat;
use crate::config;

#[derive(Subcommand)]
pub enum AccessCommands {
    #[command(about = "Evaluate what a stored account may see of an organism")]
    Check {
        #[arg(help = "Username in the user store")]
        username: String,
        #[arg(help = "Organism name")]
        organism: String,
        #[arg(help = "Assembly name")]
        assembly: Option<String>,
    },
}

pub async fn handle(cmd: AccessCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config::config();

    match cmd {
        AccessCommands::Check { username, organism, assembly } => {
            let users = UserStore::new(&config.access.users_file);
            let Some(record) = users.lookup(&username)? else {
                output_error(&output_format, &format!("User '{}' not found", username), Some("USER_NOT_FOUND"))?;
                anyhow::bail!("user '{}' not found in {}", username, users.path().display());
            };

            let snapshot = GroupSnapshot::new(load_groups(&config.access.groups_file));
            let report = AccessReport::evaluate(&record.identity(&username), &snapshot, &organism, assembly.as_deref());

            match output_format {
                OutputFormat::Json => output_success(&output_format, "Access evaluated", Some(json!(report))),
                OutputFormat::Text => {
                    let mut rows = vec![
                        ("user", report.username.clone()),
                        ("tier", report.access_level.to_string()),
                        ("organism", report.organism.clone()),
                        ("view organism", report.can_view_organism.to_string()),
                    ];
                    if let Some(decision) = &report.assembly {
                        rows.push(("assembly", decision.assembly.clone()));
                        rows.push(("groups", decision.groups.join(", ")));
                        rows.push(("public", decision.is_public.to_string()));
                        rows.push(("has access", decision.has_access.to_string()));
                    }
                    output_rows(&rows);

                    for group in &report.accessible {
                        println!("[{}]", group.group);
                        for (organism, assemblies) in &group.organisms {
                            println!("  {}: {}", organism, assemblies.join(", "));
                        }
                    }
                    Ok(())
                }
            }
        }
    }
}
