use clap::Subcommand;
use serde_json::json;

use crate::access::groups::canonical_group;
use crate::access::{load_groups, GroupSnapshot};
use crate::cli::utils::{output_empty_collection, output_rows, output_success};
use crate::cli::OutputFormat;
use crate::config;

#[derive(Subcommand)]
pub enum GroupsCommands {
    #[command(about = "List every organism/assembly with its groups")]
    List,

    #[command(about = "Show the groups of an organism, or of one assembly")]
    Show {
        #[arg(help = "Organism name")]
        organism: String,
        #[arg(help = "Assembly name")]
        assembly: Option<String>,
    },

    #[command(about = "Show the organisms in a group")]
    Group {
        #[arg(help = "Group name")]
        name: String,
    },
}

pub async fn handle(cmd: GroupsCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let path = &config::config().access.groups_file;
    let snapshot = GroupSnapshot::new(load_groups(path));

    match cmd {
        GroupsCommands::List => {
            if snapshot.entries().is_empty() {
                return output_empty_collection(
                    &output_format,
                    "entries",
                    &format!("No groups defined in {}", path.display()),
                );
            }

            match output_format {
                OutputFormat::Json => output_success(
                    &output_format,
                    &format!("{} entries", snapshot.entries().len()),
                    Some(json!(snapshot.entries())),
                ),
                OutputFormat::Text => {
                    let rows: Vec<(String, String)> = snapshot
                        .entries()
                        .iter()
                        .map(|entry| {
                            (
                                format!("{}/{}", entry.organism, entry.assembly),
                                entry.groups.iter().cloned().collect::<Vec<_>>().join(", "),
                            )
                        })
                        .collect();
                    let rows: Vec<(&str, String)> =
                        rows.iter().map(|(label, groups)| (label.as_str(), groups.clone())).collect();
                    output_rows(&rows);
                    Ok(())
                }
            }
        }
        GroupsCommands::Show { organism, assembly } => {
            let groups = snapshot.groups_for(&organism, assembly.as_deref());
            let is_public = snapshot.is_public(&organism, assembly.as_deref());

            match output_format {
                OutputFormat::Json => output_success(
                    &output_format,
                    &organism,
                    Some(json!({
                        "organism": organism,
                        "assembly": assembly,
                        "groups": groups,
                        "is_public": is_public,
                    })),
                ),
                OutputFormat::Text => {
                    output_rows(&[
                        ("groups", groups.into_iter().collect::<Vec<_>>().join(", ")),
                        ("public", is_public.to_string()),
                    ]);
                    Ok(())
                }
            }
        }
        GroupsCommands::Group { name } => {
            let name = canonical_group(&name);
            let organisms = snapshot.organisms_in_group(&name);
            if organisms.is_empty() {
                return output_empty_collection(&output_format, "organisms", &format!("Group '{}' is empty", name));
            }

            match output_format {
                OutputFormat::Json => output_success(
                    &output_format,
                    &name,
                    Some(json!({
                        "group": name,
                        "organisms": organisms,
                        "has_public_assembly": snapshot.is_public_group(&name),
                    })),
                ),
                OutputFormat::Text => {
                    for organism in organisms {
                        println!("{}", organism);
                    }
                    Ok(())
                }
            }
        }
    }
}
