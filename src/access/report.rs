use serde::Serialize;

use super::groups::GroupSnapshot;
use super::identity::Identity;
use super::policy::{self, AccessibleAssemblies};
use super::tier::AccessTier;

/// Every decision the policy makes for one identity against one organism
/// (and optionally one assembly). Used by the admin API and the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct AccessReport {
    pub username: String,
    pub access_level: AccessTier,
    pub organism: String,
    pub can_view_organism: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assembly: Option<AssemblyDecision>,
    pub accessible: Vec<AccessibleGroup>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssemblyDecision {
    pub assembly: String,
    pub groups: Vec<String>,
    pub is_public: bool,
    pub has_access: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessibleGroup {
    pub group: String,
    pub organisms: std::collections::BTreeMap<String, Vec<String>>,
}

impl AccessReport {
    pub fn evaluate(identity: &Identity, groups: &GroupSnapshot, organism: &str, assembly: Option<&str>) -> Self {
        let assembly = assembly.map(|assembly| AssemblyDecision {
            assembly: assembly.to_string(),
            groups: groups.groups_for(organism, Some(assembly)).into_iter().collect(),
            is_public: groups.is_public(organism, Some(assembly)),
            has_access: policy::has_assembly_access(identity, groups, organism, assembly),
        });

        Self {
            username: identity.username.clone(),
            access_level: identity.tier,
            organism: organism.to_string(),
            can_view_organism: policy::can_view_organism(identity, groups, organism),
            assembly,
            accessible: accessible_groups(policy::accessible_assemblies(identity, groups)),
        }
    }
}

fn accessible_groups(accessible: AccessibleAssemblies) -> Vec<AccessibleGroup> {
    accessible
        .groups
        .into_iter()
        .map(|(group, organisms)| AccessibleGroup { group, organisms })
        .collect()
}
