//! Allow/deny decisions.
//!
//! Everything here is a pure function of an [`Identity`] and, where group
//! membership matters, a [`GroupSnapshot`]. No I/O, no redirects.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use super::groups::{GroupSnapshot, PUBLIC_GROUP};
use super::identity::Identity;
use super::tier::AccessTier;

/// Coarse tier check with an optional organism key.
pub fn can_access(identity: &Identity, required: AccessTier, resource_key: Option<&str>) -> bool {
    if identity.tier.bypasses_grants() {
        return true;
    }

    if required == AccessTier::Public {
        return true;
    }

    if identity.tier == AccessTier::Collaborator && required == AccessTier::Collaborator {
        return match resource_key {
            None => true,
            Some(organism) => identity.granted_resources.has_organism(organism),
        };
    }

    false
}

/// Assembly-scoped check. Public assemblies are visible to everyone and are
/// checked before the collaborator's grants.
pub fn has_assembly_access(
    identity: &Identity,
    groups: &GroupSnapshot,
    organism: &str,
    assembly: &str,
) -> bool {
    if identity.tier.bypasses_grants() {
        return true;
    }

    if groups.is_public(organism, Some(assembly)) {
        return true;
    }

    identity.tier == AccessTier::Collaborator
        && identity.granted_resources.has_assembly(organism, assembly)
}

/// Organism page gate: collaborator grant on the organism, or any public assembly.
pub fn can_view_organism(identity: &Identity, groups: &GroupSnapshot, organism: &str) -> bool {
    can_access(identity, AccessTier::Collaborator, Some(organism)) || groups.is_public(organism, None)
}

/// Group page gate: the public group is open, others need a collaborator grant
/// keyed by the group name.
pub fn can_view_group(identity: &Identity, group: &str) -> bool {
    group.eq_ignore_ascii_case(PUBLIC_GROUP)
        || can_access(identity, AccessTier::Collaborator, Some(group))
}

/// Admin pages are for explicit admin logins only; IP users do not qualify.
pub fn is_site_admin(identity: &Identity) -> bool {
    identity.tier == AccessTier::Admin
}

/// Gate for a JBrowse2 assembly definition carrying a `defaultAccessLevel`.
pub fn can_access_assembly_level(
    identity: &Identity,
    declared: AccessTier,
    organism: &str,
    assembly: &str,
) -> bool {
    if identity.tier.bypasses_grants() || declared == AccessTier::Public {
        return true;
    }

    identity.tier == AccessTier::Collaborator
        && identity.granted_resources.has_assembly(organism, assembly)
}

/// Track belonging to one assembly.
///
/// Rank check first; a collaborator additionally needs an explicit grant on
/// the assembly for collaborator-or-higher tracks.
pub fn can_view_track(identity: &Identity, declared: AccessTier, organism: &str, assembly: &str) -> bool {
    if !identity.tier.satisfies(declared) {
        return false;
    }

    if identity.tier == AccessTier::Collaborator && declared >= AccessTier::Collaborator {
        return identity.granted_resources.has_assembly(organism, assembly);
    }

    true
}

/// Synteny track connecting two assemblies, each given as (organism, assembly).
///
/// Rank check first; collaborator-or-higher tracks then need access to at
/// least one side. PUBLIC tracks skip the refinement.
pub fn can_view_synteny_track(
    identity: &Identity,
    groups: &GroupSnapshot,
    declared: AccessTier,
    first: (&str, &str),
    second: (&str, &str),
) -> bool {
    if !identity.tier.satisfies(declared) {
        return false;
    }

    if declared == AccessTier::Public {
        return true;
    }

    has_assembly_access(identity, groups, first.0, first.1)
        || has_assembly_access(identity, groups, second.0, second.1)
}

/// Group name → organism → assemblies the identity may open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccessibleAssemblies {
    pub groups: Vec<(String, BTreeMap<String, Vec<String>>)>,
}

impl AccessibleAssemblies {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group(&self, name: &str) -> Option<&BTreeMap<String, Vec<String>>> {
        self.groups.iter().find(|(group, _)| group == name).map(|(_, organisms)| organisms)
    }

    pub fn contains(&self, organism: &str, assembly: &str) -> bool {
        self.groups.iter().any(|(_, organisms)| {
            organisms
                .get(organism)
                .map(|assemblies| assemblies.iter().any(|a| a == assembly))
                .unwrap_or(false)
        })
    }
}

fn group_order(a: &str, b: &str) -> Ordering {
    match (a == PUBLIC_GROUP, b == PUBLIC_GROUP) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)),
    }
}

/// Every assembly in the group file the identity may open, organised by group.
/// `Public` sorts first, remaining groups case-insensitively.
pub fn accessible_assemblies(identity: &Identity, groups: &GroupSnapshot) -> AccessibleAssemblies {
    let mut organised: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();

    for entry in groups.entries() {
        if !has_assembly_access(identity, groups, &entry.organism, &entry.assembly) {
            continue;
        }
        for group in &entry.groups {
            let assemblies = organised
                .entry(group.clone())
                .or_default()
                .entry(entry.organism.clone())
                .or_default();
            if !assemblies.contains(&entry.assembly) {
                assemblies.push(entry.assembly.clone());
            }
        }
    }

    let mut ordered: Vec<_> = organised.into_iter().collect();
    ordered.sort_by(|(a, _), (b, _)| group_order(a, b));
    AccessibleAssemblies { groups: ordered }
}
