use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::tier::AccessTier;

/// Organism → assemblies explicitly granted to a collaborator.
///
/// Stored in the user record and copied into the session at login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessGrant(BTreeMap<String, BTreeSet<String>>);

impl AccessGrant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, organism: impl Into<String>, assemblies: &[&str]) -> Self {
        self.0
            .entry(organism.into())
            .or_default()
            .extend(assemblies.iter().map(|a| a.to_string()));
        self
    }

    pub fn has_organism(&self, organism: &str) -> bool {
        self.0.contains_key(organism)
    }

    pub fn has_assembly(&self, organism: &str, assembly: &str) -> bool {
        self.0
            .get(organism)
            .map(|assemblies| assemblies.contains(assembly))
            .unwrap_or(false)
    }

    pub fn organisms(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Who is asking, resolved once per request by the session gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub session_active: bool,
    pub username: String,
    pub tier: AccessTier,
    pub granted_resources: AccessGrant,
}

impl Identity {
    /// Anonymous visitor with no session.
    pub fn public() -> Self {
        Self {
            session_active: false,
            username: String::new(),
            tier: AccessTier::Public,
            granted_resources: AccessGrant::default(),
        }
    }

    pub fn admin(username: impl Into<String>) -> Self {
        Self {
            session_active: true,
            username: username.into(),
            tier: AccessTier::Admin,
            granted_resources: AccessGrant::default(),
        }
    }

    pub fn collaborator(username: impl Into<String>, grants: AccessGrant) -> Self {
        Self {
            session_active: true,
            username: username.into(),
            tier: AccessTier::Collaborator,
            granted_resources: grants,
        }
    }

    /// Pseudo-login synthesised for a client address inside an auto-login range.
    pub fn ip_user(ip: &str, tier: AccessTier) -> Self {
        Self {
            session_active: true,
            username: format!("IP_USER_{}", ip),
            tier,
            granted_resources: AccessGrant::default(),
        }
    }
}
