use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse access level of a request identity.
///
/// Variants are declared in ascending order so the derived `Ord` is the
/// access hierarchy: `Public < Collaborator < IpInRange < Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessTier {
    Public,
    Collaborator,
    IpInRange,
    Admin,
}

impl AccessTier {
    /// Ordinal used by track and assembly level comparisons.
    pub fn rank(self) -> u8 {
        match self {
            AccessTier::Public => 1,
            AccessTier::Collaborator => 2,
            AccessTier::IpInRange => 3,
            AccessTier::Admin => 4,
        }
    }

    /// True when this tier is at or above `required`.
    pub fn satisfies(self, required: AccessTier) -> bool {
        self.rank() >= required.rank()
    }

    /// ADMIN and IP_IN_RANGE see every resource without consulting grants.
    pub fn bypasses_grants(self) -> bool {
        matches!(self, AccessTier::Admin | AccessTier::IpInRange)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccessTier::Public => "PUBLIC",
            AccessTier::Collaborator => "COLLABORATOR",
            AccessTier::IpInRange => "IP_IN_RANGE",
            AccessTier::Admin => "ADMIN",
        }
    }

    /// Parse a declared level from track or assembly metadata.
    ///
    /// Absent levels mean PUBLIC. Unrecognised levels fail closed to ADMIN.
    pub fn from_declared(level: Option<&str>) -> AccessTier {
        match level {
            None => AccessTier::Public,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("Unknown declared access level '{}', treating as ADMIN", raw);
                AccessTier::Admin
            }),
        }
    }
}

impl fmt::Display for AccessTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown access tier '{0}'")]
pub struct UnknownTier(pub String);

impl FromStr for AccessTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Historical spellings: "Public"/"PUBLIC", "Collaborator", "ALL" for IP users
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "PUBLIC" => Ok(AccessTier::Public),
            "COLLABORATOR" => Ok(AccessTier::Collaborator),
            "IP_IN_RANGE" | "ALL" => Ok(AccessTier::IpInRange),
            "ADMIN" => Ok(AccessTier::Admin),
            _ => Err(UnknownTier(s.to_string())),
        }
    }
}
