use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

use crate::access::ip_range::ipv4_to_u32;

/// Internal networks the track server trusts without the token dance.
///
/// Kept apart from token verification: callers check this first and fall
/// back to the token when it does not match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedNetworks {
    networks: Vec<Ipv4Net>,
}

/// How the track server treats requests from trusted networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhitelistMode {
    /// Trusted peers are served without a token.
    #[default]
    Bypass,
    /// Trusted peers still present a signed token with matching scope, but
    /// an expired one is accepted.
    RelaxedExpiry,
}

impl std::str::FromStr for WhitelistMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "bypass" => Ok(WhitelistMode::Bypass),
            "relaxed_expiry" | "relaxed" => Ok(WhitelistMode::RelaxedExpiry),
            other => Err(format!("unknown whitelist mode '{}'", other)),
        }
    }
}

impl Default for TrustedNetworks {
    /// RFC 1918 private ranges plus loopback.
    fn default() -> Self {
        Self::from_list("10.0.0.0/8,172.16.0.0/12,192.168.0.0/16,127.0.0.0/8")
    }
}

impl TrustedNetworks {
    pub fn none() -> Self {
        Self { networks: Vec::new() }
    }

    /// Comma separated CIDR blocks; invalid entries are skipped with a warning.
    pub fn from_list(raw: &str) -> Self {
        let networks = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|cidr| match cidr.parse::<Ipv4Net>() {
                Ok(net) => Some(net.trunc()),
                Err(e) => {
                    tracing::warn!("Ignoring trusted network '{}': {}", cidr, e);
                    None
                }
            })
            .collect();
        Self { networks }
    }

    pub fn networks(&self) -> &[Ipv4Net] {
        &self.networks
    }

    /// Malformed or IPv6 addresses are never trusted.
    pub fn is_trusted(&self, client_ip: &str) -> bool {
        let Some(addr) = ipv4_to_u32(client_ip) else {
            return false;
        };
        let addr = std::net::Ipv4Addr::from(addr);
        self.networks.iter().any(|net| net.contains(&addr))
    }
}
