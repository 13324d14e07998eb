use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use super::tier::AccessTier;

/// Inclusive IPv4 range that auto-elevates matching clients to `tier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IpRange {
    start: u32,
    end: u32,
    tier: AccessTier,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IpRangeError {
    #[error("invalid IPv4 address '{0}'")]
    InvalidAddress(String),
    #[error("invalid CIDR block '{0}'")]
    InvalidCidr(String),
    #[error("range start {start} is after end {end}")]
    Inverted { start: Ipv4Addr, end: Ipv4Addr },
    #[error("invalid tier in range '{0}'")]
    InvalidTier(String),
}

impl IpRange {
    pub fn new(start: Ipv4Addr, end: Ipv4Addr, tier: AccessTier) -> Result<Self, IpRangeError> {
        let (start_long, end_long) = (u32::from(start), u32::from(end));
        if start_long > end_long {
            return Err(IpRangeError::Inverted { start, end });
        }
        Ok(Self {
            start: start_long,
            end: end_long,
            tier,
        })
    }

    pub fn tier(&self) -> AccessTier {
        self.tier
    }

    pub fn start(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.start)
    }

    pub fn end(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.end)
    }

    pub fn contains(&self, addr: u32) -> bool {
        self.start <= addr && addr <= self.end
    }
}

/// Parse a client address into its 32-bit form.
///
/// Anything that is not a plain or IPv4-mapped IPv4 address yields `None`,
/// which never matches a range.
pub fn ipv4_to_u32(raw: &str) -> Option<u32> {
    let ip: IpAddr = raw.trim().parse().ok()?;
    match ip.to_canonical() {
        IpAddr::V4(v4) => Some(u32::from(v4)),
        IpAddr::V6(_) => None,
    }
}

/// First configured range containing `client_ip`. Order is significant.
pub fn first_match<'a>(ranges: &'a [IpRange], client_ip: &str) -> Option<&'a IpRange> {
    let addr = ipv4_to_u32(client_ip)?;
    ranges.iter().find(|range| range.contains(addr))
}

fn parse_addr(raw: &str) -> Result<Ipv4Addr, IpRangeError> {
    raw.trim()
        .parse()
        .map_err(|_| IpRangeError::InvalidAddress(raw.trim().to_string()))
}

/// Accepts `start-end`, `a.b.c.d/len` or a single address, each optionally
/// followed by `=TIER` (default `IP_IN_RANGE`).
impl FromStr for IpRange {
    type Err = IpRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (spec, tier) = match s.split_once('=') {
            Some((spec, tier)) => (
                spec,
                tier.parse::<AccessTier>()
                    .map_err(|_| IpRangeError::InvalidTier(s.to_string()))?,
            ),
            None => (s, AccessTier::IpInRange),
        };

        if let Some((start, end)) = spec.split_once('-') {
            return IpRange::new(parse_addr(start)?, parse_addr(end)?, tier);
        }

        if spec.contains('/') {
            let net: Ipv4Net = spec
                .trim()
                .parse()
                .map_err(|_| IpRangeError::InvalidCidr(spec.trim().to_string()))?;
            return IpRange::new(net.network(), net.broadcast(), tier);
        }

        let addr = parse_addr(spec)?;
        IpRange::new(addr, addr, tier)
    }
}

impl TryFrom<String> for IpRange {
    type Error = IpRangeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IpRange> for String {
    fn from(range: IpRange) -> Self {
        format!("{}-{}={}", range.start(), range.end(), range.tier)
    }
}

/// Parse a comma separated list, skipping (and logging) invalid entries.
pub fn parse_range_list(raw: &str) -> Vec<IpRange> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match entry.parse::<IpRange>() {
            Ok(range) => Some(range),
            Err(e) => {
                tracing::warn!("Ignoring auto-login IP range '{}': {}", entry, e);
                None
            }
        })
        .collect()
}
