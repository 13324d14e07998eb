use super::identity::Identity;
use super::ip_range::{first_match, IpRange};
use super::tier::AccessTier;
use crate::session::{IpLogin, SessionState};

/// Outcome of identity resolution.
///
/// `session_update` is the state the caller should persist, if it changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub identity: Identity,
    pub session_update: Option<SessionState>,
}

/// Compute the effective identity for one request.
///
/// Precedence: an auto-login IP range (first configured match) unless the
/// session holds an explicit login at or above that range's tier, then an
/// explicit admin login, then an explicit collaborator login, then PUBLIC.
pub fn resolve_identity(
    session: &SessionState,
    client_ip: Option<&str>,
    ranges: &[IpRange],
) -> Resolution {
    let explicit = session.explicit_tier();

    if let Some((ip, range)) = client_ip.and_then(|ip| first_match(ranges, ip).map(|r| (ip.trim(), r))) {
        match explicit {
            Some(tier) if tier >= range.tier() => {
                tracing::debug!(
                    "Client {} matches {} range but explicit {} login takes precedence",
                    ip,
                    range.tier(),
                    tier
                );
            }
            _ => {
                let ip_login = IpLogin {
                    ip: ip.to_string(),
                    tier: range.tier(),
                };
                let session_update = (session.ip_login.as_ref() != Some(&ip_login))
                    .then(|| session.with_ip_login(ip_login));
                return Resolution {
                    identity: Identity::ip_user(ip, range.tier()),
                    session_update,
                };
            }
        }
    }

    // An earlier IP login does not survive a change of address
    let session_update = session.ip_login.is_some().then(|| session.without_ip_login());

    let identity = match (explicit, session.username.as_deref()) {
        (Some(AccessTier::Admin), Some(username)) => Identity::admin(username),
        (Some(_), Some(username)) => Identity::collaborator(username, session.access.clone()),
        _ => Identity::public(),
    };

    Resolution {
        identity,
        session_update,
    }
}
