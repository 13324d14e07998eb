use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use ipnet::IpNet;
use tower_cookies::{cookie::SameSite, Cookie, Cookies};

use crate::access::{policy, resolve_identity, AccessTier, Identity};
use crate::app::AppState;
use crate::error::ApiError;
use crate::session::{SessionId, SessionState, SESSION_COOKIE};

/// Client address as seen by the gateway, IPv4-mapped addresses unwrapped.
#[derive(Clone, Debug, Default)]
pub struct ClientIp(pub Option<String>);

/// Session behind the request cookie, after identity resolution.
#[derive(Clone, Debug, Default)]
pub struct CurrentSession {
    pub id: Option<SessionId>,
    pub state: SessionState,
}

/// Resolves the request identity and makes it available to handlers.
///
/// Inserts [`Identity`], [`ClientIp`] and [`CurrentSession`] into the request
/// extensions. Persists the session when resolution changed it, except that a
/// cookie-less address login is re-derived on every request and never stored.
pub async fn session_gateway(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client_ip = client_ip(request.headers(), peer, &state.proxies);

    let mut session_id = cookies
        .get(SESSION_COOKIE)
        .and_then(|cookie| SessionId::parse(cookie.value()));
    let mut session = match &session_id {
        Some(id) => state.sessions.load(id).await.unwrap_or_default(),
        None => SessionState::default(),
    };

    let resolution = resolve_identity(
        &session,
        client_ip.as_deref(),
        &state.config.access.auto_login_ip_ranges,
    );

    if let Some(update) = resolution.session_update {
        if update.is_empty() {
            if let Some(id) = session_id.take() {
                state.sessions.destroy(&id).await;
                cookies.remove(removal_cookie());
            }
        } else if let Some(id) = &session_id {
            state.sessions.save(id, update.clone()).await;
        }
        session = update;
    }

    tracing::debug!(
        "Request identity: {} ({})",
        if resolution.identity.username.is_empty() { "anonymous" } else { &resolution.identity.username },
        resolution.identity.tier
    );

    request.extensions_mut().insert(resolution.identity);
    request.extensions_mut().insert(ClientIp(client_ip));
    request.extensions_mut().insert(CurrentSession {
        id: session_id,
        state: session,
    });

    next.run(request).await
}

/// Client address for access decisions.
///
/// `X-Forwarded-For` is consulted only when the connecting peer sits inside
/// one of `trusted_proxies`. Hops are walked right to left, skipping trusted
/// proxies; the first untrusted hop is the client. With no header, or only
/// trusted hops, the peer itself is the client.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trusted_proxies: &[IpNet]) -> Option<String> {
    let peer = peer.map(|addr| addr.ip().to_canonical());
    let is_proxy = |ip: &IpAddr| trusted_proxies.iter().any(|net| net.contains(ip));

    if let Some(peer_ip) = peer.filter(|ip| is_proxy(ip)) {
        let hops: Vec<&str> = headers
            .get_all("x-forwarded-for")
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|hop| !hop.is_empty())
            .collect();

        for hop in hops.into_iter().rev() {
            match hop.parse::<IpAddr>() {
                Ok(ip) => {
                    let ip = ip.to_canonical();
                    if !is_proxy(&ip) {
                        return Some(ip.to_string());
                    }
                }
                // Left as-is; it simply never matches a range
                Err(_) => return Some(hop.to_string()),
            }
        }

        return Some(peer_ip.to_string());
    }

    peer.map(|ip| ip.to_string())
}

pub fn session_cookie(id: &SessionId) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.as_str().to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

/// Outcome of a page-level access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Allow,
    Redirect(String),
}

impl Authorization {
    pub fn from_decision(allowed: bool, access_denied_url: &str) -> Self {
        if allowed {
            Authorization::Allow
        } else {
            Authorization::Redirect(access_denied_url.to_string())
        }
    }

    pub fn into_result(self) -> Result<(), AccessDenied> {
        match self {
            Authorization::Allow => Ok(()),
            Authorization::Redirect(location) => Err(AccessDenied { location }),
        }
    }
}

/// Tier gate for pages. A denial names no resource.
pub fn authorize(
    identity: &Identity,
    required: AccessTier,
    resource_key: Option<&str>,
    access_denied_url: &str,
) -> Authorization {
    let allowed = policy::can_access(identity, required, resource_key);
    if !allowed {
        tracing::debug!("Denied {} for {} tier", identity.username, identity.tier);
    }
    Authorization::from_decision(allowed, access_denied_url)
}

/// 303 to the access-denied page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDenied {
    pub location: String,
}

impl IntoResponse for AccessDenied {
    fn into_response(self) -> Response {
        (StatusCode::SEE_OTHER, [(header::LOCATION, self.location)]).into_response()
    }
}

/// Page handler failure: a redirect for denials, JSON for everything else.
#[derive(Debug)]
pub enum PageError {
    Denied(AccessDenied),
    Api(ApiError),
}

impl From<AccessDenied> for PageError {
    fn from(denied: AccessDenied) -> Self {
        PageError::Denied(denied)
    }
}

impl From<ApiError> for PageError {
    fn from(err: ApiError) -> Self {
        PageError::Api(err)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            PageError::Denied(denied) => denied.into_response(),
            PageError::Api(err) => err.into_response(),
        }
    }
}
