// handlers/public/session.rs - POST /login, POST /logout, GET /api/auth/whoami

use axum::{
    body::Bytes,
    extract::{Extension, State},
    http::{header::CONTENT_TYPE, HeaderMap},
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_cookies::Cookies;
use url::form_urlencoded;

use crate::access::Identity;
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::session::{removal_cookie, session_cookie};
use crate::middleware::{ApiResponse, ApiResult, ClientIp, CurrentSession};
use crate::session::SessionId;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    /// JSON when the content type says so, form-encoded otherwise.
    pub fn from_body(headers: &HeaderMap, body: &[u8]) -> Result<Self, ApiError> {
        let missing = || ApiError::bad_request("Username and password are required");

        let is_json = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with("application/json"))
            .unwrap_or(false);

        let request = if is_json {
            serde_json::from_slice::<LoginRequest>(body).map_err(|_| missing())?
        } else {
            let mut username = None;
            let mut password = None;
            for (key, value) in form_urlencoded::parse(body) {
                match key.as_ref() {
                    "username" => username = Some(value.into_owned()),
                    "password" => password = Some(value.into_owned()),
                    _ => {}
                }
            }
            LoginRequest {
                username: username.ok_or_else(missing)?,
                password: password.ok_or_else(missing)?,
            }
        };

        if request.username.trim().is_empty() || request.password.is_empty() {
            return Err(missing());
        }
        Ok(request)
    }
}

/// POST /login - Verify credentials and start a fresh session
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Extension(current): Extension<CurrentSession>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Value> {
    let LoginRequest { username, password } = LoginRequest::from_body(&headers, &body)?;
    let username = username.trim().to_string();

    // Password hashing is CPU bound
    let users = state.users.clone();
    let lookup_name = username.clone();
    let outcome = tokio::task::spawn_blocking(move || users.authenticate(&lookup_name, &password))
        .await
        .map_err(|e| {
            tracing::error!("Login task failed: {}", e);
            ApiError::internal_server_error("An error occurred while processing your request")
        })?;

    let record = match outcome {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!("Failed login for '{}'", username);
            return Err(e.into());
        }
    };

    // New id on every login so a pre-login cookie cannot be fixed
    if let Some(old) = &current.id {
        state.sessions.destroy(old).await;
    }
    let id = SessionId::generate();
    state.sessions.save(&id, record.to_session(&username)).await;
    cookies.add(session_cookie(&id));

    let identity = record.identity(&username);
    tracing::info!("User '{}' logged in as {}", username, identity.tier);

    Ok(ApiResponse::success(json!({
        "username": identity.username,
        "access_level": identity.tier,
    })))
}

/// POST /logout - Drop the session and its cookie
pub async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
    Extension(current): Extension<CurrentSession>,
) -> ApiResult<Value> {
    if let Some(id) = &current.id {
        state.sessions.destroy(id).await;
    }
    cookies.remove(removal_cookie());

    Ok(ApiResponse::success(json!({ "logged_out": true })))
}

/// GET /api/auth/whoami - The identity this request resolved to
pub async fn whoami(
    Extension(identity): Extension<Identity>,
    Extension(ClientIp(ip)): Extension<ClientIp>,
) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "logged_in": identity.session_active,
        "username": identity.username,
        "access_level": identity.tier,
        "access": identity.granted_resources,
        "ip": ip,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn json_and_form_bodies() {
        let mut json_headers = HeaderMap::new();
        json_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let req = LoginRequest::from_body(&json_headers, br#"{"username":"bob","password":"pw"}"#).unwrap();
        assert_eq!(req.username, "bob");

        let req = LoginRequest::from_body(&HeaderMap::new(), b"username=bob&password=p%26w").unwrap();
        assert_eq!(req.password, "p&w");
    }

    #[test]
    fn missing_fields_rejected() {
        assert!(LoginRequest::from_body(&HeaderMap::new(), b"username=bob").is_err());
        assert!(LoginRequest::from_body(&HeaderMap::new(), b"username=%20&password=x").is_err());
    }
}
