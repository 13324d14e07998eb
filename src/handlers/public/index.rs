// handlers/public/index.rs - GET /, GET /health, GET /access_denied

use axum::extract::{Extension, State};
use serde_json::{json, Value};

use crate::access::{policy, Identity};
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// GET / - Site index: every assembly the caller may open, by group
pub async fn root(State(state): State<AppState>, Extension(identity): Extension<Identity>) -> ApiResult<Value> {
    let snapshot = state.groups.snapshot();
    let accessible = policy::accessible_assemblies(&identity, &snapshot);

    let groups: Vec<Value> = accessible
        .groups
        .iter()
        .map(|(group, organisms)| json!({ "group": group, "organisms": organisms }))
        .collect();

    Ok(ApiResponse::success(json!({
        "name": "MOOP",
        "version": env!("CARGO_PKG_VERSION"),
        "user": {
            "logged_in": identity.session_active,
            "username": identity.username,
            "access_level": identity.tier,
        },
        "groups": groups,
    })))
}

/// GET /health - Liveness plus which halves of the token service are usable
pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "tokens": {
            "issue": state.tokens.can_issue(),
            "verify": state.tokens.can_verify(),
        },
    })))
}

/// GET /access_denied - Where denied page requests are redirected
pub async fn access_denied() -> ApiError {
    ApiError::forbidden("You do not have permission to view this page")
}
