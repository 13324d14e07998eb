// handlers/elevated/access.rs - GET /admin/api/access handler

use axum::extract::{Extension, Query, State};
use serde::Deserialize;

use crate::access::{policy, AccessReport, Identity};
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, Authorization, PageError};

#[derive(Debug, Deserialize)]
pub struct AccessQuery {
    pub username: Option<String>,
    pub organism: Option<String>,
    pub assembly: Option<String>,
}

/// GET /admin/api/access?username=&organism=[&assembly=]
///
/// Evaluates the policy for a stored account as if it had logged in, so an
/// admin can see why a collaborator is or is not let through.
pub async fn access_check(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<AccessQuery>,
) -> Result<ApiResponse<AccessReport>, PageError> {
    Authorization::from_decision(policy::is_site_admin(&identity), &state.config.access.access_denied_url)
        .into_result()?;

    let (Some(username), Some(organism)) = (query.username, query.organism) else {
        return Err(ApiError::bad_request("username and organism are required").into());
    };

    let record = state
        .users
        .lookup(&username)
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let subject = record.identity(&username);
    let snapshot = state.groups.snapshot();
    let report = AccessReport::evaluate(&subject, &snapshot, &organism, query.assembly.as_deref());

    if state.config.security.enable_audit_logging {
        tracing::info!(
            "Admin '{}' checked access of '{}' to {}",
            identity.username,
            username,
            organism
        );
    }

    Ok(ApiResponse::success(report))
}
