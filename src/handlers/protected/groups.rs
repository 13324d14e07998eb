// handlers/protected/groups.rs - GET /groups/:group handler

use axum::extract::{Extension, Path, State};
use serde_json::{json, Value};

use crate::access::{groups::canonical_group, policy, Identity};
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, Authorization, PageError};

/// GET /groups/:group - Organisms and assemblies of one group the caller may open
pub async fn group_get(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(group): Path<String>,
) -> Result<ApiResponse<Value>, PageError> {
    let group = canonical_group(&group);
    let snapshot = state.groups.snapshot();

    Authorization::from_decision(
        policy::can_view_group(&identity, &group),
        &state.config.access.access_denied_url,
    )
    .into_result()?;

    if snapshot.organisms_in_group(&group).is_empty() {
        return Err(ApiError::not_found("Group not found").into());
    }

    let accessible = policy::accessible_assemblies(&identity, &snapshot);
    let organisms = accessible.group(&group).cloned().unwrap_or_default();

    Ok(ApiResponse::success(json!({
        "group": group,
        "is_public": snapshot.is_public_group(&group),
        "organisms": organisms,
    })))
}
