// handlers/protected/organisms.rs - GET /organisms/:organism[/:assembly]

use axum::extract::{Extension, Path, State};
use serde_json::{json, Value};

use crate::access::{policy, Identity};
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, Authorization, PageError};

/// GET /organisms/:organism - Organism page
///
/// Open to a collaborator granted the organism, or to anyone when one of its
/// assemblies is public. Only assemblies the caller may open are listed.
pub async fn organism_get(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(organism): Path<String>,
) -> Result<ApiResponse<Value>, PageError> {
    let snapshot = state.groups.snapshot();
    let denied_url = &state.config.access.access_denied_url;

    Authorization::from_decision(policy::can_view_organism(&identity, &snapshot, &organism), denied_url)
        .into_result()?;

    let assemblies: Vec<Value> = snapshot
        .entries()
        .iter()
        .filter(|entry| entry.organism == organism)
        .filter(|entry| policy::has_assembly_access(&identity, &snapshot, &entry.organism, &entry.assembly))
        .map(|entry| json!({ "assembly": entry.assembly, "groups": entry.groups }))
        .collect();

    if assemblies.is_empty() && snapshot.groups_for(&organism, None).is_empty() {
        return Err(ApiError::not_found("Organism not found").into());
    }

    Ok(ApiResponse::success(json!({
        "organism": organism,
        "is_public": snapshot.is_public(&organism, None),
        "assemblies": assemblies,
    })))
}

/// GET /organisms/:organism/:assembly - Assembly page
pub async fn assembly_get(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((organism, assembly)): Path<(String, String)>,
) -> Result<ApiResponse<Value>, PageError> {
    let snapshot = state.groups.snapshot();
    let denied_url = &state.config.access.access_denied_url;

    let allowed = policy::has_assembly_access(&identity, &snapshot, &organism, &assembly);
    Authorization::from_decision(allowed, denied_url).into_result()?;

    let groups = snapshot.groups_for(&organism, Some(&assembly));
    if groups.is_empty() {
        return Err(ApiError::not_found("Assembly not found").into());
    }

    Ok(ApiResponse::success(json!({
        "organism": organism,
        "assembly": assembly,
        "groups": groups,
        "is_public": snapshot.is_public(&organism, Some(&assembly)),
    })))
}
