// handlers/protected/jbrowse.rs - GET /api/jbrowse2/config handler

use axum::{
    extract::{Extension, Query, State},
    http::header,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;

use crate::access::Identity;
use crate::app::AppState;
use crate::error::ApiError;
use crate::jbrowse::ConfigBuilder;

#[derive(Debug, Default, Deserialize)]
pub struct ConfigQuery {
    pub organism: Option<String>,
    pub assembly: Option<String>,
    /// Dual view, both as `Organism_Assembly`
    pub assembly1: Option<String>,
    pub assembly2: Option<String>,
}

/// GET /api/jbrowse2/config
///
/// - `assembly1` + `assembly2`: both assemblies with synteny tracks
/// - `organism` + `assembly`: one assembly with its tracks
/// - neither: the list of assemblies the caller may open
///
/// Returned as bare JBrowse2 config JSON (no envelope), never cached.
pub async fn config_get(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ConfigQuery>,
) -> Result<Response, ApiError> {
    let snapshot = state.groups.snapshot();
    let builder = ConfigBuilder {
        store: &state.metadata,
        tokens: &state.tokens,
        rewriter: &state.rewriter,
        identity: &identity,
        groups: &snapshot,
    };

    let non_empty = |value: &Option<String>| value.as_deref().filter(|v| !v.is_empty()).map(str::to_string);

    let config = match (
        non_empty(&query.assembly1),
        non_empty(&query.assembly2),
        non_empty(&query.organism),
        non_empty(&query.assembly),
    ) {
        (Some(first), Some(second), _, _) => builder.dual_config(&first, &second),
        (_, _, Some(organism), Some(assembly)) => builder.assembly_config(&organism, &assembly),
        _ => builder.assembly_list(),
    }
    .map_err(|e| {
        tracing::debug!("JBrowse2 config request refused for {}: {}", identity.tier, e);
        ApiError::from(e)
    })?;

    Ok((
        [(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")],
        Json(config),
    )
        .into_response())
}
