// handlers/tracks/files.rs - GET /api/jbrowse2/tracks handler

use std::io::SeekFrom;
use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::app::AppState;
use crate::auth::{TokenError, TrackScope, WhitelistMode};
use crate::error::ApiError;
use crate::jbrowse::files::{content_type, parse_range, track_scope};
use crate::middleware::client_ip;

#[derive(Debug, Default, Deserialize)]
pub struct TrackFileQuery {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub token: String,
}

/// GET /api/jbrowse2/tracks?file=<organism/assembly/...>&token=<jwt>
///
/// Serves one track file when the token covers its organism/assembly.
/// Supports single `Range: bytes=` requests. The body is streamed from disk.
pub async fn track_file_get(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Query(query): Query<TrackFileQuery>,
) -> Result<Response, ApiError> {
    let (organism, assembly) = track_scope(&query.file)?;

    let peer = connect_info.map(|ConnectInfo(addr)| addr);
    let ip = client_ip(&headers, peer, &state.proxies);
    let trusted = ip.as_deref().map(|ip| state.trusted.is_trusted(ip)).unwrap_or(false);

    if !(trusted && state.config.tracks.whitelist_mode == WhitelistMode::Bypass) {
        let scope = verify(&state, &query.token, trusted)?;
        if !scope.covers(organism, assembly) {
            tracing::warn!(
                "Track token scope {}/{} does not cover requested {}/{}",
                scope.organism,
                scope.assembly,
                organism,
                assembly
            );
            return Err(ApiError::forbidden("Access denied"));
        }
    }

    let path = state.config.tracks.data_dir.join(&query.file);
    let metadata = tokio::fs::metadata(&path).await?;
    if !metadata.is_file() {
        return Err(ApiError::not_found("File not found"));
    }
    let size = metadata.len();

    let range_header = headers.get(header::RANGE).and_then(|value| value.to_str().ok());
    let range = parse_range(range_header, size)?;

    let mut file = tokio::fs::File::open(&path).await?;
    let content_type = content_type(&query.file);

    match range {
        Some((start, end)) => {
            let length = end - start + 1;
            file.seek(SeekFrom::Start(start)).await?;
            let body = Body::from_stream(ReaderStream::new(file.take(length)));

            Ok((
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_TYPE, content_type.to_string()),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                    (header::CONTENT_RANGE, format!("bytes {}-{}/{}", start, end, size)),
                    (header::CONTENT_LENGTH, length.to_string()),
                ],
                body,
            )
                .into_response())
        }
        None => Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, content_type.to_string()),
                (header::ACCEPT_RANGES, "bytes".to_string()),
                (header::CONTENT_LENGTH, size.to_string()),
            ],
            Body::from_stream(ReaderStream::new(file)),
        )
            .into_response()),
    }
}

/// Strict verification, except that a trusted peer in relaxed mode may
/// present an expired token.
fn verify(state: &AppState, token: &str, trusted: bool) -> Result<TrackScope, ApiError> {
    if token.is_empty() {
        return Err(ApiError::unauthorized("Authentication required"));
    }

    match state.tokens.verify_token(token) {
        Ok(scope) => Ok(scope),
        Err(TokenError::Expired) if trusted && state.config.tracks.whitelist_mode == WhitelistMode::RelaxedExpiry => {
            let scope = state.tokens.verify_ignoring_expiry(token).map_err(|e| {
                tracing::debug!("Trusted peer presented an invalid token: {}", e);
                ApiError::forbidden("Invalid or expired token")
            })?;
            tracing::debug!("Trusted peer using expired token for {}/{}", scope.organism, scope.assembly);
            Ok(scope)
        }
        Err(e @ (TokenError::Unavailable(_) | TokenError::KeyLoad { .. })) => Err(e.into()),
        Err(e) => {
            tracing::debug!("Track token rejected: {}", e);
            Err(ApiError::forbidden("Invalid or expired token"))
        }
    }
}
