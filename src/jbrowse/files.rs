use std::path::Path;

use crate::error::ApiError;

/// `organism/assembly/...` path checked against traversal. Returns the
/// (organism, assembly) prefix that a token must cover.
pub fn track_scope(file: &str) -> Result<(&str, &str), ApiError> {
    if file.is_empty() {
        return Err(ApiError::bad_request("Missing file parameter"));
    }

    if file.contains("..") || file.contains("//") || file.starts_with('/') || file.contains('\\') || file.contains('\0') {
        return Err(ApiError::bad_request("Invalid file path"));
    }

    let mut parts = file.split('/');
    match (parts.next(), parts.next()) {
        (Some(organism), Some(assembly)) if !organism.is_empty() && !assembly.is_empty() => Ok((organism, assembly)),
        _ => Err(ApiError::bad_request("Invalid file path format")),
    }
}

/// Inclusive byte range from a `Range: bytes=start-[end]` header.
///
/// `Ok(None)` means serve the whole file: no header, or one we do not
/// understand (suffix and multi-range forms included).
pub fn parse_range(header: Option<&str>, size: u64) -> Result<Option<(u64, u64)>, ApiError> {
    let Some(spec) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return Ok(None);
    };
    let Some((start, end)) = spec.split_once('-') else {
        return Ok(None);
    };
    let Ok(start) = start.trim().parse::<u64>() else {
        return Ok(None);
    };

    let end = match end.trim() {
        "" => size.saturating_sub(1),
        raw => match raw.parse::<u64>() {
            Ok(end) => end.min(size.saturating_sub(1)),
            Err(_) => return Ok(None),
        },
    };

    if start >= size || start > end {
        return Err(ApiError::range_not_satisfiable(size));
    }
    Ok(Some((start, end)))
}

pub fn content_type(file: &str) -> &'static str {
    let ext = Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "vcf" | "maf" | "bed" | "gff" | "gff3" | "gtf" | "paf" => "text/plain",
        "gz" => "application/gzip",
        _ => "application/octet-stream",
    }
}
