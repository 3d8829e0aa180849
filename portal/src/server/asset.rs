use crate::error::{PortalError, Result};
use crate::state::AppState;
use crate::store;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

pub(super) fn routes() -> Router<AppState> {
    Router::new().route("/asset/:id", get(get_asset))
}

#[derive(Debug, PartialEq, Eq)]
enum ByteRange {
    Full,
    Partial { start: u64, end: u64 },
    Unsatisfiable,
}

/// Simple `bytes=start-end` parser. Anything it does not understand is served
/// whole.
fn parse_range(headers: &HeaderMap, total_len: u64) -> ByteRange {
    let Some(range_s) = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("bytes="))
    else {
        return ByteRange::Full;
    };
    if total_len == 0 {
        return ByteRange::Unsatisfiable;
    }

    let (start_s, end_s) = range_s.split_once('-').unwrap_or((range_s, ""));
    let last = total_len - 1;
    let (start, end) = if start_s.is_empty() {
        // Suffix form: the final N bytes.
        match end_s.parse::<u64>() {
            Ok(n) if n > 0 => (total_len.saturating_sub(n), last),
            _ => return ByteRange::Unsatisfiable,
        }
    } else {
        let Ok(start) = start_s.parse::<u64>() else {
            return ByteRange::Full;
        };
        let end = if end_s.is_empty() {
            last
        } else {
            end_s.parse::<u64>().unwrap_or(last)
        };
        (start, end)
    };

    if start <= end && start < total_len {
        ByteRange::Partial {
            start,
            end: end.min(last),
        }
    } else {
        ByteRange::Unsatisfiable
    }
}

fn header_value(value: String) -> HeaderValue {
    HeaderValue::from_str(&value)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}

async fn get_asset(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    let asset = {
        let db = state.db()?;
        store::assets::get(&db.conn, &id)?
    }
    .ok_or_else(|| PortalError::not_found("Asset"))?;

    let full_path = state.config.media.root.join(&asset.file_path);
    let data = match tokio::fs::read(&full_path).await {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(
                asset = %id,
                path = %full_path.display(),
                "indexed asset missing on disk"
            );
            return Err(PortalError::not_found("Asset file"));
        }
        Err(e) => return Err(e.into()),
    };

    let total_len = data.len() as u64;
    let mut out = HeaderMap::new();
    out.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    match parse_range(&headers, total_len) {
        ByteRange::Full => {
            out.insert(header::CONTENT_TYPE, header_value(asset.mime_type));
            Ok((StatusCode::OK, out, data).into_response())
        }
        ByteRange::Partial { start, end } => {
            let chunk = data[start as usize..=end as usize].to_vec();
            out.insert(header::CONTENT_TYPE, header_value(asset.mime_type));
            out.insert(
                header::CONTENT_RANGE,
                header_value(format!("bytes {start}-{end}/{total_len}")),
            );
            out.insert(header::CONTENT_LENGTH, chunk.len().into());
            Ok((StatusCode::PARTIAL_CONTENT, out, chunk).into_response())
        }
        ByteRange::Unsatisfiable => {
            out.insert(
                header::CONTENT_RANGE,
                header_value(format!("bytes */{total_len}")),
            );
            Ok((StatusCode::RANGE_NOT_SATISFIABLE, out).into_response())
        }
    }
}
