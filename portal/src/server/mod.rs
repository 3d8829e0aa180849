//! HTTP surface: the public site API, the dashboard API and asset serving.

mod account;
mod admin;
mod asset;
mod drafts;
mod public;

use crate::auth;
use crate::editor::AssetId;
use crate::error::Result;
use crate::state::AppState;
use crate::store;
use axum::{extract::DefaultBodyLimit, middleware, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    // Oversized uploads must still reach the media host to get its own error.
    let body_limit = state.config.media.max_upload_bytes.saturating_mul(2);

    Router::new()
        .merge(public::routes())
        .merge(account::routes())
        .merge(admin::routes())
        .merge(drafts::routes())
        .merge(asset::routes())
        .layer(middleware::from_fn_with_state(state.clone(), auth::guard))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve on an already bound listener until the task is dropped.
pub fn spawn(state: AppState, listener: TcpListener) -> JoinHandle<()> {
    let app = router(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("server stopped: {e}");
        }
    })
}

/// Bind `addr` (port 0 picks a free one) and start serving in the background.
pub async fn start_server(
    state: AppState,
    addr: &str,
) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tracing::info!(%local, "portal server started");
    Ok((local, spawn(state, listener)))
}

/// Keep only the assets no saved record points at any more.
fn unreferenced(state: &AppState, ids: impl IntoIterator<Item = AssetId>) -> Result<Vec<AssetId>> {
    let db = state.db()?;
    let mut orphaned = Vec::new();
    for id in ids {
        if !store::assets::in_use(&db.conn, id.as_str())? {
            orphaned.push(id);
        }
    }
    Ok(orphaned)
}

/// Delete from the media host, logging failures. Returns how many went through.
async fn discard_assets(state: &AppState, ids: Vec<AssetId>) -> usize {
    let mut deleted = 0;
    for id in ids {
        match state.media.delete(&id).await {
            Ok(()) => deleted += 1,
            Err(e) => tracing::warn!(asset = %id, "remote delete failed: {e}"),
        }
    }
    deleted
}
