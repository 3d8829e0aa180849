//! Editing sessions over HTTP.
//!
//! The drafts lock is only ever taken inside [`with_draft`], so no handler
//! holds it while an upload or a remote delete is awaited.

use super::discard_assets;
use crate::auth::{Principal, Role};
use crate::editor::{AssetId, Document, EditorSession, Finalized, Node};
use crate::error::{PortalError, Result};
use crate::media::UploadedAsset;
use crate::models::Article;
use crate::state::{AppState, Draft};
use crate::store;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/drafts", post(open_draft))
        .route("/admin/drafts/:id", get(get_draft).delete(close_draft))
        .route("/admin/drafts/:id/document", put(edit_document))
        .route("/admin/drafts/:id/uploads", post(upload_into_draft))
        .route("/admin/drafts/:id/save", post(save_draft))
}

#[derive(Debug, Serialize)]
struct DraftView {
    id: Uuid,
    article_id: Option<String>,
    revision: u64,
    uploads_in_flight: usize,
    pending_removals: usize,
    document: Document,
    html: String,
}

impl DraftView {
    fn of(id: Uuid, draft: &Draft) -> Self {
        let session = &draft.session;
        DraftView {
            id,
            article_id: draft.article_id.clone(),
            revision: session.revision(),
            uploads_in_flight: session.uploads_in_flight(),
            pending_removals: session.pending_removals(),
            document: session.document().clone(),
            html: session.document().to_html(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct OpenDraft {
    #[serde(default)]
    article_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadQuery {
    filename: String,
    #[serde(default = "default_folder")]
    folder: String,
}

fn default_folder() -> String {
    "articles".to_string()
}

#[derive(Debug, Serialize)]
struct UploadOutcome {
    asset: UploadedAsset,
    draft: DraftView,
}

/// Run `f` on the caller's draft under the drafts lock.
fn with_draft<T>(
    state: &AppState,
    id: Uuid,
    principal: &Principal,
    f: impl FnOnce(&mut Draft) -> Result<T>,
) -> Result<T> {
    let mut drafts = state.drafts()?;
    let draft = drafts
        .get_mut(&id)
        .ok_or_else(|| PortalError::not_found("Draft"))?;
    if draft.owner_id != principal.user_id && principal.role != Role::Admin {
        return Err(PortalError::Forbidden(
            "this draft belongs to another user".into(),
        ));
    }
    f(draft)
}

fn settle_due(state: &AppState, id: Uuid, window: Duration) -> Result<Vec<AssetId>> {
    let mut drafts = state.drafts()?;
    Ok(drafts
        .get_mut(&id)
        .map(|d| d.session.settle_removals(Instant::now(), window))
        .unwrap_or_default())
}

/// Re-check removed assets once the debounce window has passed.
fn schedule_removal_check(state: AppState, id: Uuid) {
    let window = state.config.editor.removal_debounce();
    tokio::spawn(async move {
        tokio::time::sleep(window).await;
        let due = match settle_due(&state, id, window) {
            Ok(due) => due,
            Err(e) => {
                tracing::warn!(draft = %id, "removal check skipped: {e}");
                return;
            }
        };
        if !due.is_empty() {
            let deleted = discard_assets(&state, due).await;
            tracing::debug!(draft = %id, deleted, "removed assets cleaned up");
        }
    });
}

async fn open_draft(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<OpenDraft>,
) -> Result<(StatusCode, Json<DraftView>)> {
    let document = match req.article_id.as_deref() {
        Some(article_id) => {
            let db = state.db()?;
            store::articles::get(&db.conn, article_id)?
                .ok_or_else(|| PortalError::not_found("Article"))?
                .document
        }
        None => Document::new(),
    };

    let id = Uuid::new_v4();
    let draft = Draft {
        session: EditorSession::new(document),
        article_id: req.article_id,
        owner_id: principal.user_id.clone(),
    };
    let view = DraftView::of(id, &draft);
    state.drafts()?.insert(id, draft);
    tracing::info!(draft = %id, user = %principal.user_id, "draft opened");
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_draft(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<DraftView>> {
    with_draft(&state, id, &principal, |d| Ok(Json(DraftView::of(id, d))))
}

async fn edit_document(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(document): Json<Document>,
) -> Result<Json<DraftView>> {
    let (pending, view) = with_draft(&state, id, &principal, |d| {
        let pending = d.session.replace_document(document)?;
        Ok((pending, DraftView::of(id, d)))
    })?;
    if !pending.is_empty() {
        tracing::debug!(draft = %id, count = pending.len(), "assets removed from document");
        schedule_removal_check(state.clone(), id);
    }
    Ok(Json(view))
}

async fn upload_into_draft(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Query(q): Query<UploadQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadOutcome>)> {
    let correlation_id = with_draft(&state, id, &principal, |d| Ok(d.session.begin_upload()?))?;
    tracing::debug!(draft = %id, upload = %correlation_id, "upload started");

    let asset = match state
        .media
        .upload(body.to_vec(), &q.filename, &q.folder)
        .await
    {
        Ok(asset) => asset,
        Err(e) => {
            tracing::warn!(draft = %id, upload = %correlation_id, "upload failed: {e}");
            let rolled_back =
                with_draft(&state, id, &principal, |d| Ok(d.session.rollback(correlation_id)?));
            if let Err(re) = rolled_back {
                tracing::warn!(draft = %id, "placeholder not rolled back: {re}");
            }
            return Err(e.into());
        }
    };

    let finalized = match with_draft(&state, id, &principal, |d| {
        Ok(d.session.finalize(correlation_id, &asset)?)
    }) {
        Ok(Finalized::Ignored) => Err(PortalError::Conflict(
            "the upload was cancelled before it finished".into(),
        )),
        other => other,
    };
    if let Err(e) = finalized {
        // The session no longer wants this file.
        discard_assets(&state, vec![asset.asset_id.clone()]).await;
        return Err(e);
    }

    let draft = with_draft(&state, id, &principal, |d| Ok(DraftView::of(id, d)))?;
    tracing::info!(draft = %id, asset = %asset.asset_id, "upload placed in document");
    Ok((StatusCode::CREATED, Json(UploadOutcome { asset, draft })))
}

async fn save_draft(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<Article>> {
    let (article_id, document) = with_draft(&state, id, &principal, |d| {
        let in_flight = d.session.uploads_in_flight();
        if in_flight > 0 {
            return Err(PortalError::Conflict(format!(
                "{in_flight} upload(s) still in progress"
            )));
        }
        let document = d.session.document();
        if document
            .nodes()
            .iter()
            .any(|n| matches!(n, Node::Placeholder { .. }))
        {
            return Err(PortalError::Conflict(
                "the document still contains an upload placeholder".into(),
            ));
        }
        let article_id = d
            .article_id
            .clone()
            .ok_or_else(|| PortalError::validation("draft is not linked to an article"))?;
        Ok((article_id, document.clone()))
    })?;

    let db = state.db()?;
    store::articles::update_document(&db.conn, &article_id, &document)?;
    let article = store::articles::get(&db.conn, &article_id)?
        .ok_or_else(|| PortalError::not_found("Article"))?;
    tracing::info!(draft = %id, article = %article_id, "draft saved");
    Ok(Json(article))
}

async fn close_draft(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let due = with_draft(&state, id, &principal, |d| {
        Ok(d.session.settle_removals(Instant::now(), Duration::ZERO))
    })?;
    state.drafts()?.remove(&id);
    discard_assets(&state, due).await;
    tracing::info!(draft = %id, "draft closed");
    Ok(StatusCode::NO_CONTENT)
}
