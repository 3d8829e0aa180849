//! Editing sessions for rich article content.
//!
//! An [`EditorSession`] owns one [`Document`] and tracks every asset the user
//! inserts through it. Uploads are split in three steps so the caller can drop
//! its lock on the session while the bytes travel to the media host:
//!
//! 1. [`EditorSession::insert_placeholder`] puts a marker at the cursor.
//! 2. The caller uploads.
//! 3. [`EditorSession::finalize`] swaps the marker for the media node, or
//!    [`EditorSession::rollback`] removes it.
//!
//! Removals are detected by diffing the previous and the next revision of the
//! document in [`EditorSession::replace_document`]. Removed assets wait out a
//! debounce window and are then either retained (referenced again) or handed
//! back by [`EditorSession::settle_removals`] for remote deletion.

pub mod document;
pub mod lifecycle;

pub use document::{removed_assets, Align, AssetId, CorrelationId, Document, MediaNode, Node};
pub use lifecycle::{allowed_transitions, validate_transition, AssetState};

use crate::media::UploadedAsset;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("placeholder {0} already exists")]
    DuplicatePlaceholder(CorrelationId),
    #[error("illegal asset transition {from:?} -> {to:?}")]
    IllegalTransition { from: AssetState, to: AssetState },
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

/// What [`EditorSession::finalize`] did with an upload result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finalized {
    /// The placeholder at this index became the media node.
    Replaced(usize),
    /// The placeholder was edited away; the node went to the cursor instead.
    InsertedAtCursor(usize),
    /// The correlation id is no longer uploading. Nothing changed.
    Ignored,
}

#[derive(Debug)]
pub struct EditorSession {
    document: Document,
    revision: u64,
    uploads: HashMap<CorrelationId, AssetState>,
    assets: HashMap<AssetId, AssetState>,
    pending: BTreeMap<AssetId, Instant>,
}

impl EditorSession {
    pub fn new(document: Document) -> Self {
        let assets = document
            .asset_ids()
            .into_iter()
            .map(|id| (id, AssetState::Finalized))
            .collect();
        EditorSession {
            document,
            revision: 0,
            uploads: HashMap::new(),
            assets,
            pending: BTreeMap::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn upload_state(&self, id: &CorrelationId) -> Option<AssetState> {
        self.uploads.get(id).copied()
    }

    pub fn asset_state(&self, id: &AssetId) -> Option<AssetState> {
        self.assets.get(id).copied()
    }

    pub fn uploads_in_flight(&self) -> usize {
        self.uploads
            .values()
            .filter(|s| matches!(s, AssetState::Inserting | AssetState::Uploading))
            .count()
    }

    pub fn pending_removals(&self) -> usize {
        self.pending.len()
    }

    pub fn set_cursor(&mut self, pos: usize) {
        self.document.set_cursor(pos);
    }

    /// Insert a placeholder for a new upload under a fresh correlation id.
    pub fn begin_upload(&mut self) -> Result<CorrelationId, EditorError> {
        let id = CorrelationId::new();
        self.insert_placeholder(id)?;
        Ok(id)
    }

    /// Put an uploading marker at the cursor. Returns its index.
    pub fn insert_placeholder(&mut self, id: CorrelationId) -> Result<usize, EditorError> {
        if self.uploads.contains_key(&id) || self.document.placeholder_index(&id).is_some() {
            return Err(EditorError::DuplicatePlaceholder(id));
        }
        self.uploads.insert(id, AssetState::Inserting);
        let idx = self
            .document
            .insert_at_cursor(Node::Placeholder { correlation_id: id });
        self.transition_upload(id, AssetState::Uploading)?;
        self.revision += 1;
        Ok(idx)
    }

    /// Swap the placeholder for the uploaded media.
    pub fn finalize(
        &mut self,
        id: CorrelationId,
        asset: &UploadedAsset,
    ) -> Result<Finalized, EditorError> {
        if self.upload_state(&id) != Some(AssetState::Uploading) {
            return Ok(Finalized::Ignored);
        }

        let node = Node::Media(MediaNode::from_upload(asset));
        let outcome = match self.document.placeholder_index(&id) {
            Some(idx) => {
                self.document.replace(idx, node);
                Finalized::Replaced(idx)
            }
            None => Finalized::InsertedAtCursor(self.document.insert_at_cursor(node)),
        };

        self.transition_upload(id, AssetState::Finalized)?;
        self.assets
            .entry(asset.asset_id.clone())
            .or_insert(AssetState::Finalized);
        self.revision += 1;
        Ok(outcome)
    }

    /// Drop the placeholder of a failed upload. Returns whether anything changed.
    pub fn rollback(&mut self, id: CorrelationId) -> Result<bool, EditorError> {
        match self.upload_state(&id) {
            Some(AssetState::Inserting | AssetState::Uploading) => {}
            _ => return Ok(false),
        }

        let removed = match self.document.placeholder_index(&id) {
            Some(idx) => self.document.remove(idx).is_some(),
            None => false,
        };
        self.transition_upload(id, AssetState::RolledBack)?;
        if removed {
            self.revision += 1;
        }
        Ok(removed)
    }

    /// Accept a new revision of the document from the user.
    ///
    /// Returns the assets that dropped out of the document with this edit and
    /// are now waiting for [`settle_removals`](Self::settle_removals). An
    /// asset removed again before it settled restarts its window.
    pub fn replace_document(&mut self, next: Document) -> Result<Vec<AssetId>, EditorError> {
        self.replace_document_at(next, Instant::now())
    }

    fn replace_document_at(
        &mut self,
        next: Document,
        now: Instant,
    ) -> Result<Vec<AssetId>, EditorError> {
        next.validate().map_err(EditorError::InvalidDocument)?;
        // A placeholder may only stand for an upload that is still running.
        for node in next.nodes() {
            if let Node::Placeholder { correlation_id } = node {
                if self.uploads.get(correlation_id) != Some(&AssetState::Uploading) {
                    return Err(EditorError::InvalidDocument(format!(
                        "placeholder {correlation_id} has no upload in progress"
                    )));
                }
            }
        }

        let gone = removed_assets(&self.document, &next);
        self.document = next;
        self.revision += 1;

        let mut newly_pending = Vec::new();
        for id in gone {
            let state = self
                .assets
                .get(&id)
                .copied()
                .unwrap_or(AssetState::Finalized);
            match state {
                AssetState::Removed => {}
                s if s.is_live() => {
                    validate_transition(s, AssetState::Removed)?;
                    self.assets.insert(id.clone(), AssetState::Removed);
                }
                _ => continue,
            }
            self.pending.insert(id.clone(), now);
            newly_pending.push(id);
        }

        // Embeds pasted from elsewhere become ours to track.
        for id in self.document.asset_ids() {
            self.assets.entry(id).or_insert(AssetState::Finalized);
        }

        Ok(newly_pending)
    }

    /// Resolve removals older than `window`. Assets that are referenced again
    /// are retained; the rest are returned and must be deleted remotely.
    pub fn settle_removals(&mut self, now: Instant, window: Duration) -> Vec<AssetId> {
        let due: Vec<AssetId> = self
            .pending
            .iter()
            .filter(|(_, removed_at)| now.saturating_duration_since(**removed_at) >= window)
            .map(|(id, _)| id.clone())
            .collect();

        let mut to_delete = Vec::new();
        for id in due {
            self.pending.remove(&id);
            let next = if self.document.references(&id) > 0 {
                AssetState::Retained
            } else {
                AssetState::DeletedRemote
            };
            self.assets.insert(id.clone(), next);
            if next == AssetState::DeletedRemote {
                to_delete.push(id);
            }
        }
        to_delete
    }

    fn transition_upload(&mut self, id: CorrelationId, to: AssetState) -> Result<(), EditorError> {
        let from = self.uploads.get(&id).copied().unwrap_or(AssetState::Inserting);
        validate_transition(from, to)?;
        self.uploads.insert(id, to);
        Ok(())
    }
}
