use super::EditorError;
use serde::Serialize;

/// Where an inserted asset is in its life.
///
/// `Inserting -> Uploading -> {Finalized | RolledBack}`, then
/// `Finalized -> Removed -> {DeletedRemote | Retained}`. A removed asset never
/// becomes `Finalized` again; putting it back requires a fresh upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetState {
    Inserting,
    Uploading,
    Finalized,
    RolledBack,
    Removed,
    DeletedRemote,
    Retained,
}

pub fn allowed_transitions(from: AssetState) -> Vec<AssetState> {
    use AssetState::*;
    match from {
        Inserting => vec![Uploading, RolledBack],
        Uploading => vec![Finalized, RolledBack],
        Finalized => vec![Removed],
        Removed => vec![DeletedRemote, Retained],
        // A retained asset is live again and may be removed a second time.
        Retained => vec![Removed],
        RolledBack => vec![],
        DeletedRemote => vec![],
    }
}

pub fn validate_transition(from: AssetState, to: AssetState) -> Result<(), EditorError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(EditorError::IllegalTransition { from, to })
    }
}

impl AssetState {
    /// No further transitions.
    pub fn is_terminal(self) -> bool {
        allowed_transitions(self).is_empty()
    }

    /// The asset is (or should be) embedded in the document.
    pub fn is_live(self) -> bool {
        matches!(self, AssetState::Finalized | AssetState::Retained)
    }
}
