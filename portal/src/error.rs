use crate::captcha::CaptchaError;
use crate::comments::CommentError;
use crate::editor::EditorError;
use crate::media::MediaError;
use crate::security::SecurityError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::PoisonError;
use thiserror::Error;

pub type Result<T, E = PortalError> = std::result::Result<T, E>;

/// Every failure is scoped to the action that caused it and reported back to
/// its caller; nothing here is fatal to the process.
#[derive(Error, Debug)]
pub enum PortalError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Media host error: {0}")]
    Media(#[from] MediaError),
    #[error("Comment host error: {0}")]
    Comments(#[from] CommentError),
    #[error("CAPTCHA service error: {0}")]
    Captcha(#[from] CaptchaError),
    #[error("Editor error: {0}")]
    Editor(#[from] EditorError),
    #[error("Security error: {0}")]
    Security(#[from] SecurityError),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Shared state lock poisoned")]
    Poisoned,
}

impl<T> From<PoisonError<T>> for PortalError {
    fn from(_: PoisonError<T>) -> Self {
        PortalError::Poisoned
    }
}

impl PortalError {
    pub fn validation(msg: impl Into<String>) -> Self {
        PortalError::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        PortalError::NotFound(what.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PortalError::Validation(_) => StatusCode::BAD_REQUEST,
            PortalError::Conflict(_) => StatusCode::CONFLICT,
            PortalError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            PortalError::Forbidden(_) => StatusCode::FORBIDDEN,
            PortalError::NotFound(_) => StatusCode::NOT_FOUND,
            PortalError::Media(e) if e.is_rejection() => StatusCode::BAD_REQUEST,
            PortalError::Media(MediaError::NotFound(_)) => StatusCode::NOT_FOUND,
            PortalError::Media(_) | PortalError::Comments(_) | PortalError::Captcha(_) => {
                StatusCode::BAD_GATEWAY
            }
            PortalError::Editor(EditorError::InvalidDocument(_)) => StatusCode::BAD_REQUEST,
            PortalError::Editor(_) => StatusCode::CONFLICT,
            PortalError::Database(_)
            | PortalError::Io(_)
            | PortalError::Security(_)
            | PortalError::Serde(_)
            | PortalError::Poisoned => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        assert_eq!(
            PortalError::validation("title is required").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PortalError::Conflict("slug taken".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            PortalError::Unauthorized("login required".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            PortalError::Forbidden("admins only".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            PortalError::not_found("Article").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PortalError::Media(MediaError::Empty).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PortalError::Comments(CommentError::Rejected("quota".into())).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn not_found_message_names_the_record() {
        assert_eq!(PortalError::not_found("Draft").to_string(), "Draft not found");
    }
}
