//! Read-only access to the hosted comment threads shown under articles.

use crate::config::CommentsConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommentError {
    #[error("Comment host unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Comment host rejected the request: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: String,
    /// HTML as delivered by the host.
    pub message: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentPage {
    pub comments: Vec<Comment>,
    pub next_cursor: Option<String>,
}

#[async_trait]
pub trait CommentHost: Send + Sync {
    /// One page of comments for `thread`, newest first.
    async fn list(&self, thread: &str, cursor: Option<&str>) -> Result<CommentPage, CommentError>;
}

#[derive(Debug, Deserialize)]
struct RawListing {
    code: i64,
    #[serde(default)]
    cursor: Option<RawCursor>,
    response: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCursor {
    next: Option<String>,
    #[serde(default)]
    has_next: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPost {
    id: String,
    message: String,
    created_at: String,
    author: RawAuthor,
}

#[derive(Debug, Deserialize)]
struct RawAuthor {
    name: String,
}

fn parse_listing(raw: RawListing) -> Result<CommentPage, CommentError> {
    if raw.code != 0 {
        let reason = match raw.response {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        return Err(CommentError::Rejected(reason));
    }

    let posts: Vec<RawPost> = serde_json::from_value(raw.response)
        .map_err(|e| CommentError::Rejected(format!("unexpected listing shape: {e}")))?;

    let next_cursor = raw
        .cursor
        .filter(|c| c.has_next)
        .and_then(|c| c.next);

    Ok(CommentPage {
        comments: posts
            .into_iter()
            .map(|p| Comment {
                id: p.id,
                author: p.author.name,
                message: p.message,
                created_at: p.created_at,
            })
            .collect(),
        next_cursor,
    })
}

/// Talks to a Disqus-style `threads/listPosts` endpoint.
pub struct HttpCommentHost {
    client: reqwest::Client,
    config: CommentsConfig,
}

impl HttpCommentHost {
    pub fn new(config: CommentsConfig) -> Self {
        HttpCommentHost {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl CommentHost for HttpCommentHost {
    async fn list(&self, thread: &str, cursor: Option<&str>) -> Result<CommentPage, CommentError> {
        let limit = self.config.limit.to_string();
        let mut query = vec![
            ("api_key", self.config.api_key.as_str()),
            ("forum", self.config.forum.as_str()),
            ("thread:ident", thread),
            ("limit", limit.as_str()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }

        let raw: RawListing = self
            .client
            .get(&self.config.endpoint)
            .query(&query)
            .send()
            .await?
            .json()
            .await?;

        let page = parse_listing(raw)?;
        tracing::debug!(thread, count = page.comments.len(), "fetched comments");
        Ok(page)
    }
}
