//! Media hosting for images embedded in articles, banners and the jumbotron.
//!
//! The rest of the portal only sees the [`MediaHost`] trait. The bundled
//! [`LocalMediaHost`] keeps files under a directory and indexes them in the
//! `assets` table; `GET /asset/:id` serves them back.

use crate::config::MediaConfig;
use crate::database::SharedDb;
use crate::editor::AssetId;
use crate::models::Asset;
use crate::store;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("The uploaded file is empty")]
    Empty,
    #[error("File is {size} bytes, the limit is {limit}")]
    TooLarge { size: usize, limit: usize },
    #[error("File type {0} is not allowed")]
    UnsupportedType(String),
    #[error("File is not a readable image: {0}")]
    Unreadable(String),
    #[error("Folder name {0:?} is not allowed")]
    BadFolder(String),
    #[error("Asset {0} not found")]
    NotFound(String),
    #[error("Storage failure: {0}")]
    Storage(#[from] std::io::Error),
    #[error("Index failure: {0}")]
    Index(#[from] rusqlite::Error),
    #[error("Media index is unavailable")]
    Unavailable,
}

impl MediaError {
    /// The file itself was refused, as opposed to the host failing.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            MediaError::Empty
                | MediaError::TooLarge { .. }
                | MediaError::UnsupportedType(_)
                | MediaError::Unreadable(_)
                | MediaError::BadFolder(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub url: String,
    pub asset_id: AssetId,
    pub width: u32,
    pub height: u32,
}

#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Store `bytes` under `folder` and return where it can be fetched.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        folder: &str,
    ) -> Result<UploadedAsset, MediaError>;

    async fn delete(&self, asset_id: &AssetId) -> Result<(), MediaError>;
}

/// Simple mime type guessing based on extension
pub fn guess_mime(extension: &str) -> &'static str {
    match extension.to_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

fn valid_folder(folder: &str) -> bool {
    !folder.is_empty()
        && folder.len() <= 64
        && folder
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

pub struct LocalMediaHost {
    root: PathBuf,
    public_base_url: String,
    max_upload_bytes: usize,
    allowed_types: Vec<String>,
    db: SharedDb,
}

impl LocalMediaHost {
    pub fn new(config: &MediaConfig, db: SharedDb) -> Self {
        LocalMediaHost {
            root: config.root.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            max_upload_bytes: config.max_upload_bytes,
            allowed_types: config.allowed_types.clone(),
            db,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn index<T>(
        &self,
        f: impl FnOnce(&rusqlite::Connection) -> rusqlite::Result<T>,
    ) -> Result<T, MediaError> {
        let db = self.db.lock().map_err(|_| MediaError::Unavailable)?;
        Ok(f(&db.conn)?)
    }
}

#[async_trait]
impl MediaHost for LocalMediaHost {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        folder: &str,
    ) -> Result<UploadedAsset, MediaError> {
        if !valid_folder(folder) {
            return Err(MediaError::BadFolder(folder.to_string()));
        }
        if bytes.is_empty() {
            return Err(MediaError::Empty);
        }
        if bytes.len() > self.max_upload_bytes {
            return Err(MediaError::TooLarge {
                size: bytes.len(),
                limit: self.max_upload_bytes,
            });
        }

        let source = Path::new(filename);
        let file_stem = source
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let extension = source
            .extension()
            .unwrap_or_default()
            .to_string_lossy()
            .to_lowercase();
        let mime_type = guess_mime(&extension);
        if !self.allowed_types.iter().any(|t| t == mime_type) {
            return Err(MediaError::UnsupportedType(mime_type.to_string()));
        }

        let (width, height) = image::ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()
            .map_err(|e| MediaError::Unreadable(e.to_string()))?
            .into_dimensions()
            .map_err(|e| MediaError::Unreadable(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let dest_filename = format!("{folder}/{id}.{extension}");
        let dest_path = self.root.join(&dest_filename);
        if let Some(parent) = dest_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&dest_path, &bytes).await?;

        let asset = Asset {
            id: id.clone(),
            folder: folder.to_string(),
            file_path: dest_filename,
            original_name: file_stem,
            mime_type: mime_type.to_string(),
            size_bytes: bytes.len() as i64,
            width,
            height,
            created_at: store::now(),
        };
        if let Err(e) = self.index(|conn| store::assets::insert(conn, &asset)) {
            // Don't leave an unindexed file behind.
            if let Err(err) = tokio::fs::remove_file(&dest_path).await {
                tracing::warn!(asset = %id, path = %dest_path.display(), "cleanup after failed index insert: {err}");
            }
            return Err(e);
        }

        tracing::info!(asset = %id, folder, bytes = bytes.len(), "stored upload");
        Ok(UploadedAsset {
            url: format!("{}/{}", self.public_base_url, id),
            asset_id: AssetId(id),
            width,
            height,
        })
    }

    async fn delete(&self, asset_id: &AssetId) -> Result<(), MediaError> {
        let id = asset_id.as_str().to_string();
        let asset = self
            .index(|conn| store::assets::get(conn, &id))?
            .ok_or_else(|| MediaError::NotFound(id.clone()))?;

        let full_path = self.root.join(&asset.file_path);
        match tokio::fs::remove_file(&full_path).await {
            Ok(()) => {}
            // Ignore error if file missing
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(asset = %id, path = %full_path.display(), "file already gone");
            }
            Err(e) => return Err(e.into()),
        }

        self.index(|conn| store::assets::delete(conn, &id))?;
        tracing::info!(asset = %id, "deleted asset");
        Ok(())
    }
}
