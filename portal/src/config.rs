//! Portal configuration loaded from `portal.toml`.
//!
//! Every field has a default, so an absent file or an empty section is valid.
//! Optional integrations (`[comments]`, `[captcha]`) are disabled unless their
//! section is present.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "PORTAL_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "portal.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub media: MediaConfig,
    pub editor: EditorConfig,
    pub slug: SlugConfig,
    pub auth: AuthConfig,
    pub comments: Option<CommentsConfig>,
    pub captcha: Option<CaptchaConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("portal.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Directory holding uploaded files.
    pub root: PathBuf,
    /// Prefix of public asset URLs; the asset id is appended.
    pub public_base_url: String,
    pub max_upload_bytes: usize,
    /// Accepted MIME types.
    pub allowed_types: Vec<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("media"),
            public_base_url: "/asset".to_string(),
            max_upload_bytes: 5 * 1024 * 1024,
            allowed_types: ["image/png", "image/jpeg", "image/gif", "image/webp"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// How long a removed image may stay unreferenced before it is deleted
    /// from the media host.
    pub removal_debounce_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            removal_debounce_ms: 1500,
        }
    }
}

impl EditorConfig {
    pub fn removal_debounce(&self) -> Duration {
        Duration::from_millis(self.removal_debounce_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlugConfig {
    /// Extra write attempts after a slug lost a race to a concurrent insert.
    pub write_retries: u32,
}

impl Default for SlugConfig {
    fn default() -> Self {
        Self { write_retries: 1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub session_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentsConfig {
    /// Thread listing endpoint, e.g. `https://disqus.com/api/3.0/threads/listPosts.json`.
    pub endpoint: String,
    pub api_key: String,
    pub forum: String,
    #[serde(default = "default_comment_limit")]
    pub limit: u32,
}

fn default_comment_limit() -> u32 {
    25
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptchaConfig {
    /// Verification endpoint, e.g. `https://www.google.com/recaptcha/api/siteverify`.
    pub verify_url: String,
    pub secret: String,
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid configuration")
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }

    /// `--config` flag, then `$PORTAL_CONFIG`, then `./portal.toml`.
    pub fn resolve_path(flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}
