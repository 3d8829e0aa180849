use crate::error::Result;
use rusqlite::{ffi, Connection, ErrorCode};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub type SharedDb = Arc<Mutex<Database>>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS categories (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS articles (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    category_id TEXT REFERENCES categories(id) ON DELETE SET NULL,
    document TEXT NOT NULL,
    thumbnail_url TEXT,
    published INTEGER NOT NULL DEFAULT 0,
    author_id TEXT REFERENCES users(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS banners (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    image_url TEXT NOT NULL,
    asset_id TEXT,
    link_url TEXT,
    position INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS teams (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    position INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS employees (
    id TEXT PRIMARY KEY,
    team_id TEXT REFERENCES teams(id) ON DELETE SET NULL,
    name TEXT NOT NULL,
    job_title TEXT NOT NULL,
    photo_url TEXT,
    position INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS faqs (
    id TEXT PRIMARY KEY,
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    position INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS videos (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    url TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS links (
    id TEXT PRIMARY KEY,
    label TEXT NOT NULL,
    url TEXT NOT NULL,
    position INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS profile (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    vision TEXT NOT NULL,
    mission TEXT NOT NULL,
    history TEXT NOT NULL,
    address TEXT NOT NULL,
    phone TEXT NOT NULL,
    email TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS jumbotron (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    headline TEXT NOT NULL,
    subheadline TEXT NOT NULL,
    image_url TEXT,
    asset_id TEXT,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS assets (
    id TEXT PRIMARY KEY,
    folder TEXT NOT NULL,
    file_path TEXT NOT NULL,
    original_name TEXT NOT NULL,
    mime_type TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    width INTEGER NOT NULL,
    height INTEGER NOT NULL,
    created_at TEXT NOT NULL
);
";

pub struct Database {
    pub db_path: Option<PathBuf>,
    pub conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database file and bring the schema up.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        // Optimize for a single-process server
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::prepare(conn, Some(path.to_path_buf()))
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::prepare(Connection::open_in_memory()?, None)
    }

    fn prepare(conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!(path = ?db_path, "database schema ready");
        Ok(Database { db_path, conn })
    }
}

/// True when `err` is a UNIQUE constraint failure on `table.column`.
pub fn is_unique_violation(err: &rusqlite::Error, table: &str, column: &str) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, msg) => {
            e.code == ErrorCode::ConstraintViolation
                && e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                && msg
                    .as_deref()
                    .map(|m| m.contains(&format!("{table}.{column}")))
                    .unwrap_or(true)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_file_database_with_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("portal.db");
        let db = Database::open(&path).unwrap();
        assert!(path.exists());

        let count: i64 = db
            .conn
            .query_row("SELECT count(*) FROM articles", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);

        // Reopening keeps the schema idempotent.
        drop(db);
        Database::open(&path).unwrap();
    }

    #[test]
    fn detects_slug_unique_violation() {
        let db = Database::open_in_memory().unwrap();
        let insert = "INSERT INTO categories (id, name, slug, created_at) VALUES (?1, 'x', 'berita', 'now')";
        db.conn.execute(insert, ["a"]).unwrap();
        let err = db.conn.execute(insert, ["b"]).unwrap_err();
        assert!(is_unique_violation(&err, "categories", "slug"));
        assert!(!is_unique_violation(&err, "articles", "slug"));

        let err = db
            .conn
            .execute(
                "INSERT INTO categories (id, name, slug, created_at) VALUES ('a', 'x', 'other', 'now')",
                [],
            )
            .unwrap_err();
        assert!(!is_unique_violation(&err, "categories", "slug"));
    }
}
