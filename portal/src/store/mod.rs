//! Persistence for every portal record.
//!
//! Functions take a borrowed [`rusqlite::Connection`] and never lock anything
//! themselves; handlers hold the database lock only for the duration of a call.

pub mod articles;
pub mod assets;
pub mod categories;
pub mod content;
pub mod site;
pub mod slugs;
pub mod users;

use crate::error::{PortalError, Result};
use uuid::Uuid;

/// Public listings are paged this many at a time.
pub const PER_PAGE: u32 = 10;

pub fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// `LIMIT`/`OFFSET` for 1-based `page`.
pub(crate) fn page_window(page: u32) -> (u32, i64, i64) {
    let page = page.max(1);
    (page, PER_PAGE as i64, ((page - 1) * PER_PAGE) as i64)
}

pub(crate) fn ensure_changed(changed: usize, what: &str) -> Result<()> {
    if changed == 0 {
        return Err(PortalError::not_found(what));
    }
    Ok(())
}
