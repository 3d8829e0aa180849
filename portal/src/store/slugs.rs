use crate::database::is_unique_violation;
use crate::error::{PortalError, Result};
use crate::slug::{self, Allocation, SlugScope};
use rusqlite::{params, Connection};

/// Existing slugs in `scope` equal to `base` or of the form `base-…`,
/// leaving out the record being edited.
pub fn taken(
    conn: &Connection,
    scope: SlugScope,
    base: &str,
    exclude_id: Option<&str>,
) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT slug FROM {} WHERE (slug = ?1 OR slug LIKE ?1 || '-%') AND (?2 IS NULL OR id <> ?2)",
        scope.table()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![base, exclude_id], |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn resolve(
    conn: &Connection,
    scope: SlugScope,
    candidate: &str,
    exclude_id: Option<&str>,
) -> Result<Allocation> {
    let base = slug::normalize(candidate);
    let taken = taken(conn, scope, &base, exclude_id)?;
    slug::allocate(&base, &taken)
}

/// Resolve a slug and hand it to `write`.
///
/// A concurrent writer can claim the slug between the read and the write. When
/// `write` fails on the slug's UNIQUE constraint the slug is resolved again and
/// written up to `retries` more times; after that the caller gets a conflict.
pub fn write_with_retry<T>(
    conn: &Connection,
    scope: SlugScope,
    candidate: &str,
    exclude_id: Option<&str>,
    retries: u32,
    mut write: impl FnMut(&Allocation) -> rusqlite::Result<T>,
) -> Result<(T, Allocation)> {
    let mut attempt = 0;
    loop {
        let allocation = resolve(conn, scope, candidate, exclude_id)?;
        match write(&allocation) {
            Ok(value) => return Ok((value, allocation)),
            Err(e) if is_unique_violation(&e, scope.table(), "slug") => {
                if attempt >= retries {
                    tracing::warn!(
                        scope = scope.label(),
                        slug = %allocation.slug,
                        attempts = attempt + 1,
                        "slug conflict persisted"
                    );
                    return Err(PortalError::Conflict(format!(
                        "the {} slug {:?} was taken by another save, please try again",
                        scope.label(),
                        allocation.slug
                    )));
                }
                attempt += 1;
                tracing::info!(
                    scope = scope.label(),
                    slug = %allocation.slug,
                    "slug taken between check and write, resolving again"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    fn category(conn: &Connection, id: &str, slug: &str) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO categories (id, name, slug, created_at) VALUES (?1, ?2, ?3, 'now')",
            params![id, slug, slug],
        )
    }

    #[test]
    fn taken_only_returns_prefix_family() {
        let db = Database::open_in_memory().unwrap();
        for (id, slug) in [("1", "berita"), ("2", "berita-2"), ("3", "beritaku"), ("4", "agenda")] {
            category(&db.conn, id, slug).unwrap();
        }
        let mut got = taken(&db.conn, SlugScope::Category, "berita", None).unwrap();
        got.sort();
        assert_eq!(got, vec!["berita", "berita-2"]);

        let got = taken(&db.conn, SlugScope::Category, "berita", Some("1")).unwrap();
        assert_eq!(got, vec!["berita-2"]);
    }

    #[test]
    fn resolve_skips_existing() {
        let db = Database::open_in_memory().unwrap();
        category(&db.conn, "1", "berita").unwrap();
        category(&db.conn, "2", "berita-2").unwrap();

        let got = resolve(&db.conn, SlugScope::Category, "Berita", None).unwrap();
        assert_eq!(got.slug, "berita-3");
        assert!(got.adjusted);

        // Scopes are independent.
        let got = resolve(&db.conn, SlugScope::Article, "Berita", None).unwrap();
        assert_eq!(got.slug, "berita");
    }

    #[test]
    fn editing_keeps_own_slug() {
        let db = Database::open_in_memory().unwrap();
        category(&db.conn, "1", "berita").unwrap();
        let got = resolve(&db.conn, SlugScope::Category, "Berita", Some("1")).unwrap();
        assert_eq!(got.slug, "berita");
        assert!(!got.adjusted);
    }

    #[test]
    fn lost_race_is_retried_once() {
        let db = Database::open_in_memory().unwrap();
        let mut calls = 0;
        let (_, allocation) = write_with_retry(
            &db.conn,
            SlugScope::Category,
            "Agenda Desa",
            None,
            1,
            |a| {
                calls += 1;
                if calls == 1 {
                    // Another writer claims the slug first.
                    category(&db.conn, "other", &a.slug)?;
                }
                category(&db.conn, "mine", &a.slug)
            },
        )
        .unwrap();
        assert_eq!(calls, 2);
        assert_eq!(allocation.slug, "agenda-desa-2");
        assert!(allocation.adjusted);
    }

    #[test]
    fn second_lost_race_is_a_conflict() {
        let db = Database::open_in_memory().unwrap();
        let mut calls = 0;
        let result = write_with_retry(&db.conn, SlugScope::Category, "Agenda", None, 1, |a| {
            calls += 1;
            category(&db.conn, &format!("other-{calls}"), &a.slug)?;
            category(&db.conn, &format!("mine-{calls}"), &a.slug)
        });
        assert!(matches!(result, Err(PortalError::Conflict(_))));
        assert_eq!(calls, 2);
    }

    #[test]
    fn other_errors_are_not_retried() {
        let db = Database::open_in_memory().unwrap();
        let mut calls = 0;
        let result = write_with_retry(&db.conn, SlugScope::Category, "Agenda", None, 3, |_| {
            calls += 1;
            db.conn.execute("INSERT INTO nowhere VALUES (1)", [])
        });
        assert!(matches!(result, Err(PortalError::Database(_))));
        assert_eq!(calls, 1);
    }
}
