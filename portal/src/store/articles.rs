use super::{ensure_changed, new_id, now, page_window, slugs};
use crate::editor::Document;
use crate::error::{PortalError, Result};
use crate::models::{Article, ArticleInput, Page, Saved};
use crate::slug::SlugScope;
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};

const COLUMNS: &str =
    "id, title, slug, category_id, document, thumbnail_url, published, author_id, created_at, updated_at";

fn from_row(row: &Row) -> rusqlite::Result<Article> {
    let document_json: String = row.get(4)?;
    let document: Document = serde_json::from_str(&document_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    Ok(Article {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        category_id: row.get(3)?,
        document,
        thumbnail_url: row.get(5)?,
        published: row.get(6)?,
        author_id: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

pub fn create(
    conn: &Connection,
    input: &ArticleInput,
    author_id: Option<&str>,
    retries: u32,
) -> Result<Saved<Article>> {
    input.validate()?;
    let id = new_id();
    let now = now();
    let document_json = serde_json::to_string(&input.document)?;

    let (_, allocation) = slugs::write_with_retry(
        conn,
        SlugScope::Article,
        input.slug_candidate(),
        None,
        retries,
        |a| {
            conn.execute(
                "INSERT INTO articles (id, title, slug, category_id, document, thumbnail_url, published, author_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                params![
                    id,
                    input.title.trim(),
                    a.slug,
                    input.category_id,
                    document_json,
                    input.thumbnail_url,
                    input.published,
                    author_id,
                    now
                ],
            )
        },
    )?;

    tracing::info!(article = %id, slug = %allocation.slug, adjusted = allocation.adjusted, "article created");
    let article = get(conn, &id)?.ok_or_else(|| PortalError::not_found("Article"))?;
    Ok(Saved {
        record: article,
        slug_adjusted: allocation.adjusted,
    })
}

/// Replace an article. The slug is regenerated when an explicit slug is given
/// or the title changed; otherwise it is kept.
pub fn update(
    conn: &Connection,
    id: &str,
    input: &ArticleInput,
    retries: u32,
) -> Result<Saved<Article>> {
    input.validate()?;
    let existing = get(conn, id)?.ok_or_else(|| PortalError::not_found("Article"))?;
    let document_json = serde_json::to_string(&input.document)?;
    let now = now();

    let regenerate = input.slug.as_deref().is_some_and(|s| !s.trim().is_empty())
        || input.title.trim() != existing.title;
    let candidate = if regenerate {
        input.slug_candidate()
    } else {
        existing.slug.as_str()
    };

    let (_, allocation) =
        slugs::write_with_retry(conn, SlugScope::Article, candidate, Some(id), retries, |a| {
            conn.execute(
                "UPDATE articles SET title = ?1, slug = ?2, category_id = ?3, document = ?4,
                 thumbnail_url = ?5, published = ?6, updated_at = ?7 WHERE id = ?8",
                params![
                    input.title.trim(),
                    a.slug,
                    input.category_id,
                    document_json,
                    input.thumbnail_url,
                    input.published,
                    now,
                    id
                ],
            )
        })?;

    let article = get(conn, id)?.ok_or_else(|| PortalError::not_found("Article"))?;
    Ok(Saved {
        record: article,
        slug_adjusted: allocation.adjusted,
    })
}

/// Store only the body, as saved from an editing session.
pub fn update_document(conn: &Connection, id: &str, document: &Document) -> Result<()> {
    let changed = conn.execute(
        "UPDATE articles SET document = ?1, updated_at = ?2 WHERE id = ?3",
        params![serde_json::to_string(document)?, now(), id],
    )?;
    ensure_changed(changed, "Article")
}

pub fn get(conn: &Connection, id: &str) -> Result<Option<Article>> {
    let sql = format!("SELECT {COLUMNS} FROM articles WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], from_row).optional()?)
}

pub fn get_by_slug(conn: &Connection, slug: &str, published_only: bool) -> Result<Option<Article>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM articles WHERE slug = ?1 AND (?2 = 0 OR published = 1)"
    );
    Ok(conn
        .query_row(&sql, params![slug, published_only], from_row)
        .optional()?)
}

/// Newest first. `category_id` narrows to one category.
pub fn list(
    conn: &Connection,
    page: u32,
    published_only: bool,
    category_id: Option<&str>,
) -> Result<Page<Article>> {
    let (page, limit, offset) = page_window(page);
    let filter = "(?1 = 0 OR published = 1) AND (?2 IS NULL OR category_id = ?2)";

    let total: i64 = conn.query_row(
        &format!("SELECT count(*) FROM articles WHERE {filter}"),
        params![published_only, category_id],
        |row| row.get(0),
    )?;

    let sql = format!(
        "SELECT {COLUMNS} FROM articles WHERE {filter} ORDER BY created_at DESC, id LIMIT ?3 OFFSET ?4"
    );
    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map(params![published_only, category_id, limit, offset], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Page {
        items,
        page,
        per_page: limit as u32,
        total: total as u64,
    })
}

/// Delete and return the removed article so its media can be cleaned up.
pub fn delete(conn: &Connection, id: &str) -> Result<Article> {
    let article = get(conn, id)?.ok_or_else(|| PortalError::not_found("Article"))?;
    conn.execute("DELETE FROM articles WHERE id = ?1", [id])?;
    Ok(article)
}
