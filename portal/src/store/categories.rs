use super::{ensure_changed, new_id, now, slugs};
use crate::error::{PortalError, Result};
use crate::models::{Category, CategoryInput, Saved};
use crate::slug::SlugScope;
use rusqlite::{params, Connection, OptionalExtension, Row};

fn from_row(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub fn create(conn: &Connection, input: &CategoryInput, retries: u32) -> Result<Saved<Category>> {
    input.validate()?;
    let id = new_id();
    let now = now();
    let (_, allocation) = slugs::write_with_retry(
        conn,
        SlugScope::Category,
        input.slug_candidate(),
        None,
        retries,
        |a| {
            conn.execute(
                "INSERT INTO categories (id, name, slug, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![id, input.name.trim(), a.slug, now],
            )
        },
    )?;
    let category = get(conn, &id)?.ok_or_else(|| PortalError::not_found("Category"))?;
    Ok(Saved {
        record: category,
        slug_adjusted: allocation.adjusted,
    })
}

pub fn update(
    conn: &Connection,
    id: &str,
    input: &CategoryInput,
    retries: u32,
) -> Result<Saved<Category>> {
    input.validate()?;
    let existing = get(conn, id)?.ok_or_else(|| PortalError::not_found("Category"))?;
    let regenerate = input.slug.as_deref().is_some_and(|s| !s.trim().is_empty())
        || input.name.trim() != existing.name;
    let candidate = if regenerate {
        input.slug_candidate()
    } else {
        existing.slug.as_str()
    };

    let (_, allocation) =
        slugs::write_with_retry(conn, SlugScope::Category, candidate, Some(id), retries, |a| {
            conn.execute(
                "UPDATE categories SET name = ?1, slug = ?2 WHERE id = ?3",
                params![input.name.trim(), a.slug, id],
            )
        })?;
    let category = get(conn, id)?.ok_or_else(|| PortalError::not_found("Category"))?;
    Ok(Saved {
        record: category,
        slug_adjusted: allocation.adjusted,
    })
}

pub fn get(conn: &Connection, id: &str) -> Result<Option<Category>> {
    Ok(conn
        .query_row(
            "SELECT id, name, slug, created_at FROM categories WHERE id = ?1",
            [id],
            from_row,
        )
        .optional()?)
}

pub fn get_by_slug(conn: &Connection, slug: &str) -> Result<Option<Category>> {
    Ok(conn
        .query_row(
            "SELECT id, name, slug, created_at FROM categories WHERE slug = ?1",
            [slug],
            from_row,
        )
        .optional()?)
}

pub fn list(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, name, slug, created_at FROM categories ORDER BY name")?;
    let rows = stmt.query_map([], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Articles in the category keep existing and lose their category.
pub fn delete(conn: &Connection, id: &str) -> Result<()> {
    let changed = conn.execute("DELETE FROM categories WHERE id = ?1", [id])?;
    ensure_changed(changed, "Category")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::models::ArticleInput;
    use crate::store::articles;

    fn input(name: &str) -> CategoryInput {
        CategoryInput {
            name: name.to_string(),
            slug: None,
        }
    }

    #[test]
    fn slug_follows_name_and_stays_unique() {
        let db = Database::open_in_memory().unwrap();
        let a = create(&db.conn, &input("Pengumuman Penting!!"), 1).unwrap();
        assert_eq!(a.record.slug, "pengumuman-penting");

        let b = create(&db.conn, &input("Pengumuman  penting"), 1).unwrap();
        assert_eq!(b.record.slug, "pengumuman-penting-2");
        assert!(b.slug_adjusted);
    }

    #[test]
    fn explicit_slug_is_normalized() {
        let db = Database::open_in_memory().unwrap();
        let saved = create(
            &db.conn,
            &CategoryInput {
                name: "Kegiatan".into(),
                slug: Some("Kegiatan Kantor".into()),
            },
            1,
        )
        .unwrap();
        assert_eq!(saved.record.slug, "kegiatan-kantor");
    }

    #[test]
    fn deleting_category_detaches_articles() {
        let db = Database::open_in_memory().unwrap();
        let cat = create(&db.conn, &input("Berita"), 1).unwrap().record;
        let article = articles::create(
            &db.conn,
            &ArticleInput {
                title: "Judul".into(),
                category_id: Some(cat.id.clone()),
                ..Default::default()
            },
            None,
            1,
        )
        .unwrap()
        .record;

        delete(&db.conn, &cat.id).unwrap();
        let article = articles::get(&db.conn, &article.id).unwrap().unwrap();
        assert_eq!(article.category_id, None);
        assert!(matches!(delete(&db.conn, &cat.id), Err(PortalError::NotFound(_))));
    }

    #[test]
    fn rename_regenerates_slug() {
        let db = Database::open_in_memory().unwrap();
        let cat = create(&db.conn, &input("Agenda"), 1).unwrap().record;
        let renamed = update(&db.conn, &cat.id, &input("Agenda Kerja"), 1).unwrap();
        assert_eq!(renamed.record.slug, "agenda-kerja");
        assert_eq!(list(&db.conn).unwrap().len(), 1);
    }
}
