use crate::models::Asset;
use rusqlite::{params, Connection, OptionalExtension, Result, Row};

const COLUMNS: &str =
    "id, folder, file_path, original_name, mime_type, size_bytes, width, height, created_at";

fn from_row(row: &Row) -> Result<Asset> {
    Ok(Asset {
        id: row.get(0)?,
        folder: row.get(1)?,
        file_path: row.get(2)?,
        original_name: row.get(3)?,
        mime_type: row.get(4)?,
        size_bytes: row.get(5)?,
        width: row.get(6)?,
        height: row.get(7)?,
        created_at: row.get(8)?,
    })
}

pub fn insert(conn: &Connection, asset: &Asset) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO assets ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        params![
            asset.id,
            asset.folder,
            asset.file_path,
            asset.original_name,
            asset.mime_type,
            asset.size_bytes,
            asset.width,
            asset.height,
            asset.created_at
        ],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, id: &str) -> Result<Option<Asset>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM assets WHERE id = ?1"),
        [id],
        from_row,
    )
    .optional()
}

pub fn delete(conn: &Connection, id: &str) -> Result<usize> {
    conn.execute("DELETE FROM assets WHERE id = ?1", [id])
}

/// Newest first, optionally for one folder.
pub fn list(conn: &Connection, folder: Option<&str>) -> Result<Vec<Asset>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM assets WHERE (?1 IS NULL OR folder = ?1) ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map([folder], from_row)?;
    rows.collect()
}

/// Whether any saved record still points at the asset.
pub fn in_use(conn: &Connection, id: &str) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM articles WHERE instr(document, ?1) > 0)
             OR EXISTS(SELECT 1 FROM banners WHERE asset_id = ?1)
             OR EXISTS(SELECT 1 FROM jumbotron WHERE asset_id = ?1)",
        [id],
        |row| row.get(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    fn asset(id: &str, folder: &str) -> Asset {
        Asset {
            id: id.into(),
            folder: folder.into(),
            file_path: format!("{folder}/{id}.png"),
            original_name: "foto".into(),
            mime_type: "image/png".into(),
            size_bytes: 10,
            width: 2,
            height: 2,
            created_at: crate::store::now(),
        }
    }

    #[test]
    fn insert_list_delete() {
        let db = Database::open_in_memory().unwrap();
        insert(&db.conn, &asset("a", "articles")).unwrap();
        insert(&db.conn, &asset("b", "banners")).unwrap();

        assert_eq!(list(&db.conn, None).unwrap().len(), 2);
        assert_eq!(list(&db.conn, Some("banners")).unwrap()[0].id, "b");
        assert_eq!(get(&db.conn, "a").unwrap().unwrap().width, 2);

        assert_eq!(delete(&db.conn, "a").unwrap(), 1);
        assert!(get(&db.conn, "a").unwrap().is_none());
    }

    #[test]
    fn in_use_sees_banners_and_article_bodies() {
        let db = Database::open_in_memory().unwrap();
        assert!(!in_use(&db.conn, "a1").unwrap());

        db.conn
            .execute(
                "INSERT INTO banners (id, title, image_url, asset_id, position, created_at)
                 VALUES ('b', 'Banner', '/asset/a1', 'a1', 0, '')",
                [],
            )
            .unwrap();
        assert!(in_use(&db.conn, "a1").unwrap());

        db.conn
            .execute(
                "INSERT INTO articles (id, title, slug, document, published, created_at, updated_at)
                 VALUES ('x', 'Berita', 'berita', '{\"nodes\":[{\"asset_id\":\"a2\"}]}', 0, '', '')",
                [],
            )
            .unwrap();
        assert!(in_use(&db.conn, "a2").unwrap());
        assert!(!in_use(&db.conn, "a3").unwrap());
    }
}
