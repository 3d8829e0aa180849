//! Single-row pages: the office profile and the landing-page jumbotron.

use super::now;
use crate::error::Result;
use crate::models::{Jumbotron, Profile};
use rusqlite::{params, Connection, OptionalExtension};

/// The stored profile, or an empty one before anything was saved.
pub fn profile(conn: &Connection) -> Result<Profile> {
    let found = conn
        .query_row(
            "SELECT vision, mission, history, address, phone, email, updated_at FROM profile WHERE id = 1",
            [],
            |row| {
                Ok(Profile {
                    vision: row.get(0)?,
                    mission: row.get(1)?,
                    history: row.get(2)?,
                    address: row.get(3)?,
                    phone: row.get(4)?,
                    email: row.get(5)?,
                    updated_at: row.get(6)?,
                })
            },
        )
        .optional()?;
    Ok(found.unwrap_or_default())
}

pub fn put_profile(conn: &Connection, input: &Profile) -> Result<Profile> {
    conn.execute(
        "INSERT INTO profile (id, vision, mission, history, address, phone, email, updated_at)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET vision = excluded.vision, mission = excluded.mission,
             history = excluded.history, address = excluded.address, phone = excluded.phone,
             email = excluded.email, updated_at = excluded.updated_at",
        params![
            input.vision,
            input.mission,
            input.history,
            input.address,
            input.phone,
            input.email,
            now()
        ],
    )?;
    profile(conn)
}

pub fn jumbotron(conn: &Connection) -> Result<Jumbotron> {
    let found = conn
        .query_row(
            "SELECT headline, subheadline, image_url, asset_id, updated_at FROM jumbotron WHERE id = 1",
            [],
            |row| {
                Ok(Jumbotron {
                    headline: row.get(0)?,
                    subheadline: row.get(1)?,
                    image_url: row.get(2)?,
                    asset_id: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(found.unwrap_or_default())
}

/// Save the jumbotron. Returns the saved value and the asset it replaced, if
/// the image changed.
pub fn put_jumbotron(conn: &Connection, input: &Jumbotron) -> Result<(Jumbotron, Option<String>)> {
    let previous = jumbotron(conn)?.asset_id;
    conn.execute(
        "INSERT INTO jumbotron (id, headline, subheadline, image_url, asset_id, updated_at)
         VALUES (1, ?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET headline = excluded.headline,
             subheadline = excluded.subheadline, image_url = excluded.image_url,
             asset_id = excluded.asset_id, updated_at = excluded.updated_at",
        params![
            input.headline,
            input.subheadline,
            input.image_url,
            input.asset_id,
            now()
        ],
    )?;
    let replaced = previous.filter(|old| input.asset_id.as_deref() != Some(old.as_str()));
    Ok((jumbotron(conn)?, replaced))
}
