//! Banners, teams, employees, FAQs, videos and links.

use super::{ensure_changed, new_id, now};
use crate::error::{PortalError, Result};
use crate::models::{
    Banner, BannerInput, Employee, EmployeeInput, Faq, FaqInput, Link, LinkInput, Team, TeamInput,
    TeamWithMembers, Video, VideoInput,
};
use rusqlite::{params, Connection, OptionalExtension, Params, Row};

fn collect<T>(
    conn: &Connection,
    sql: &str,
    params: impl Params,
    map: fn(&Row) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn found<T>(record: Option<T>, what: &str) -> Result<T> {
    record.ok_or_else(|| PortalError::not_found(what))
}

// Banners

fn banner_row(row: &Row) -> rusqlite::Result<Banner> {
    Ok(Banner {
        id: row.get(0)?,
        title: row.get(1)?,
        image_url: row.get(2)?,
        asset_id: row.get(3)?,
        link_url: row.get(4)?,
        position: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const BANNER_COLUMNS: &str = "id, title, image_url, asset_id, link_url, position, created_at";

pub fn list_banners(conn: &Connection) -> Result<Vec<Banner>> {
    collect(
        conn,
        &format!("SELECT {BANNER_COLUMNS} FROM banners ORDER BY position, created_at"),
        [],
        banner_row,
    )
}

pub fn get_banner(conn: &Connection, id: &str) -> Result<Option<Banner>> {
    Ok(conn
        .query_row(
            &format!("SELECT {BANNER_COLUMNS} FROM banners WHERE id = ?1"),
            [id],
            banner_row,
        )
        .optional()?)
}

pub fn create_banner(conn: &Connection, input: &BannerInput) -> Result<Banner> {
    input.validate()?;
    let id = new_id();
    conn.execute(
        "INSERT INTO banners (id, title, image_url, asset_id, link_url, position, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            input.title.trim(),
            input.image_url,
            input.asset_id,
            input.link_url,
            input.position,
            now()
        ],
    )?;
    found(get_banner(conn, &id)?, "Banner")
}

pub fn update_banner(conn: &Connection, id: &str, input: &BannerInput) -> Result<Banner> {
    input.validate()?;
    let changed = conn.execute(
        "UPDATE banners SET title = ?1, image_url = ?2, asset_id = ?3, link_url = ?4, position = ?5
         WHERE id = ?6",
        params![
            input.title.trim(),
            input.image_url,
            input.asset_id,
            input.link_url,
            input.position,
            id
        ],
    )?;
    ensure_changed(changed, "Banner")?;
    found(get_banner(conn, id)?, "Banner")
}

/// Returns the removed banner so its image can be deleted from the host.
pub fn delete_banner(conn: &Connection, id: &str) -> Result<Banner> {
    let banner = found(get_banner(conn, id)?, "Banner")?;
    conn.execute("DELETE FROM banners WHERE id = ?1", [id])?;
    Ok(banner)
}

// Teams and employees

fn team_row(row: &Row) -> rusqlite::Result<Team> {
    Ok(Team {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        position: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn employee_row(row: &Row) -> rusqlite::Result<Employee> {
    Ok(Employee {
        id: row.get(0)?,
        team_id: row.get(1)?,
        name: row.get(2)?,
        job_title: row.get(3)?,
        photo_url: row.get(4)?,
        position: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const EMPLOYEE_COLUMNS: &str = "id, team_id, name, job_title, photo_url, position, created_at";

pub fn list_teams(conn: &Connection) -> Result<Vec<Team>> {
    collect(
        conn,
        "SELECT id, name, description, position, created_at FROM teams ORDER BY position, name",
        [],
        team_row,
    )
}

pub fn get_team(conn: &Connection, id: &str) -> Result<Option<Team>> {
    Ok(conn
        .query_row(
            "SELECT id, name, description, position, created_at FROM teams WHERE id = ?1",
            [id],
            team_row,
        )
        .optional()?)
}

/// Every team with its members, for the public team page.
pub fn list_teams_with_members(conn: &Connection) -> Result<Vec<TeamWithMembers>> {
    list_teams(conn)?
        .into_iter()
        .map(|team| {
            let employees = collect(
                conn,
                &format!(
                    "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE team_id = ?1 ORDER BY position, name"
                ),
                [&team.id],
                employee_row,
            )?;
            Ok(TeamWithMembers { team, employees })
        })
        .collect()
}

pub fn create_team(conn: &Connection, input: &TeamInput) -> Result<Team> {
    input.validate()?;
    let id = new_id();
    conn.execute(
        "INSERT INTO teams (id, name, description, position, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, input.name.trim(), input.description, input.position, now()],
    )?;
    found(get_team(conn, &id)?, "Team")
}

pub fn update_team(conn: &Connection, id: &str, input: &TeamInput) -> Result<Team> {
    input.validate()?;
    let changed = conn.execute(
        "UPDATE teams SET name = ?1, description = ?2, position = ?3 WHERE id = ?4",
        params![input.name.trim(), input.description, input.position, id],
    )?;
    ensure_changed(changed, "Team")?;
    found(get_team(conn, id)?, "Team")
}

pub fn delete_team(conn: &Connection, id: &str) -> Result<()> {
    let changed = conn.execute("DELETE FROM teams WHERE id = ?1", [id])?;
    ensure_changed(changed, "Team")
}

pub fn list_employees(conn: &Connection) -> Result<Vec<Employee>> {
    collect(
        conn,
        &format!("SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY position, name"),
        [],
        employee_row,
    )
}

pub fn get_employee(conn: &Connection, id: &str) -> Result<Option<Employee>> {
    Ok(conn
        .query_row(
            &format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?1"),
            [id],
            employee_row,
        )
        .optional()?)
}

fn check_team(conn: &Connection, team_id: Option<&str>) -> Result<()> {
    match team_id {
        Some(team_id) if get_team(conn, team_id)?.is_none() => Err(PortalError::validation(
            format!("team {team_id} does not exist"),
        )),
        _ => Ok(()),
    }
}

pub fn create_employee(conn: &Connection, input: &EmployeeInput) -> Result<Employee> {
    input.validate()?;
    check_team(conn, input.team_id.as_deref())?;
    let id = new_id();
    conn.execute(
        "INSERT INTO employees (id, team_id, name, job_title, photo_url, position, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            input.team_id,
            input.name.trim(),
            input.job_title.trim(),
            input.photo_url,
            input.position,
            now()
        ],
    )?;
    found(get_employee(conn, &id)?, "Employee")
}

pub fn update_employee(conn: &Connection, id: &str, input: &EmployeeInput) -> Result<Employee> {
    input.validate()?;
    check_team(conn, input.team_id.as_deref())?;
    let changed = conn.execute(
        "UPDATE employees SET team_id = ?1, name = ?2, job_title = ?3, photo_url = ?4, position = ?5
         WHERE id = ?6",
        params![
            input.team_id,
            input.name.trim(),
            input.job_title.trim(),
            input.photo_url,
            input.position,
            id
        ],
    )?;
    ensure_changed(changed, "Employee")?;
    found(get_employee(conn, id)?, "Employee")
}

pub fn delete_employee(conn: &Connection, id: &str) -> Result<()> {
    let changed = conn.execute("DELETE FROM employees WHERE id = ?1", [id])?;
    ensure_changed(changed, "Employee")
}

// FAQs

fn faq_row(row: &Row) -> rusqlite::Result<Faq> {
    Ok(Faq {
        id: row.get(0)?,
        question: row.get(1)?,
        answer: row.get(2)?,
        position: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub fn list_faqs(conn: &Connection) -> Result<Vec<Faq>> {
    collect(
        conn,
        "SELECT id, question, answer, position, created_at FROM faqs ORDER BY position, created_at",
        [],
        faq_row,
    )
}

pub fn get_faq(conn: &Connection, id: &str) -> Result<Option<Faq>> {
    Ok(conn
        .query_row(
            "SELECT id, question, answer, position, created_at FROM faqs WHERE id = ?1",
            [id],
            faq_row,
        )
        .optional()?)
}

pub fn create_faq(conn: &Connection, input: &FaqInput) -> Result<Faq> {
    input.validate()?;
    let id = new_id();
    conn.execute(
        "INSERT INTO faqs (id, question, answer, position, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, input.question.trim(), input.answer, input.position, now()],
    )?;
    found(get_faq(conn, &id)?, "FAQ")
}

pub fn update_faq(conn: &Connection, id: &str, input: &FaqInput) -> Result<Faq> {
    input.validate()?;
    let changed = conn.execute(
        "UPDATE faqs SET question = ?1, answer = ?2, position = ?3 WHERE id = ?4",
        params![input.question.trim(), input.answer, input.position, id],
    )?;
    ensure_changed(changed, "FAQ")?;
    found(get_faq(conn, id)?, "FAQ")
}

pub fn delete_faq(conn: &Connection, id: &str) -> Result<()> {
    let changed = conn.execute("DELETE FROM faqs WHERE id = ?1", [id])?;
    ensure_changed(changed, "FAQ")
}

// Videos

fn video_row(row: &Row) -> rusqlite::Result<Video> {
    Ok(Video {
        id: row.get(0)?,
        title: row.get(1)?,
        url: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub fn list_videos(conn: &Connection) -> Result<Vec<Video>> {
    collect(
        conn,
        "SELECT id, title, url, created_at FROM videos ORDER BY created_at DESC",
        [],
        video_row,
    )
}

pub fn get_video(conn: &Connection, id: &str) -> Result<Option<Video>> {
    Ok(conn
        .query_row(
            "SELECT id, title, url, created_at FROM videos WHERE id = ?1",
            [id],
            video_row,
        )
        .optional()?)
}

pub fn create_video(conn: &Connection, input: &VideoInput) -> Result<Video> {
    input.validate()?;
    let id = new_id();
    conn.execute(
        "INSERT INTO videos (id, title, url, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![id, input.title.trim(), input.url.trim(), now()],
    )?;
    found(get_video(conn, &id)?, "Video")
}

pub fn update_video(conn: &Connection, id: &str, input: &VideoInput) -> Result<Video> {
    input.validate()?;
    let changed = conn.execute(
        "UPDATE videos SET title = ?1, url = ?2 WHERE id = ?3",
        params![input.title.trim(), input.url.trim(), id],
    )?;
    ensure_changed(changed, "Video")?;
    found(get_video(conn, id)?, "Video")
}

pub fn delete_video(conn: &Connection, id: &str) -> Result<()> {
    let changed = conn.execute("DELETE FROM videos WHERE id = ?1", [id])?;
    ensure_changed(changed, "Video")
}

// Links

fn link_row(row: &Row) -> rusqlite::Result<Link> {
    Ok(Link {
        id: row.get(0)?,
        label: row.get(1)?,
        url: row.get(2)?,
        position: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub fn list_links(conn: &Connection) -> Result<Vec<Link>> {
    collect(
        conn,
        "SELECT id, label, url, position, created_at FROM links ORDER BY position, label",
        [],
        link_row,
    )
}

pub fn get_link(conn: &Connection, id: &str) -> Result<Option<Link>> {
    Ok(conn
        .query_row(
            "SELECT id, label, url, position, created_at FROM links WHERE id = ?1",
            [id],
            link_row,
        )
        .optional()?)
}

pub fn create_link(conn: &Connection, input: &LinkInput) -> Result<Link> {
    input.validate()?;
    let id = new_id();
    conn.execute(
        "INSERT INTO links (id, label, url, position, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, input.label.trim(), input.url.trim(), input.position, now()],
    )?;
    found(get_link(conn, &id)?, "Link")
}

pub fn update_link(conn: &Connection, id: &str, input: &LinkInput) -> Result<Link> {
    input.validate()?;
    let changed = conn.execute(
        "UPDATE links SET label = ?1, url = ?2, position = ?3 WHERE id = ?4",
        params![input.label.trim(), input.url.trim(), input.position, id],
    )?;
    ensure_changed(changed, "Link")?;
    found(get_link(conn, id)?, "Link")
}

pub fn delete_link(conn: &Connection, id: &str) -> Result<()> {
    let changed = conn.execute("DELETE FROM links WHERE id = ?1", [id])?;
    ensure_changed(changed, "Link")
}
