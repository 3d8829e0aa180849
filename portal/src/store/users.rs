use super::{ensure_changed, new_id, now};
use crate::auth::{Principal, Role};
use crate::error::{PortalError, Result};
use crate::models::{NewUser, User};
use crate::security;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};

fn from_row(row: &Row) -> rusqlite::Result<User> {
    let role: String = row.get(3)?;
    let role = role
        .parse::<Role>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role,
        created_at: row.get(4)?,
    })
}

pub fn create(conn: &Connection, input: &NewUser) -> Result<User> {
    input.validate()?;
    let email = input.email.trim().to_lowercase();
    if find_by_email(conn, &email)?.is_some() {
        return Err(PortalError::Conflict(format!(
            "a user with email {email} already exists"
        )));
    }
    let id = new_id();
    let hash = security::hash_password(&input.password)?;
    conn.execute(
        "INSERT INTO users (id, name, email, password_hash, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, input.name.trim(), email, hash, input.role.as_str(), now()],
    )?;
    tracing::info!(user = %id, role = %input.role, "user created");
    get(conn, &id)?.ok_or_else(|| PortalError::not_found("User"))
}

pub fn get(conn: &Connection, id: &str) -> Result<Option<User>> {
    Ok(conn
        .query_row(
            "SELECT id, name, email, role, created_at FROM users WHERE id = ?1",
            [id],
            from_row,
        )
        .optional()?)
}

pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    Ok(conn
        .query_row(
            "SELECT id, name, email, role, created_at FROM users WHERE email = ?1",
            [email.trim().to_lowercase()],
            from_row,
        )
        .optional()?)
}

pub fn list(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt =
        conn.prepare("SELECT id, name, email, role, created_at FROM users ORDER BY name")?;
    let rows = stmt.query_map([], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn update_role(conn: &Connection, id: &str, role: Role) -> Result<User> {
    let changed = conn.execute(
        "UPDATE users SET role = ?1 WHERE id = ?2",
        params![role.as_str(), id],
    )?;
    ensure_changed(changed, "User")?;
    get(conn, id)?.ok_or_else(|| PortalError::not_found("User"))
}

pub fn delete(conn: &Connection, id: &str) -> Result<()> {
    let changed = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
    ensure_changed(changed, "User")
}

/// Check credentials. Unknown email and wrong password look the same.
pub fn authenticate(conn: &Connection, email: &str, password: &str) -> Result<User> {
    let found: Option<(String, String)> = conn
        .query_row(
            "SELECT id, password_hash FROM users WHERE email = ?1",
            [email.trim().to_lowercase()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let rejected = || PortalError::Unauthorized("invalid email or password".into());
    let (id, hash) = found.ok_or_else(rejected)?;
    if !security::verify_password(password, &hash)? {
        return Err(rejected());
    }
    get(conn, &id)?.ok_or_else(rejected)
}

/// Open a session and return the bearer token. Only its digest is stored.
pub fn create_session(conn: &Connection, user_id: &str, ttl_hours: i64) -> Result<String> {
    let token = security::generate_session_token();
    let created = Utc::now();
    let expires = created + Duration::hours(ttl_hours);
    conn.execute(
        "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            security::token_digest(&token),
            user_id,
            created.to_rfc3339(),
            expires.to_rfc3339()
        ],
    )?;
    Ok(token)
}

pub fn revoke_session(conn: &Connection, token: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM sessions WHERE token_hash = ?1",
        [security::token_digest(token)],
    )?;
    Ok(())
}

pub fn purge_expired_sessions(conn: &Connection) -> Result<usize> {
    let mut stmt = conn.prepare("SELECT token_hash, expires_at FROM sessions")?;
    let expired: Vec<String> = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?
        .into_iter()
        .filter(|(_, expires_at)| is_expired(expires_at))
        .map(|(hash, _)| hash)
        .collect();
    for hash in &expired {
        conn.execute("DELETE FROM sessions WHERE token_hash = ?1", [hash])?;
    }
    Ok(expired.len())
}

fn is_expired(expires_at: &str) -> bool {
    DateTime::parse_from_rfc3339(expires_at)
        .map(|t| t.with_timezone(&Utc) <= Utc::now())
        .unwrap_or(true)
}

/// The user behind a live session token.
pub fn principal_for_token(conn: &Connection, token: &str) -> Result<Option<Principal>> {
    let found: Option<(String, String)> = conn
        .query_row(
            "SELECT user_id, expires_at FROM sessions WHERE token_hash = ?1",
            [security::token_digest(token)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((user_id, expires_at)) = found else {
        return Ok(None);
    };
    if is_expired(&expires_at) {
        revoke_session(conn, token)?;
        return Ok(None);
    }
    Ok(get(conn, &user_id)?.map(|user| Principal {
        user_id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    fn editor() -> NewUser {
        NewUser {
            name: "Dewi".into(),
            email: "Dewi@Kantor.go.id".into(),
            password: "kata-sandi-kuat".into(),
            role: Role::Editor,
        }
    }

    #[test]
    fn emails_are_unique_and_case_folded() {
        let db = Database::open_in_memory().unwrap();
        let user = create(&db.conn, &editor()).unwrap();
        assert_eq!(user.email, "dewi@kantor.go.id");
        assert_eq!(user.role, Role::Editor);
        assert!(matches!(
            create(&db.conn, &editor()),
            Err(PortalError::Conflict(_))
        ));
    }

    #[test]
    fn authenticate_checks_password() {
        let db = Database::open_in_memory().unwrap();
        create(&db.conn, &editor()).unwrap();
        assert!(authenticate(&db.conn, "dewi@kantor.go.id", "kata-sandi-kuat").is_ok());
        assert!(matches!(
            authenticate(&db.conn, "dewi@kantor.go.id", "salah"),
            Err(PortalError::Unauthorized(_))
        ));
        assert!(matches!(
            authenticate(&db.conn, "siapa@kantor.go.id", "kata-sandi-kuat"),
            Err(PortalError::Unauthorized(_))
        ));
    }

    #[test]
    fn sessions_resolve_and_revoke() {
        let db = Database::open_in_memory().unwrap();
        let user = create(&db.conn, &editor()).unwrap();
        let token = create_session(&db.conn, &user.id, 1).unwrap();

        let principal = principal_for_token(&db.conn, &token).unwrap().unwrap();
        assert_eq!(principal.user_id, user.id);
        assert_eq!(principal.role, Role::Editor);

        revoke_session(&db.conn, &token).unwrap();
        assert!(principal_for_token(&db.conn, &token).unwrap().is_none());
    }

    #[test]
    fn expired_sessions_are_ignored_and_purged() {
        let db = Database::open_in_memory().unwrap();
        let user = create(&db.conn, &editor()).unwrap();
        let stale = create_session(&db.conn, &user.id, -1).unwrap();
        let live = create_session(&db.conn, &user.id, 1).unwrap();

        assert_eq!(purge_expired_sessions(&db.conn).unwrap(), 1);
        assert!(principal_for_token(&db.conn, &stale).unwrap().is_none());
        assert!(principal_for_token(&db.conn, &live).unwrap().is_some());
    }

    #[test]
    fn deleting_user_ends_sessions() {
        let db = Database::open_in_memory().unwrap();
        let user = create(&db.conn, &editor()).unwrap();
        let token = create_session(&db.conn, &user.id, 1).unwrap();
        delete(&db.conn, &user.id).unwrap();
        assert!(principal_for_token(&db.conn, &token).unwrap().is_none());
    }
}
