//! Role-based route gating.
//!
//! Access rules are a plain ordered table of `(pattern, roles)` evaluated on
//! every request before any handler runs. The first matching pattern decides;
//! paths that match nothing are public.

use crate::error::{PortalError, Result};
use crate::state::AppState;
use crate::store;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const SESSION_COOKIE: &str = "portal_session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Editor,
    User,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Editor, Role::User];

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Editor => "EDITOR",
            Role::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "EDITOR" => Ok(Role::Editor),
            "USER" => Ok(Role::User),
            other => Err(PortalError::validation(format!("unknown role {other:?}"))),
        }
    }
}

/// `/exact/path` or `/prefix/*` (the prefix itself included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePattern {
    Exact(String),
    Prefix(String),
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix("/*") {
            Some(prefix) => RoutePattern::Prefix(prefix.to_string()),
            None => RoutePattern::Exact(pattern.to_string()),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        match self {
            RoutePattern::Exact(p) => path == p,
            RoutePattern::Prefix(p) => {
                path == p
                    || path
                        .strip_prefix(p.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteRule {
    pub pattern: RoutePattern,
    pub allowed: Vec<Role>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No rule covers the path.
    Public,
    Allow,
    Unauthenticated,
    Forbidden,
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, pattern: &str, allowed: &[Role]) -> Self {
        self.rules.push(RouteRule {
            pattern: RoutePattern::parse(pattern),
            allowed: allowed.to_vec(),
        });
        self
    }

    /// The dashboard's access rules: user management for admins, the rest of
    /// the dashboard for admins and editors, account pages for anyone signed in.
    pub fn portal() -> Self {
        RouteTable::new()
            .rule("/admin/users/*", &[Role::Admin])
            .rule("/admin/*", &[Role::Admin, Role::Editor])
            .rule("/account/*", &Role::ALL)
    }

    pub fn lookup(&self, path: &str) -> Option<&RouteRule> {
        self.rules.iter().find(|r| r.pattern.matches(path))
    }

    pub fn authorize(&self, path: &str, role: Option<Role>) -> Decision {
        let Some(rule) = self.lookup(path) else {
            return Decision::Public;
        };
        match role {
            None => Decision::Unauthenticated,
            Some(role) if rule.allowed.contains(&role) => Decision::Allow,
            Some(_) => Decision::Forbidden,
        }
    }
}

/// The signed-in user, attached to the request by [`guard`].
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Session token from `Authorization: Bearer …` or the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        if let Some(token) = value.to_str().ok().and_then(|v| v.strip_prefix("Bearer ")) {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn resolve_principal(state: &AppState, headers: &HeaderMap) -> Result<Option<Principal>> {
    let Some(token) = session_token(headers) else {
        return Ok(None);
    };
    let db = state.db()?;
    store::users::principal_for_token(&db.conn, &token)
}

/// Middleware applying the route table before any handler runs.
pub async fn guard(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let principal = resolve_principal(&state, req.headers())?;
    let path = req.uri().path().to_string();

    match state.routes.authorize(&path, principal.as_ref().map(|p| p.role)) {
        Decision::Public | Decision::Allow => {}
        Decision::Unauthenticated => {
            tracing::debug!(%path, "rejected anonymous request");
            return Err(PortalError::Unauthorized("sign in required".into()));
        }
        Decision::Forbidden => {
            tracing::warn!(
                %path,
                user = principal.as_ref().map(|p| p.user_id.as_str()).unwrap_or_default(),
                "role not allowed"
            );
            return Err(PortalError::Forbidden(
                "your role may not access this page".into(),
            ));
        }
    }

    if let Some(principal) = principal {
        req.extensions_mut().insert(principal);
    }
    Ok(next.run(req).await)
}
