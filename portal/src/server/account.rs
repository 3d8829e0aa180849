use crate::auth::{self, Principal, SESSION_COOKIE};
use crate::error::{PortalError, Result};
use crate::models::User;
use crate::state::AppState;
use crate::store;
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/account/me", get(me))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
    #[serde(default)]
    captcha_token: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    user: User,
}

fn session_cookie(token: &str, max_age_secs: i64) -> HeaderValue {
    let cookie =
        format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_secs}");
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Result<Response> {
    if !state.captcha.verify(&req.captcha_token).await? {
        tracing::info!(email = %req.email, "login rejected by CAPTCHA");
        return Err(PortalError::Unauthorized("CAPTCHA check failed".into()));
    }

    let ttl_hours = state.config.auth.session_ttl_hours;
    let (user, token) = {
        let db = state.db()?;
        let user = store::users::authenticate(&db.conn, &req.email, &req.password)?;
        let token = store::users::create_session(&db.conn, &user.id, ttl_hours)?;
        (user, token)
    };
    tracing::info!(user = %user.id, role = %user.role, "signed in");

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie(&token, ttl_hours * 3600));
    Ok((StatusCode::OK, headers, Json(LoginResponse { token, user })).into_response())
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    if let Some(token) = auth::session_token(&headers) {
        let db = state.db()?;
        store::users::revoke_session(&db.conn, &token)?;
    }
    let mut out = HeaderMap::new();
    out.insert(header::SET_COOKIE, session_cookie("", 0));
    Ok((StatusCode::NO_CONTENT, out).into_response())
}

async fn me(Extension(principal): Extension<Principal>) -> Json<Principal> {
    Json(principal)
}
