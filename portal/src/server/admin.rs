//! Dashboard CRUD. Every path here is gated by the route table.

use super::{discard_assets, unreferenced};
use crate::auth::{Principal, Role};
use crate::editor::AssetId;
use crate::error::{PortalError, Result};
use crate::media::UploadedAsset;
use crate::models::*;
use crate::state::AppState;
use crate::store::{self, content};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/articles", get(list_articles).post(create_article))
        .route(
            "/admin/articles/:id",
            get(get_article).put(update_article).delete(delete_article),
        )
        .route(
            "/admin/categories",
            get(list_categories).post(create_category),
        )
        .route(
            "/admin/categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/admin/banners", get(list_banners).post(create_banner))
        .route(
            "/admin/banners/:id",
            get(get_banner).put(update_banner).delete(delete_banner),
        )
        .route("/admin/teams", get(list_teams).post(create_team))
        .route(
            "/admin/teams/:id",
            get(get_team).put(update_team).delete(delete_team),
        )
        .route("/admin/employees", get(list_employees).post(create_employee))
        .route(
            "/admin/employees/:id",
            get(get_employee).put(update_employee).delete(delete_employee),
        )
        .route("/admin/faqs", get(list_faqs).post(create_faq))
        .route(
            "/admin/faqs/:id",
            get(get_faq).put(update_faq).delete(delete_faq),
        )
        .route("/admin/videos", get(list_videos).post(create_video))
        .route(
            "/admin/videos/:id",
            get(get_video).put(update_video).delete(delete_video),
        )
        .route("/admin/links", get(list_links).post(create_link))
        .route(
            "/admin/links/:id",
            get(get_link).put(update_link).delete(delete_link),
        )
        .route("/admin/profile", get(get_profile).put(put_profile))
        .route("/admin/jumbotron", get(get_jumbotron).put(put_jumbotron))
        .route("/admin/media", get(list_media).post(upload_media))
        .route("/admin/media/:id", axum::routing::delete(delete_media))
        .route("/admin/users", get(list_users).post(create_user))
        .route("/admin/users/:id", get(get_user).delete(delete_user))
        .route("/admin/users/:id/role", axum::routing::put(update_user_role))
}

fn found<T>(value: Option<T>, what: &str) -> Result<Json<T>> {
    value.map(Json).ok_or_else(|| PortalError::not_found(what))
}

// Articles

#[derive(Debug, Default, Deserialize)]
struct ArticleQuery {
    page: Option<u32>,
    category_id: Option<String>,
}

async fn list_articles(
    State(state): State<AppState>,
    Query(q): Query<ArticleQuery>,
) -> Result<Json<Page<Article>>> {
    let db = state.db()?;
    Ok(Json(store::articles::list(
        &db.conn,
        q.page.unwrap_or(1),
        false,
        q.category_id.as_deref(),
    )?))
}

async fn create_article(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(input): Json<ArticleInput>,
) -> Result<(StatusCode, Json<Saved<Article>>)> {
    let db = state.db()?;
    let saved = store::articles::create(
        &db.conn,
        &input,
        Some(&principal.user_id),
        state.config.slug.write_retries,
    )?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn get_article(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Article>> {
    let db = state.db()?;
    found(store::articles::get(&db.conn, &id)?, "Article")
}

async fn update_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ArticleInput>,
) -> Result<Json<Saved<Article>>> {
    let db = state.db()?;
    let saved =
        store::articles::update(&db.conn, &id, &input, state.config.slug.write_retries)?;
    Ok(Json(saved))
}

async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let article = {
        let db = state.db()?;
        store::articles::delete(&db.conn, &id)?
    };
    let orphaned = unreferenced(&state, article.document.asset_ids())?;
    let removed = discard_assets(&state, orphaned).await;
    tracing::info!(article = %id, assets = removed, "article deleted");
    Ok(StatusCode::NO_CONTENT)
}

// Categories

async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let db = state.db()?;
    Ok(Json(store::categories::list(&db.conn)?))
}

async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Saved<Category>>)> {
    let db = state.db()?;
    let saved = store::categories::create(&db.conn, &input, state.config.slug.write_retries)?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Category>> {
    let db = state.db()?;
    found(store::categories::get(&db.conn, &id)?, "Category")
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Saved<Category>>> {
    let db = state.db()?;
    let saved =
        store::categories::update(&db.conn, &id, &input, state.config.slug.write_retries)?;
    Ok(Json(saved))
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let db = state.db()?;
    store::categories::delete(&db.conn, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

// Banners

async fn list_banners(State(state): State<AppState>) -> Result<Json<Vec<Banner>>> {
    let db = state.db()?;
    Ok(Json(content::list_banners(&db.conn)?))
}

async fn create_banner(
    State(state): State<AppState>,
    Json(input): Json<BannerInput>,
) -> Result<(StatusCode, Json<Banner>)> {
    let db = state.db()?;
    Ok((StatusCode::CREATED, Json(content::create_banner(&db.conn, &input)?)))
}

async fn get_banner(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Banner>> {
    let db = state.db()?;
    found(content::get_banner(&db.conn, &id)?, "Banner")
}

async fn update_banner(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<BannerInput>,
) -> Result<Json<Banner>> {
    let (banner, replaced) = {
        let db = state.db()?;
        let previous = content::get_banner(&db.conn, &id)?.and_then(|b| b.asset_id);
        let banner = content::update_banner(&db.conn, &id, &input)?;
        let replaced = previous.filter(|old| banner.asset_id.as_deref() != Some(old.as_str()));
        (banner, replaced)
    };
    let orphaned = unreferenced(&state, replaced.map(AssetId))?;
    discard_assets(&state, orphaned).await;
    Ok(Json(banner))
}

async fn delete_banner(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let banner = {
        let db = state.db()?;
        content::delete_banner(&db.conn, &id)?
    };
    let orphaned = unreferenced(&state, banner.asset_id.map(AssetId))?;
    discard_assets(&state, orphaned).await;
    Ok(StatusCode::NO_CONTENT)
}

// Teams and employees

async fn list_teams(State(state): State<AppState>) -> Result<Json<Vec<Team>>> {
    let db = state.db()?;
    Ok(Json(content::list_teams(&db.conn)?))
}

async fn create_team(
    State(state): State<AppState>,
    Json(input): Json<TeamInput>,
) -> Result<(StatusCode, Json<Team>)> {
    let db = state.db()?;
    Ok((StatusCode::CREATED, Json(content::create_team(&db.conn, &input)?)))
}

async fn get_team(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Team>> {
    let db = state.db()?;
    found(content::get_team(&db.conn, &id)?, "Team")
}

async fn update_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<TeamInput>,
) -> Result<Json<Team>> {
    let db = state.db()?;
    Ok(Json(content::update_team(&db.conn, &id, &input)?))
}

async fn delete_team(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    let db = state.db()?;
    content::delete_team(&db.conn, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_employees(State(state): State<AppState>) -> Result<Json<Vec<Employee>>> {
    let db = state.db()?;
    Ok(Json(content::list_employees(&db.conn)?))
}

async fn create_employee(
    State(state): State<AppState>,
    Json(input): Json<EmployeeInput>,
) -> Result<(StatusCode, Json<Employee>)> {
    let db = state.db()?;
    Ok((StatusCode::CREATED, Json(content::create_employee(&db.conn, &input)?)))
}

async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Employee>> {
    let db = state.db()?;
    found(content::get_employee(&db.conn, &id)?, "Employee")
}

async fn update_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<EmployeeInput>,
) -> Result<Json<Employee>> {
    let db = state.db()?;
    Ok(Json(content::update_employee(&db.conn, &id, &input)?))
}

async fn delete_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let db = state.db()?;
    content::delete_employee(&db.conn, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

// FAQs, videos, links

async fn list_faqs(State(state): State<AppState>) -> Result<Json<Vec<Faq>>> {
    let db = state.db()?;
    Ok(Json(content::list_faqs(&db.conn)?))
}

async fn create_faq(
    State(state): State<AppState>,
    Json(input): Json<FaqInput>,
) -> Result<(StatusCode, Json<Faq>)> {
    let db = state.db()?;
    Ok((StatusCode::CREATED, Json(content::create_faq(&db.conn, &input)?)))
}

async fn get_faq(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Faq>> {
    let db = state.db()?;
    found(content::get_faq(&db.conn, &id)?, "FAQ")
}

async fn update_faq(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<FaqInput>,
) -> Result<Json<Faq>> {
    let db = state.db()?;
    Ok(Json(content::update_faq(&db.conn, &id, &input)?))
}

async fn delete_faq(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    let db = state.db()?;
    content::delete_faq(&db.conn, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_videos(State(state): State<AppState>) -> Result<Json<Vec<Video>>> {
    let db = state.db()?;
    Ok(Json(content::list_videos(&db.conn)?))
}

async fn create_video(
    State(state): State<AppState>,
    Json(input): Json<VideoInput>,
) -> Result<(StatusCode, Json<Video>)> {
    let db = state.db()?;
    Ok((StatusCode::CREATED, Json(content::create_video(&db.conn, &input)?)))
}

async fn get_video(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Video>> {
    let db = state.db()?;
    found(content::get_video(&db.conn, &id)?, "Video")
}

async fn update_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<VideoInput>,
) -> Result<Json<Video>> {
    let db = state.db()?;
    Ok(Json(content::update_video(&db.conn, &id, &input)?))
}

async fn delete_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let db = state.db()?;
    content::delete_video(&db.conn, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_links(State(state): State<AppState>) -> Result<Json<Vec<Link>>> {
    let db = state.db()?;
    Ok(Json(content::list_links(&db.conn)?))
}

async fn create_link(
    State(state): State<AppState>,
    Json(input): Json<LinkInput>,
) -> Result<(StatusCode, Json<Link>)> {
    let db = state.db()?;
    Ok((StatusCode::CREATED, Json(content::create_link(&db.conn, &input)?)))
}

async fn get_link(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Link>> {
    let db = state.db()?;
    found(content::get_link(&db.conn, &id)?, "Link")
}

async fn update_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<LinkInput>,
) -> Result<Json<Link>> {
    let db = state.db()?;
    Ok(Json(content::update_link(&db.conn, &id, &input)?))
}

async fn delete_link(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    let db = state.db()?;
    content::delete_link(&db.conn, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

// Profile and jumbotron

async fn get_profile(State(state): State<AppState>) -> Result<Json<Profile>> {
    let db = state.db()?;
    Ok(Json(store::site::profile(&db.conn)?))
}

async fn put_profile(
    State(state): State<AppState>,
    Json(input): Json<Profile>,
) -> Result<Json<Profile>> {
    let db = state.db()?;
    Ok(Json(store::site::put_profile(&db.conn, &input)?))
}

async fn get_jumbotron(State(state): State<AppState>) -> Result<Json<Jumbotron>> {
    let db = state.db()?;
    Ok(Json(store::site::jumbotron(&db.conn)?))
}

async fn put_jumbotron(
    State(state): State<AppState>,
    Json(input): Json<Jumbotron>,
) -> Result<Json<Jumbotron>> {
    let (saved, replaced) = {
        let db = state.db()?;
        store::site::put_jumbotron(&db.conn, &input)?
    };
    let orphaned = unreferenced(&state, replaced.map(AssetId))?;
    discard_assets(&state, orphaned).await;
    Ok(Json(saved))
}

// Media library

#[derive(Debug, Deserialize)]
struct UploadQuery {
    filename: String,
    #[serde(default = "default_folder")]
    folder: String,
}

fn default_folder() -> String {
    "uploads".to_string()
}

#[derive(Debug, Default, Deserialize)]
struct FolderQuery {
    folder: Option<String>,
}

async fn list_media(
    State(state): State<AppState>,
    Query(q): Query<FolderQuery>,
) -> Result<Json<Vec<Asset>>> {
    let db = state.db()?;
    Ok(Json(store::assets::list(&db.conn, q.folder.as_deref())?))
}

async fn upload_media(
    State(state): State<AppState>,
    Query(q): Query<UploadQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadedAsset>)> {
    let asset = state
        .media
        .upload(body.to_vec(), &q.filename, &q.folder)
        .await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

async fn delete_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.media.delete(&AssetId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Users

#[derive(Debug, Deserialize)]
struct RoleChange {
    role: Role,
}

async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>> {
    let db = state.db()?;
    Ok(Json(store::users::list(&db.conn)?))
}

async fn create_user(
    State(state): State<AppState>,
    Json(input): Json<NewUser>,
) -> Result<(StatusCode, Json<User>)> {
    let db = state.db()?;
    Ok((StatusCode::CREATED, Json(store::users::create(&db.conn, &input)?)))
}

async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<User>> {
    let db = state.db()?;
    found(store::users::get(&db.conn, &id)?, "User")
}

async fn update_user_role(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(change): Json<RoleChange>,
) -> Result<Json<User>> {
    if id == principal.user_id && change.role != Role::Admin {
        return Err(PortalError::Conflict(
            "you cannot remove your own admin role".into(),
        ));
    }
    let db = state.db()?;
    Ok(Json(store::users::update_role(&db.conn, &id, change.role)?))
}

async fn delete_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if id == principal.user_id {
        return Err(PortalError::Conflict(
            "you cannot delete your own account".into(),
        ));
    }
    let db = state.db()?;
    store::users::delete(&db.conn, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
