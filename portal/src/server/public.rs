use crate::comments::CommentPage;
use crate::error::{PortalError, Result};
use crate::models::{
    Article, Banner, Category, Faq, Jumbotron, Link, Page, Profile, PublishedArticle,
    TeamWithMembers, Video,
};
use crate::state::AppState;
use crate::store;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/home", get(home))
        .route("/api/articles", get(list_articles))
        .route("/api/articles/:slug", get(get_article))
        .route("/api/articles/:slug/comments", get(article_comments))
        .route("/api/categories", get(list_categories))
        .route("/api/categories/:slug/articles", get(category_articles))
        .route("/api/banners", get(list_banners))
        .route("/api/teams", get(list_teams))
        .route("/api/faqs", get(list_faqs))
        .route("/api/videos", get(list_videos))
        .route("/api/links", get(list_links))
        .route("/api/profile", get(profile))
        .route("/api/jumbotron", get(jumbotron))
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    page: Option<u32>,
    /// Category slug.
    category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CommentQuery {
    cursor: Option<String>,
}

/// Everything the landing page renders in one request.
#[derive(Debug, Serialize)]
struct Home {
    jumbotron: Jumbotron,
    banners: Vec<Banner>,
    latest: Vec<PublishedArticle>,
    links: Vec<Link>,
}

fn published(page: Page<Article>) -> Page<PublishedArticle> {
    Page {
        items: page.items.into_iter().map(PublishedArticle::from).collect(),
        page: page.page,
        per_page: page.per_page,
        total: page.total,
    }
}

async fn home(State(state): State<AppState>) -> Result<Json<Home>> {
    let db = state.db()?;
    let latest = store::articles::list(&db.conn, 1, true, None)?;
    Ok(Json(Home {
        jumbotron: store::site::jumbotron(&db.conn)?,
        banners: store::content::list_banners(&db.conn)?,
        latest: published(latest).items,
        links: store::content::list_links(&db.conn)?,
    }))
}

async fn list_articles(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Page<PublishedArticle>>> {
    let db = state.db()?;
    let category_id = match q.category.as_deref() {
        Some(slug) => Some(
            store::categories::get_by_slug(&db.conn, slug)?
                .ok_or_else(|| PortalError::not_found("Category"))?
                .id,
        ),
        None => None,
    };
    let page = store::articles::list(
        &db.conn,
        q.page.unwrap_or(1),
        true,
        category_id.as_deref(),
    )?;
    Ok(Json(published(page)))
}

async fn get_article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PublishedArticle>> {
    let db = state.db()?;
    let article = store::articles::get_by_slug(&db.conn, &slug, true)?
        .ok_or_else(|| PortalError::not_found("Article"))?;
    Ok(Json(article.into()))
}

async fn article_comments(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(q): Query<CommentQuery>,
) -> Result<Json<CommentPage>> {
    let Some(host) = state.comments.clone() else {
        return Err(PortalError::not_found("Comments"));
    };
    let exists = {
        let db = state.db()?;
        store::articles::get_by_slug(&db.conn, &slug, true)?.is_some()
    };
    if !exists {
        return Err(PortalError::not_found("Article"));
    }
    let page = host.list(&slug, q.cursor.as_deref()).await?;
    Ok(Json(page))
}

async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let db = state.db()?;
    Ok(Json(store::categories::list(&db.conn)?))
}

async fn category_articles(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Page<PublishedArticle>>> {
    let db = state.db()?;
    let category = store::categories::get_by_slug(&db.conn, &slug)?
        .ok_or_else(|| PortalError::not_found("Category"))?;
    let page = store::articles::list(&db.conn, q.page.unwrap_or(1), true, Some(&category.id))?;
    Ok(Json(published(page)))
}

async fn list_banners(State(state): State<AppState>) -> Result<Json<Vec<Banner>>> {
    let db = state.db()?;
    Ok(Json(store::content::list_banners(&db.conn)?))
}

async fn list_teams(State(state): State<AppState>) -> Result<Json<Vec<TeamWithMembers>>> {
    let db = state.db()?;
    Ok(Json(store::content::list_teams_with_members(&db.conn)?))
}

async fn list_faqs(State(state): State<AppState>) -> Result<Json<Vec<Faq>>> {
    let db = state.db()?;
    Ok(Json(store::content::list_faqs(&db.conn)?))
}

async fn list_videos(State(state): State<AppState>) -> Result<Json<Vec<Video>>> {
    let db = state.db()?;
    Ok(Json(store::content::list_videos(&db.conn)?))
}

async fn list_links(State(state): State<AppState>) -> Result<Json<Vec<Link>>> {
    let db = state.db()?;
    Ok(Json(store::content::list_links(&db.conn)?))
}

async fn profile(State(state): State<AppState>) -> Result<Json<Profile>> {
    let db = state.db()?;
    Ok(Json(store::site::profile(&db.conn)?))
}

async fn jumbotron(State(state): State<AppState>) -> Result<Json<Jumbotron>> {
    let db = state.db()?;
    Ok(Json(store::site::jumbotron(&db.conn)?))
}
