use crate::auth::Role;
use crate::editor::Document;
use crate::error::{PortalError, Result};
use serde::{Deserialize, Serialize};

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PortalError::validation(format!("{field} is required")));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub category_id: Option<String>,
    pub document: Document,
    pub thumbnail_url: Option<String>,
    pub published: bool,
    pub author_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleInput {
    pub title: String,
    /// Explicit slug candidate; derived from the title when absent.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub document: Document,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub published: bool,
}

impl ArticleInput {
    pub fn validate(&self) -> Result<()> {
        require("title", &self.title)?;
        self.document.validate().map_err(PortalError::Validation)
    }

    pub fn slug_candidate(&self) -> &str {
        match self.slug.as_deref() {
            Some(s) if !s.trim().is_empty() => s,
            _ => &self.title,
        }
    }
}

/// Write result carrying the slug notice for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct Saved<T> {
    #[serde(flatten)]
    pub record: T,
    pub slug_adjusted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishedArticle {
    #[serde(flatten)]
    pub article: Article,
    pub content_html: String,
}

impl From<Article> for PublishedArticle {
    fn from(article: Article) -> Self {
        let content_html = article.document.to_html();
        PublishedArticle {
            article,
            content_html,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

impl CategoryInput {
    pub fn validate(&self) -> Result<()> {
        require("name", &self.name)
    }

    pub fn slug_candidate(&self) -> &str {
        match self.slug.as_deref() {
            Some(s) if !s.trim().is_empty() => s,
            _ => &self.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Banner {
    pub id: String,
    pub title: String,
    pub image_url: String,
    pub asset_id: Option<String>,
    pub link_url: Option<String>,
    pub position: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BannerInput {
    pub title: String,
    pub image_url: String,
    #[serde(default)]
    pub asset_id: Option<String>,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub position: i64,
}

impl BannerInput {
    pub fn validate(&self) -> Result<()> {
        require("title", &self.title)?;
        require("image_url", &self.image_url)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub description: String,
    pub position: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub position: i64,
}

impl TeamInput {
    pub fn validate(&self) -> Result<()> {
        require("name", &self.name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamWithMembers {
    #[serde(flatten)]
    pub team: Team,
    pub employees: Vec<Employee>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub team_id: Option<String>,
    pub name: String,
    pub job_title: String,
    pub photo_url: Option<String>,
    pub position: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmployeeInput {
    #[serde(default)]
    pub team_id: Option<String>,
    pub name: String,
    pub job_title: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub position: i64,
}

impl EmployeeInput {
    pub fn validate(&self) -> Result<()> {
        require("name", &self.name)?;
        require("job_title", &self.job_title)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Faq {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub position: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaqInput {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub position: i64,
}

impl FaqInput {
    pub fn validate(&self) -> Result<()> {
        require("question", &self.question)?;
        require("answer", &self.answer)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub url: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoInput {
    pub title: String,
    pub url: String,
}

impl VideoInput {
    pub fn validate(&self) -> Result<()> {
        require("title", &self.title)?;
        require("url", &self.url)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: String,
    pub label: String,
    pub url: String,
    pub position: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkInput {
    pub label: String,
    pub url: String,
    #[serde(default)]
    pub position: i64,
}

impl LinkInput {
    pub fn validate(&self) -> Result<()> {
        require("label", &self.label)?;
        require("url", &self.url)
    }
}

/// Office profile page. A single row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub vision: String,
    #[serde(default)]
    pub mission: String,
    #[serde(default)]
    pub history: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Landing-page hero. A single row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Jumbotron {
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub subheadline: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub asset_id: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl NewUser {
    pub fn validate(&self) -> Result<()> {
        require("name", &self.name)?;
        require("email", &self.email)?;
        if !self.email.contains('@') {
            return Err(PortalError::validation("email is malformed"));
        }
        if self.password.chars().count() < 8 {
            return Err(PortalError::validation(
                "password must be at least 8 characters",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub folder: String,
    pub file_path: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub width: u32,
    pub height: u32,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}
