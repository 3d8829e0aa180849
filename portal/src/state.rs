use crate::auth::RouteTable;
use crate::captcha::{CaptchaVerifier, DisabledCaptcha, HttpCaptchaVerifier};
use crate::comments::{CommentHost, HttpCommentHost};
use crate::config::Config;
use crate::database::{Database, SharedDb};
use crate::editor::EditorSession;
use crate::error::Result;
use crate::media::{LocalMediaHost, MediaHost};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// An open editing session in the dashboard.
#[derive(Debug)]
pub struct Draft {
    pub session: EditorSession,
    /// Article the document is saved back to, if any.
    pub article_id: Option<String>,
    pub owner_id: String,
}

pub type Drafts = Arc<Mutex<HashMap<Uuid, Draft>>>;

#[derive(Clone)]
pub struct AppState {
    pub db: SharedDb,
    pub config: Arc<Config>,
    pub routes: Arc<RouteTable>,
    pub media: Arc<dyn MediaHost>,
    pub comments: Option<Arc<dyn CommentHost>>,
    pub captcha: Arc<dyn CaptchaVerifier>,
    pub drafts: Drafts,
}

impl AppState {
    /// Wire the configured collaborators around an open database.
    pub fn new(config: Config, database: Database) -> Self {
        let db: SharedDb = Arc::new(Mutex::new(database));
        let media: Arc<dyn MediaHost> = Arc::new(LocalMediaHost::new(&config.media, db.clone()));
        let comments = config
            .comments
            .clone()
            .map(|c| Arc::new(HttpCommentHost::new(c)) as Arc<dyn CommentHost>);
        let captcha: Arc<dyn CaptchaVerifier> = match config.captcha.clone() {
            Some(c) => Arc::new(HttpCaptchaVerifier::new(c)),
            None => {
                tracing::warn!("no [captcha] section, logins are not CAPTCHA-checked");
                Arc::new(DisabledCaptcha)
            }
        };

        AppState {
            db,
            config: Arc::new(config),
            routes: Arc::new(RouteTable::portal()),
            media,
            comments,
            captcha,
            drafts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_media(mut self, media: Arc<dyn MediaHost>) -> Self {
        self.media = media;
        self
    }

    pub fn with_comments(mut self, comments: Arc<dyn CommentHost>) -> Self {
        self.comments = Some(comments);
        self
    }

    pub fn with_captcha(mut self, captcha: Arc<dyn CaptchaVerifier>) -> Self {
        self.captcha = captcha;
        self
    }

    pub fn db(&self) -> Result<MutexGuard<'_, Database>> {
        Ok(self.db.lock()?)
    }

    pub fn drafts(&self) -> Result<MutexGuard<'_, HashMap<Uuid, Draft>>> {
        Ok(self.drafts.lock()?)
    }
}
