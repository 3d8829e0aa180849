pub mod auth;
pub mod captcha;
pub mod comments;
pub mod config;
pub mod database;
pub mod editor;
pub mod error;
pub mod media;
pub mod models;
pub mod security;
pub mod server;
pub mod slug;
pub mod state;
pub mod store;

use anyhow::Context;
use config::Config;
use database::Database;
use models::{NewUser, User};
use state::AppState;
use std::time::Duration;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Drop expired sessions once an hour.
fn spawn_session_sweeper(state: AppState) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            let purged = state
                .db()
                .and_then(|db| store::users::purge_expired_sessions(&db.conn));
            match purged {
                Ok(0) => {}
                Ok(n) => tracing::info!(purged = n, "expired sessions removed"),
                Err(e) => tracing::warn!("session sweep failed: {e}"),
            }
        }
    });
}

/// Open the database, start the HTTP server and run until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let database = Database::open(&config.database.path).with_context(|| {
        format!(
            "failed to open database at {}",
            config.database.path.display()
        )
    })?;
    tokio::fs::create_dir_all(&config.media.root)
        .await
        .with_context(|| format!("failed to create {}", config.media.root.display()))?;

    let bind = config.server.bind.clone();
    let state = AppState::new(config, database);
    spawn_session_sweeper(state.clone());

    let (addr, server) = server::start_server(state, &bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!("listening on http://{addr}");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
        joined = server => joined.context("server task panicked")?,
    }
    Ok(())
}

/// Add an account from the command line, e.g. the first admin.
pub fn create_user(config: &Config, input: &NewUser) -> anyhow::Result<User> {
    let database = Database::open(&config.database.path).with_context(|| {
        format!(
            "failed to open database at {}",
            config.database.path.display()
        )
    })?;
    Ok(store::users::create(&database.conn, input)?)
}
