//! HTTP surface: `GET /courses` (Atom feed) and `GET /ruok`.
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use sqlx::Connection;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::config::{self, Config};
use crate::db;
use crate::error::RequestError;
use crate::feed::{self, conditional::Preconditions};

#[derive(Debug, Clone)]
pub struct AppState {
    pub db_path: Option<Arc<str>>,
    pub feed: Arc<config::Feed>,
}

impl AppState {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            db_path: cfg.db_path().map(Arc::from),
            feed: Arc::new(cfg.feed.clone()),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/courses", get(courses))
        .route("/ruok", get(ruok))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(cfg: &Config) -> anyhow::Result<()> {
    let state = AppState::from_config(cfg);
    if state.db_path.is_none() {
        tracing::warn!("DB_PATH is not set; /courses will answer 500");
    }
    let listener = tokio::net::TcpListener::bind(&cfg.server.bind).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(?err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

/// Newest courses as Atom, honoring `If-None-Match` and `If-Modified-Since`.
#[instrument(skip_all)]
async fn courses(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, RequestError> {
    let pre = Preconditions::from_headers(&headers);
    let db_path = state.db_path.as_deref().ok_or(RequestError::MissingDbPath)?;

    let mut conn = db::open_reader(db_path).await?;
    let rows = db::recent_courses(&mut conn, pre.cutoff(), feed::FEED_LIMIT).await?;
    conn.close().await?;

    feed::respond(&state.feed, &pre, &rows, Utc::now())
}

async fn ruok() -> &'static str {
    "imok"
}
