//! Legacy topics HTTP API
//!
//! Serves the markdown library and the content database over the endpoints that
//! [`HttpStore`](crate::store::HttpStore) and
//! [`HttpMarkdownSource`](crate::markdown::HttpMarkdownSource) consume.

use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::markdown::LocalMarkdownSource;
use crate::resolve::AliasTable;
use crate::store::SqlStore;

pub mod error;
pub mod health;
pub mod questions;
pub mod topics;

pub use error::{ApiError, ApiResult};
pub use health::health_routes;
pub use questions::question_routes;
pub use topics::topic_routes;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: SqlStore,
    pub markdown: LocalMarkdownSource,
    pub aliases: AliasTable,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(store: SqlStore, markdown: LocalMarkdownSource, aliases: AliasTable) -> Self {
        Self {
            store,
            markdown: markdown.with_aliases(aliases.clone()),
            aliases,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(topic_routes())
        .merge(question_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
