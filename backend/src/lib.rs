pub mod auth;
pub mod client;
pub mod constants;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod realtime;
pub mod utils;

use std::sync::Arc;

use axum::extract::FromRef;

pub use db::connection::get_db_pool;
pub use error::{ApiError, ApiResult};
pub use realtime::RoomRegistry;
pub use utils::config::Config;

// Re-export common types
pub use anyhow::Result;
pub use chrono::{DateTime, Utc};
pub use sqlx::PgPool;
pub use uuid::Uuid;

/// Shared application state, constructed once at startup; handlers pull out
/// the pieces they need via `FromRef`.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub rooms: Arc<RoomRegistry>,
}
