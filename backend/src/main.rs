use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use duet::{AppState, Config, RoomRegistry, get_db_pool, handlers, realtime, utils};
use tower_http::cors::{Any, CorsLayer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_logging();

    let config = Config::from_env()?;
    let db_config = duet::db::DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;

    // Run migrations
    duet::db::migrations::run_migrations(&pool).await?;

    let port = config.port;
    let app = create_router(AppState {
        pool,
        config,
        rooms: Arc::new(RoomRegistry::new()),
    });

    let listener = tokio::net::TcpListener::bind(&format!("0.0.0.0:{}", port)).await?;
    tracing::info!("Server running on port {}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn create_router(state: AppState) -> Router {
    let cors_layer = create_cors_layer();

    Router::new()
        .route("/health", get(health_check))
        // Pairing service
        .route("/bind", post(handlers::pairing::bind))
        .route("/requests", get(handlers::pairing::pending_requests))
        .route("/accept", post(handlers::pairing::accept))
        .route("/reject", post(handlers::pairing::reject))
        .route("/relation", get(handlers::pairing::relation))
        .route("/validate", post(handlers::pairing::validate))
        .route("/unbind", post(handlers::pairing::unbind))
        // Shared events
        .route(
            "/events",
            get(handlers::events::list_events).post(handlers::events::create_event),
        )
        .route(
            "/events/{id}",
            put(handlers::events::update_event).delete(handlers::events::delete_event),
        )
        // Realtime relay
        .route("/ws", get(realtime::ws::couple_ws))
        .layer(cors_layer)
        .with_state(state)
}

fn create_cors_layer() -> CorsLayer {
    let mut cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .allow_credentials(false);

    // Check if ALLOWED_ORIGINS environment variable is set for multiple domains
    if let Ok(cors_origins) = std::env::var("ALLOWED_ORIGINS") {
        let origins: Vec<HeaderValue> = cors_origins
            .split(',')
            .filter_map(|origin| {
                let trimmed = origin.trim();
                if !trimmed.is_empty() {
                    trimmed.parse().ok()
                } else {
                    None
                }
            })
            .collect();

        if !origins.is_empty() {
            cors = cors.allow_origin(origins);
        } else {
            // Fallback to permissive if parsing fails
            cors = cors.allow_origin(Any);
        }
    } else {
        // Default to permissive for development
        cors = cors.allow_origin(Any);
    }

    cors
}

async fn health_check() -> &'static str {
    "OK"
}
