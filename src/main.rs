//! Drink Menu Backend
//!
//! REST backend for the drink menu with SQLite persistence and JWT-scoped write access.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;

use std::sync::Arc;

use axum::{
    http::{header, Method},
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::{permissions, AuthGate, PermissionGuard};
use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub gate: Arc<AuthGate>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Drink Menu Backend");
    tracing::info!("Database: {}", config.database_url);
    tracing::info!("Token issuer: {}", config.issuer());
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.database_url).await?;
    if config.reset_database {
        tracing::warn!("DRINKS_RESET_DB is set, dropping all drinks");
        db::reset_database(&pool).await?;
    }
    let repo = Arc::new(Repository::new(pool));

    let gate = Arc::new(AuthGate::from_config(&config));

    // Create application state
    let state = AppState { repo, gate };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::PUT,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let gate = state.gate.clone();
    let guard = |permission: &'static str| {
        middleware::from_fn_with_state(
            PermissionGuard::new(gate.clone(), permission),
            auth::require_permission,
        )
    };

    Router::new()
        // Public
        .route("/drinks", get(api::list_drinks))
        // Permission-scoped
        .route(
            "/drinks-detail",
            get(api::list_drinks_detail).route_layer(guard(permissions::GET_DRINKS_DETAIL)),
        )
        .route(
            "/drinks",
            post(api::create_drink).route_layer(guard(permissions::POST_DRINKS)),
        )
        .route(
            "/drinks/{id}",
            patch(api::update_drink).route_layer(guard(permissions::PATCH_DRINKS)),
        )
        .route(
            "/drinks/{id}",
            delete(api::delete_drink).route_layer(guard(permissions::DELETE_DRINKS)),
        )
        .fallback(errors::not_found_fallback)
        .method_not_allowed_fallback(errors::method_not_allowed_fallback)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
