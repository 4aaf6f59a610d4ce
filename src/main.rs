//! Fleet Quote Backend
//!
//! REST backend for the fleet maintenance desk: supplier quotes sent over WhatsApp,
//! report records with a protocol workflow, and role-based access. SQLite persistence
//! and Tantivy full-text search.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod message;
mod models;
mod query;
mod roles;
mod search;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use message::TextGenerator;
use search::SearchIndex;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub search: Arc<SearchIndex>,
    pub textgen: Arc<TextGenerator>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Fleet Quote Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    match (&config.admin_email, &config.admin_password) {
        (Some(email), Some(password)) => {
            repo.ensure_admin(&email.trim().to_lowercase(), password)
                .await?;
        }
        _ => tracing::warn!(
            "FLEETQUOTE_ADMIN_EMAIL/FLEETQUOTE_ADMIN_PASSWORD not set; no bootstrap administrator"
        ),
    }

    // Initialize search index
    let search = Arc::new(SearchIndex::open(&config.index_path)?);

    tracing::info!("Building search index...");
    let reports = repo.list_reports().await?;
    search.rebuild(&reports).await?;

    let textgen = TextGenerator::new(config.textgen.clone())?;
    if !textgen.is_configured() {
        tracing::warn!(
            "No text generation key configured (FLEETQUOTE_TEXTGEN_API_KEY). \
             Observations use the local template"
        );
    }

    let state = AppState {
        repo,
        search,
        textgen: Arc::new(textgen),
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected_routes = Router::new()
        // Session
        .route("/auth/logout", post(api::logout))
        .route("/auth/me", get(api::me))
        // Dashboard
        .route("/dashboard", get(api::get_dashboard))
        // Quotes
        .route("/quotes", get(api::list_quotes))
        .route("/quotes", post(api::create_quote))
        .route("/quotes/compose", post(api::compose_quote))
        .route("/quotes/{id}", get(api::get_quote))
        .route("/quotes/{id}", put(api::update_quote))
        .route("/quotes/{id}", delete(api::delete_quote))
        .route("/quotes/{id}/message", get(api::quote_message))
        // Reports
        .route("/reports", get(api::list_reports))
        .route("/reports", post(api::create_report))
        .route("/reports/grouped", get(api::grouped_reports))
        .route("/reports/{id}", get(api::get_report))
        .route("/reports/{id}", put(api::update_report))
        .route("/reports/{id}", delete(api::delete_report))
        .route("/reports/{id}/delivery", put(api::set_delivery_status))
        // Protocol
        .route("/protocol/pending", get(api::pending_protocol))
        .route("/protocol/confirm", post(api::confirm_protocol))
        // Report list items
        .route("/report-items", get(api::list_report_items))
        .route("/report-items", post(api::create_report_item))
        .route("/report-items/options", get(api::list_options))
        .route("/report-items/{id}", put(api::update_report_item))
        .route("/report-items/{id}", delete(api::delete_report_item))
        // Suppliers
        .route("/suppliers", get(api::list_suppliers))
        .route("/suppliers", post(api::create_supplier))
        .route("/suppliers/{id}", get(api::get_supplier))
        .route("/suppliers/{id}", put(api::update_supplier))
        .route("/suppliers/{id}", delete(api::delete_supplier))
        // Settings and users
        .route("/settings", get(api::get_settings))
        .route("/settings/branding", put(api::update_branding))
        .route("/users", get(api::list_users))
        .route("/users", post(api::create_user))
        .route("/users/{email}", put(api::update_user))
        .route("/users/{email}", delete(api::delete_user))
        // Snapshot
        .route("/snapshot", get(api::get_snapshot))
        .route("/snapshot", put(api::replace_snapshot))
        .route("/snapshot/revision", get(api::get_revision))
        // Search
        .route("/search", get(api::search_reports))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::session_auth_layer,
        ));

    // Reachable before login
    let public_routes = Router::new()
        .route("/auth/login", post(api::login))
        .route("/branding", get(api::get_branding));

    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
