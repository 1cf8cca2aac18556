use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use docflow_api::config::AppConfig;
use docflow_api::handlers::{auth, categories, documents};
use docflow_api::middleware::require_auth;
use docflow_api::{db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DB_* and JWT_SECRET
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();
    config.warn_on_dev_defaults();

    let pool = db::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    db::ensure_schema(&pool)
        .await
        .context("failed to create tables")?;

    let state = AppState::new(pool, &config);
    let app = app(state, &config);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("docflow API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server")?;
    Ok(())
}

fn app(state: AppState, config: &AppConfig) -> Router {
    Router::new()
        // Public
        .route("/health", get(health))
        .merge(auth_routes())
        // Protected
        .merge(api_routes(state.clone(), config))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
}

fn api_routes(state: AppState, config: &AppConfig) -> Router<AppState> {
    Router::new()
        .route("/documents", get(documents::list).post(documents::create))
        .route(
            "/documents/:id",
            get(documents::get)
                .put(documents::update)
                .delete(documents::delete),
        )
        .route("/documents/:id/download", get(documents::download))
        .route("/categories", get(categories::list).post(categories::create))
        .route(
            "/categories/:id",
            get(categories::get)
                .put(categories::update)
                .delete(categories::delete),
        )
        .layer(middleware::from_fn_with_state(state, require_auth))
        .layer(DefaultBodyLimit::max(config.storage.max_upload_bytes))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
