mod batch;
mod compose;
mod config;
mod error;
mod pdf;
mod records;
mod routes;
mod state;
mod storage;
mod templates;
mod workbook;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "certgen=info,tower_http=info".into()),
        )
        .init();

    let config = Arc::new(config::Config::from_env()?);
    if !config.default_template.exists() {
        tracing::warn!(
            "Default template {} not found; every request must upload one",
            config.default_template.display()
        );
    }

    let state = Arc::new(state::AppState {
        config: config.clone(),
        fonts: pdf::FontSet::resolve(config.font_family.as_deref()),
    });

    let app = Router::new()
        .route("/", get(routes::index))
        .route("/generate", post(routes::generate))
        .route("/api/inspect", post(routes::inspect_workbook))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Certificate generator listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
