//! HTTP boundary: a small axum service around one shared [`RecipeExtractor`].
//!
//! | Route | Response |
//! |-------|----------|
//! | `POST /api/scrape_recipy` `{"url": …}` | 200 record, 400 missing URL, 500 extraction error |
//! | `GET /health` | 200 `{"status": "healthy", "version": …}` |
//!
//! Every origin is allowed (permissive CORS).

use crate::error::ExtractionError;
use crate::extract::RecipeExtractor;
use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Request body for the scrape endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ScrapeRequest {
    #[serde(default)]
    pub url: Option<String>,
}

/// Build the router. All requests share `extractor` (one cache, one pool).
pub fn router(extractor: Arc<RecipeExtractor>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/scrape_recipy", post(scrape))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(extractor)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, extractor: Arc<RecipeExtractor>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(extractor)).await
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn scrape(State(extractor): State<Arc<RecipeExtractor>>, body: Bytes) -> Response {
    // Bodies that are not JSON objects are treated like a missing URL.
    let request: ScrapeRequest = serde_json::from_slice(&body).unwrap_or_default();
    let url = match request.url.as_deref().map(str::trim) {
        Some(u) if !u.is_empty() => u.to_string(),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "URL is required" })),
            )
                .into_response();
        }
    };

    match extractor.extract(&url).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => error_response(&e),
    }
}

fn error_response(e: &ExtractionError) -> Response {
    error!("scrape failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": e.to_string(),
            "category": e.category(),
        })),
    )
        .into_response()
}
