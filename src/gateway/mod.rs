//! Liveness Gateway
//!
//! Minimal HTTP endpoint so hosting platforms can tell the bot is up.

use crate::config::GatewayConfig;
use anyhow::{Context, Result};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;

pub const ROOT_RESPONSE: &str = "Voice changer bot is running";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
    })
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(|| async { ROOT_RESPONSE }))
        .route("/health", get(health))
}

/// Bind the configured address and serve until the task is dropped.
pub async fn serve(config: &GatewayConfig) -> Result<()> {
    let addr = config.address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind liveness endpoint to {}", addr))?;
    serve_on(listener).await
}

pub async fn serve_on(listener: TcpListener) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Liveness endpoint listening on http://{}", addr);
    }
    axum::serve(listener, router())
        .await
        .context("Liveness endpoint stopped")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn spawn() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_on(listener));
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_root_returns_fixed_text() {
        let base = spawn().await;
        let response = reqwest::get(&base).await.unwrap();
        assert!(response.status().is_success());
        assert_eq!(response.text().await.unwrap(), ROOT_RESPONSE);
    }

    #[tokio::test]
    async fn test_health_reports_version() {
        let base = spawn().await;
        let body: serde_json::Value = reqwest::get(format!("{}/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], crate::VERSION);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let base = spawn().await;
        let response = reqwest::get(format!("{}/nope", base)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    }
}
