use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
};
use tower_http::cors::CorsLayer;
use tracing::info;

use super::api::{self, AppState};

/// Configuration for the reference task store.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            allowed_origin: "http://localhost:3000".to_string(),
        }
    }
}

/// CORS policy letting the browser board at `origin` call the task API.
pub fn cors_layer(origin: &str) -> Result<CorsLayer> {
    let origin: HeaderValue = origin
        .parse()
        .with_context(|| format!("Invalid allowed origin '{}'", origin))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ]))
}

/// Build the full application router: task API behind the CORS policy.
pub fn build_router(state: Arc<AppState>, allowed_origin: &str) -> Result<Router> {
    Ok(api::api_router()
        .layer(cors_layer(allowed_origin)?)
        .with_state(state))
}

/// Start the reference task store and serve until Ctrl+C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let state = Arc::new(AppState::default());
    let app = build_router(state, &config.allowed_origin)?;

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(%local_addr, origin = %config.allowed_origin, "task store listening");
    println!("Task store running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    println!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    println!("\nShutting down...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_router() -> Router {
        build_router(Arc::new(AppState::default()), "http://localhost:3000").unwrap()
    }

    #[tokio::test]
    async fn test_health_via_full_router() {
        let app = test_router();
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_create_task_via_full_router() {
        let app = test_router();
        let req = Request::builder()
            .method("POST")
            .uri("/tasks")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({"title": "server-test"}).to_string(),
            ))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let task: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(task["title"], "server-test");
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_configured_origin() {
        let app = test_router();
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/tasks")
            .header("origin", "http://localhost:3000")
            .header("access-control-request-method", "PUT")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(
            resp.headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("http://localhost:3000")
        );
    }

    #[tokio::test]
    async fn test_cors_rejects_other_origin() {
        let app = test_router();
        let req = Request::builder()
            .uri("/tasks")
            .header("origin", "http://evil.example")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert!(resp.headers().get("access-control-allow-origin").is_none());
    }

    #[test]
    fn test_invalid_origin_is_error() {
        assert!(cors_layer("bad\norigin").is_err());
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.allowed_origin, "http://localhost:3000");
    }
}
