use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::handler::FormRelayHandler;

async fn submit(
    State(handler): State<Arc<FormRelayHandler>>,
    method: Method,
    body: Bytes,
) -> Response {
    // Preflight never looks at the body.
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    let span = info_span!("submission", request_id = %Uuid::new_v4());
    match handler.handle_logged(&method, &body).instrument(span).await {
        Ok(()) => Json(json!({ "ok": true })).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

/// The relay endpoint at `path` plus a liveness probe.
pub fn router(handler: Arc<FormRelayHandler>, path: &str) -> Router {
    let relay_routes = Router::new()
        .route(path, any(submit))
        .layer(middleware::map_response(cors_headers))
        .with_state(handler);

    Router::new()
        .route("/healthz", get(healthz))
        .merge(relay_routes)
}

/// Resolves once `signal` fires. If the listener cannot be installed the
/// server keeps running instead of shutting down straight away.
async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Serve until Ctrl-C.
pub async fn serve(listener: TcpListener, app: Router) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_on(tokio::signal::ctrl_c()))
        .await
        .context("Server error")
}
