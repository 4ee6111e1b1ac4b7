use crate::logging;
use crate::state::AppState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, TextEncoder};

pub fn build_http_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(middleware::from_fn_with_state(
            state.logger.clone(),
            logging::request_logging,
        ))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

/// Gather the registry on a blocking thread; collectors drive their own
/// async work from there.
async fn metrics(State(state): State<AppState>) -> Response {
    let registry = state.registry.clone();
    let gathered = tokio::task::spawn_blocking(move || {
        let families = registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer).map(|()| buffer)
    })
    .await;

    match gathered {
        Ok(Ok(body)) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Metrics collection task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to collect metrics").into_response()
        }
    }
}
