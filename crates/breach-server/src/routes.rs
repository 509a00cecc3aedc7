//! HTTP routes for the lookup server
//!
//! Authentication, verification codes and rate limiting live in front of
//! this service; these routes only expose the engine.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::error::{Result, ServerError};
use crate::state::{EngineStats, LookupResponse, SharedState};

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub engine: EngineStats,
}

/// Lookup request
#[derive(Deserialize)]
pub struct LookupRequest {
    pub email: String,
}

#[derive(Clone)]
struct AppState {
    service: SharedState,
    prometheus: Option<PrometheusHandle>,
}

/// Health check endpoint
async fn health(State(app): State<AppState>) -> Json<HealthResponse> {
    let stats = app.service.stats();
    let status = if app.service.aggregator().limiter().is_closed() {
        "stopping"
    } else {
        "ready"
    };

    Json(HealthResponse {
        status: status.to_string(),
        engine: stats,
    })
}

/// Look up one email across all sources
async fn lookup(
    State(app): State<AppState>,
    body: std::result::Result<Json<LookupRequest>, JsonRejection>,
) -> Result<Json<LookupResponse>> {
    let Json(req) = body.map_err(|rejection| ServerError::InvalidQuery(rejection.body_text()))?;
    let response = app.service.lookup(&req.email).await?;
    Ok(Json(response))
}

/// Prometheus exposition
async fn metrics(State(app): State<AppState>) -> Response {
    match &app.prometheus {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// CORS restricted to the given origins; `None` when no origin is valid
pub fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::AUTHORIZATION]),
    )
}

/// Create the router with all routes
pub fn create_router(
    service: SharedState,
    prometheus: Option<PrometheusHandle>,
    allowed_origins: &[String],
) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/lookup", post(lookup))
        .route("/metrics", get(metrics))
        .with_state(AppState {
            service,
            prometheus,
        });

    match cors_layer(allowed_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}
