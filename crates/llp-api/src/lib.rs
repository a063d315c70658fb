//! # llp-api: HTTP Layer for the Download Portal
//!
//! Wires the resolution engine to Axum.
//!
//! ## Routes
//!
//! - `/health/liveness`, `/health/readiness`: probes
//! - `/metrics`: Prometheus scrape endpoint (when enabled)
//! - `/license`, `/accept-license`: license display and acceptance
//! - `/api/ls/*`, `/api/license/*`: JSON API
//! - `/` and `/{*path}`: the license-gated file server
//!
//! ## Crate Policy
//!
//! - No license logic in handlers; they call `llp-engine` and map verdicts.
//! - All errors become structured JSON responses via [`AppError`].

pub mod config;
pub mod error;
pub mod extractors;
pub mod metrics;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

pub use config::AppConfig;
pub use error::AppError;
pub use state::{AppState, Backend};

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .merge(routes::license::router())
        .merge(routes::api::router())
        .merge(routes::files::router());

    if state.config.metrics_enabled {
        if let Some(handle) = metrics::prometheus_handle() {
            router = router
                .route("/metrics", get(metrics::render))
                .layer(Extension(handle));
        }
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

async fn liveness() -> &'static str {
    "ok"
}

/// Ready once the License store answers.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match state.store().count().await {
        Ok(_) => (StatusCode::OK, "ready").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "license store not ready");
            (StatusCode::SERVICE_UNAVAILABLE, "license store unavailable").into_response()
        }
    }
}
