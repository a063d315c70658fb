//! # Metrics
//!
//! Counters are recorded through the `metrics` facade and exported in
//! Prometheus text format at `GET /metrics`.
//!
//! | Metric                       | Labels    |
//! |------------------------------|-----------|
//! | `llp_access_verdicts_total`  | `verdict` |
//! | `llp_resolution_errors_total`| none      |

use std::sync::OnceLock;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use llp_engine::AccessVerdict;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// The process-wide recorder handle. The recorder can only be installed
/// once per process, so every router built afterwards shares it.
pub fn prometheus_handle() -> Option<PrometheusHandle> {
    static HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "failed to install Prometheus recorder; metrics disabled");
                None
            }
        })
        .clone()
}

pub fn record_verdict(verdict: &AccessVerdict) {
    metrics::counter!("llp_access_verdicts_total", "verdict" => verdict.label()).increment(1);
}

pub fn record_resolution_error() {
    metrics::counter!("llp_resolution_errors_total").increment(1);
}

/// GET /metrics
pub async fn render(Extension(handle): Extension<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        handle.render(),
    )
}
