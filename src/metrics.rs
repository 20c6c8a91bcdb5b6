//! Collection metrics
//!
//! Counters for API traffic, retries and collected entities. Recording is
//! always cheap: without an installed recorder the `metrics` macros are
//! no-ops, so the Prometheus exporter is only started when the operator asks
//! for it (`--metrics-addr`).

use metrics::{counter, describe_counter, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Metrics setup errors
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Exporter could not be installed or bound
    #[error("failed to install Prometheus exporter: {0}")]
    Install(String),
}

/// Start the Prometheus scrape endpoint on `addr`.
///
/// Idempotent: later calls are ignored.
pub fn init_metrics(addr: SocketAddr) -> Result<(), MetricsError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        METRICS_INITIALIZED.store(false, Ordering::SeqCst);
        return Err(MetricsError::Install(e.to_string()));
    }

    describe_counter!(
        "api_requests_total",
        Unit::Count,
        "Research API requests by endpoint and outcome"
    );
    describe_counter!(
        "api_retries_total",
        Unit::Count,
        "Retry attempts by retry policy"
    );
    describe_counter!(
        "entities_collected_total",
        Unit::Count,
        "Entities added to results by kind"
    );
    describe_counter!(
        "lookup_errors_total",
        Unit::Count,
        "Per-entity lookups that ended in an error marker"
    );

    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Count one API request. `status` is the API error code, or
/// `transport_error` / `parse_error` when no envelope was decoded.
pub fn record_api_request(endpoint: &str, status: &str) {
    counter!(
        "api_requests_total",
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
}

/// Count one retry under the named policy
pub fn record_retry(policy: &str) {
    counter!("api_retries_total", "policy" => policy.to_string()).increment(1);
}

/// Count entities accepted into the results
pub fn record_entities(kind: &str, count: usize) {
    counter!("entities_collected_total", "kind" => kind.to_string()).increment(count as u64);
}

/// Count an entity lookup that produced an error marker
pub fn record_lookup_error(kind: &str) {
    counter!("lookup_errors_total", "kind" => kind.to_string()).increment(1);
}
