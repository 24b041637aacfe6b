//! Prometheus exposition for the service counters.

use crate::utils::error::{Error, Result};
use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub const HTTP_REQUESTS: &str = "http_requests_total";
pub const HTTP_ERRORS: &str = "http_errors_total";
pub const FLOOR_ACTIVATIONS: &str = "allocation_floor_activations_total";
pub const COMPUTE_MS: &str = "allocation_compute_ms";

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the global Prometheus recorder. Later calls are no-ops.
///
/// Metrics emitted before this runs are dropped.
pub fn init() -> Result<()> {
    if PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::Other(format!("failed to install metrics recorder: {}", e)))?;
    if PROM_HANDLE.set(handle).is_ok() {
        describe_counter!(HTTP_REQUESTS, "Requests served, by endpoint");
        describe_counter!(HTTP_ERRORS, "Requests that ended in an error response, by endpoint");
        describe_counter!(FLOOR_ACTIVATIONS, "Protocols lifted to the diversification floor");
        describe_histogram!(COMPUTE_MS, Unit::Milliseconds, "Time to compute one recommendation");
    }
    Ok(())
}

/// Text exposition of all metrics; empty when [`init`] never ran.
pub fn render() -> String {
    PROM_HANDLE.get().map(|h| h.render()).unwrap_or_default()
}
