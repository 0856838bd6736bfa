//! Prometheus metrics for the access key gate.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `accesskey_verdicts_total` - Gate verdicts (label: verdict)
//! - `accesskey_ip_resolutions_total` - IP resolution attempts (labels: source, outcome)
//!
//! Recording is a no-op until [`init_metrics`] installs an exporter, so the
//! gate can be used as a library without Prometheus.

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Metric names as constants for consistency.
pub mod names {
    pub const VERDICTS_TOTAL: &str = "accesskey_verdicts_total";
    pub const IP_RESOLUTIONS_TOTAL: &str = "accesskey_ip_resolutions_total";
}

/// Initialize the Prometheus metrics exporter on `metrics_addr`.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::VERDICTS_TOTAL,
        "Total number of access key gate verdicts"
    );
    describe_counter!(
        names::IP_RESOLUTIONS_TOTAL,
        "Total number of visitor IP resolution attempts per source"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Record one gate verdict.
#[inline]
pub fn record_verdict(verdict: &'static str) {
    counter!(names::VERDICTS_TOTAL, "verdict" => verdict).increment(1);
}

/// Record one IP resolution attempt.
#[inline]
pub fn record_ip_resolution(source: &'static str, outcome: &'static str) {
    counter!(
        names::IP_RESOLUTIONS_TOTAL,
        "source" => source,
        "outcome" => outcome
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_exporter_is_noop() {
        // Should not panic when no recorder is installed
        record_verdict("deny");
        record_ip_resolution("x-forwarded-for", "resolved");
    }
}
