//! Prometheus exporter for the banned users gauges.
//!
//! The recorder is installed once per process. Gauges are pulled: the
//! `/metrics` handler asks the [`MetricsBridge`] to sample the store and then
//! renders.

use std::sync::OnceLock;

use ::metrics::{Unit, describe_gauge};
use banlist_core::MetricsBridge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static EXPORTER: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the process-wide Prometheus recorder.
///
/// Returns `false` when a recorder is already installed, in which case the
/// existing one keeps serving.
pub fn init_metrics() -> bool {
    if EXPORTER.get().is_some() {
        return false;
    }

    let handle = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus recorder not installed");
            return false;
        }
    };

    let installed = EXPORTER.set(handle).is_ok();
    if installed {
        tracing::info!("Prometheus recorder installed");
    }
    installed
}

/// Register help text for the bridge's gauges.
pub fn describe(bridge: &MetricsBridge) {
    describe_gauge!(
        bridge.count_name().to_string(),
        Unit::Count,
        "Number of banned users in the current snapshot"
    );
    describe_gauge!(
        bridge.age_name().to_string(),
        Unit::Seconds,
        "Seconds since the banned users list was last refreshed"
    );
}

/// Sample the bridge and render the exposition text, or `None` before
/// [`init_metrics`].
pub fn render(bridge: &MetricsBridge) -> Option<String> {
    let handle = EXPORTER.get()?;
    bridge.sample();
    Some(handle.render())
}
