//! Prometheus metrics, grouped by the stage that emits them.
//!
//! Every stage owns a unit struct implementing [`PhaseMetrics`]; metric names
//! are built with [`phase_metric!`] so they share the `datalake_` prefix.

pub mod fetch;
pub mod lake;
pub mod registry;

pub use fetch::FetchMetrics;
pub use lake::LakeMetrics;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::{Once, OnceLock};
use tracing::{debug, warn};

static INIT: Once = Once::new();
static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the in-process Prometheus recorder and registers all metrics.
///
/// Idempotent. No HTTP listener is started: the fetcher is a short-lived
/// job, so the snapshot is rendered on demand with [`render`].
pub fn init_metrics() {
    INIT.call_once(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if HANDLE.set(handle).is_err() {
                warn!("Prometheus handle was already set");
            }
            registry::register_all_metrics();
            debug!("Prometheus recorder installed");
        }
        Err(e) => warn!("Failed to install Prometheus recorder: {}", e),
    });
}

/// Current snapshot in Prometheus text format, if the recorder is installed.
pub fn render() -> Option<String> {
    HANDLE.get().map(|h| h.render())
}

pub trait PhaseMetrics {
    /// Touch every metric once so it shows up before first use.
    fn register_metrics();

    fn phase_name() -> &'static str;

    fn metrics_documentation() -> Vec<MetricDoc>;
}

#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
    pub labels: Vec<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Histogram,
    Gauge,
}

/// `datalake_{phase}_{name}`, with `_total` appended for counters.
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("datalake_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("datalake_", $phase, "_", $name)
    };
    (gauge, $phase:literal, $name:literal) => {
        concat!("datalake_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;
