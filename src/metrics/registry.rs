//! Registration of every phase's metrics, with a duplicate-name check.

use crate::metrics::{MetricDoc, PhaseMetrics};
use std::collections::HashMap;
use tracing::{debug, warn};

pub fn register_all_metrics() {
    let mut all_metrics = HashMap::new();

    register_phase_metrics::<super::lake::LakeMetrics>(&mut all_metrics);
    register_phase_metrics::<super::fetch::FetchMetrics>(&mut all_metrics);

    debug!("Registered {} metrics", all_metrics.len());
}

fn register_phase_metrics<T: PhaseMetrics>(all_metrics: &mut HashMap<&'static str, (&'static str, MetricDoc)>) {
    T::register_metrics();
    let phase_name = T::phase_name();

    for doc in T::metrics_documentation() {
        if let Some((owner, _)) = all_metrics.get(doc.name) {
            warn!(
                "Metric '{}' is defined by both '{}' and '{}'",
                doc.name, owner, phase_name
            );
        } else {
            all_metrics.insert(doc.name, (phase_name, doc));
        }
    }
}

/// Phase segment of a metric name (`datalake_lake_files_read_total` -> `lake`).
pub fn phase_of(metric_name: &str) -> Option<&str> {
    let rest = metric_name.strip_prefix("datalake_")?;
    rest.split('_').next().filter(|p| !p.is_empty())
}
