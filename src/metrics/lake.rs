//! Storage access metrics, shared by the Azure and local adapters.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct LakeMetrics;

impl LakeMetrics {
    pub fn record_list(entries: usize) {
        ::metrics::counter!(phase_metric!(counter, "lake", "listings")).increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "lake", "listing_entries"))
            .record(entries as f64);
    }

    pub fn record_read(bytes: usize) {
        ::metrics::counter!(phase_metric!(counter, "lake", "files_read")).increment(1);
        ::metrics::counter!(phase_metric!(counter, "lake", "bytes_read")).increment(bytes as u64);
    }

    /// `operation` is `list` or `read`.
    pub fn record_error(operation: &str) {
        ::metrics::counter!(
            phase_metric!(counter, "lake", "errors"),
            "operation" => operation.to_string()
        )
        .increment(1);
    }
}

impl PhaseMetrics for LakeMetrics {
    fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "lake", "listings"));
        let _ = counter!(phase_metric!(counter, "lake", "files_read"));
        let _ = counter!(phase_metric!(counter, "lake", "bytes_read"));
        let _ = counter!(phase_metric!(counter, "lake", "errors"));
        let _ = histogram!(phase_metric!(histogram, "lake", "listing_entries"));
    }

    fn phase_name() -> &'static str {
        "lake"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "lake", "listings"),
                metric_type: MetricType::Counter,
                help: "Directory listings performed",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(histogram, "lake", "listing_entries"),
                metric_type: MetricType::Histogram,
                help: "Entries returned per listing",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "lake", "files_read"),
                metric_type: MetricType::Counter,
                help: "Files downloaded from the lake",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "lake", "bytes_read"),
                metric_type: MetricType::Counter,
                help: "Bytes downloaded from the lake",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "lake", "errors"),
                metric_type: MetricType::Counter,
                help: "Failed storage operations",
                labels: vec!["operation"],
            },
        ]
    }
}
