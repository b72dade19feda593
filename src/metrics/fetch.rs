//! Fetch run metrics: partition outcomes and row accounting.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct FetchMetrics;

impl FetchMetrics {
    pub fn record_partition_fetched(files: usize) {
        ::metrics::counter!(phase_metric!(counter, "fetch", "partitions_fetched")).increment(1);
        ::metrics::counter!(phase_metric!(counter, "fetch", "files_decoded")).increment(files as u64);
    }

    pub fn record_partition_skipped() {
        ::metrics::counter!(phase_metric!(counter, "fetch", "partitions_skipped")).increment(1);
    }

    pub fn record_rows_merged(rows: usize) {
        ::metrics::histogram!(phase_metric!(histogram, "fetch", "rows_merged")).record(rows as f64);
    }

    pub fn record_rows_dropped(reason: &'static str, rows: usize) {
        if rows == 0 {
            return;
        }
        ::metrics::counter!(
            phase_metric!(counter, "fetch", "rows_dropped"),
            "reason" => reason
        )
        .increment(rows as u64);
    }

    pub fn record_run(rows: usize, duration_secs: f64) {
        ::metrics::gauge!(phase_metric!(gauge, "fetch", "last_run_rows")).set(rows as f64);
        ::metrics::histogram!(phase_metric!(histogram, "fetch", "run_duration_seconds"))
            .record(duration_secs);
    }
}

impl PhaseMetrics for FetchMetrics {
    fn register_metrics() {
        use metrics::{counter, gauge, histogram};

        let _ = counter!(phase_metric!(counter, "fetch", "partitions_fetched"));
        let _ = counter!(phase_metric!(counter, "fetch", "partitions_skipped"));
        let _ = counter!(phase_metric!(counter, "fetch", "files_decoded"));
        let _ = counter!(phase_metric!(counter, "fetch", "rows_dropped"));
        let _ = histogram!(phase_metric!(histogram, "fetch", "rows_merged"));
        let _ = histogram!(phase_metric!(histogram, "fetch", "run_duration_seconds"));
        let _ = gauge!(phase_metric!(gauge, "fetch", "last_run_rows"));
    }

    fn phase_name() -> &'static str {
        "fetch"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "fetch", "partitions_fetched"),
                metric_type: MetricType::Counter,
                help: "Partitions whose files were all decoded",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "fetch", "partitions_skipped"),
                metric_type: MetricType::Counter,
                help: "Partitions left out after a listing, download or decode failure",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "fetch", "files_decoded"),
                metric_type: MetricType::Counter,
                help: "CSV and zip files decoded",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "fetch", "rows_dropped"),
                metric_type: MetricType::Counter,
                help: "Rows removed while cleaning",
                labels: vec!["reason"],
            },
            MetricDoc {
                name: phase_metric!(histogram, "fetch", "rows_merged"),
                metric_type: MetricType::Histogram,
                help: "Rows merged per fetched partition",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(histogram, "fetch", "run_duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Wall time of a fetch run",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(gauge, "fetch", "last_run_rows"),
                metric_type: MetricType::Gauge,
                help: "Rows returned by the most recent fetch",
                labels: vec![],
            },
        ]
    }
}
