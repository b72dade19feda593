use crate::domain::partition::Partition;
use crate::domain::table::TimeSeriesTable;
use crate::parser::TabularFormat;
use serde::Serialize;

/// One file that made it into the merge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub path: String,
    pub format: TabularFormat,
    pub bytes: usize,
    pub rows: usize,
    pub sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PartitionStatus {
    /// Every file under the partition was listed, read and decoded.
    Fetched {
        files: Vec<FileReport>,
        /// Paths that were neither `.csv` nor `.zip` (directories excluded).
        ignored: Vec<String>,
        rows_added: usize,
    },
    /// The partition contributed nothing because of `reason`.
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionReport {
    pub partition: Partition,
    #[serde(flatten)]
    pub status: PartitionStatus,
}

impl PartitionReport {
    pub fn is_skipped(&self) -> bool {
        matches!(self.status, PartitionStatus::Skipped { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchReport {
    pub partitions: Vec<PartitionReport>,
    pub empty_rows_dropped: usize,
    pub duplicates_removed: usize,
    pub unparsed_timestamps: usize,
    pub out_of_range: usize,
}

impl FetchReport {
    /// True when no partition was skipped.
    pub fn is_complete(&self) -> bool {
        !self.partitions.iter().any(PartitionReport::is_skipped)
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&Partition, &str)> {
        self.partitions.iter().filter_map(|p| match &p.status {
            PartitionStatus::Skipped { reason } => Some((&p.partition, reason.as_str())),
            PartitionStatus::Fetched { .. } => None,
        })
    }

    pub fn files(&self) -> impl Iterator<Item = &FileReport> {
        self.partitions.iter().flat_map(|p| match &p.status {
            PartitionStatus::Fetched { files, .. } => files.as_slice(),
            PartitionStatus::Skipped { .. } => &[][..],
        })
    }

    pub fn fetched_count(&self) -> usize {
        self.partitions.len() - self.skipped().count()
    }
}

/// Result of a range fetch: the table plus how each partition fared.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub table: TimeSeriesTable,
    pub report: FetchReport,
}
