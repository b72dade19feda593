//! Domain data shapes shared across layers: partitions, timestamps, raw
//! frames, the indexed time-series table and the per-run report.

pub mod frame;
pub mod partition;
pub mod report;
pub mod table;
pub mod timestamp;

pub use frame::{Cell, Frame};
pub use partition::{months_in_range, partitions_for, Partition, YearMonth};
pub use report::{FetchOutcome, FetchReport, FileReport, PartitionReport, PartitionStatus};
pub use table::{TimeSeriesRow, TimeSeriesTable};
pub use timestamp::{day_start_utc, parse_timestamp};
