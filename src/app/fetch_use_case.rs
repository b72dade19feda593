use crate::app::ports::DataLakePort;
use crate::common::constants::{DEFAULT_DROP_LEADING_COLUMNS, TS_COLUMN};
use crate::common::error::{FetchError, Result};
use crate::config::FetchSettings;
use crate::domain::frame::Frame;
use crate::domain::partition::{months_in_range, Partition, YearMonth};
use crate::domain::report::{FetchOutcome, FetchReport, FileReport, PartitionReport, PartitionStatus};
use crate::domain::table::TimeSeriesTable;
use crate::domain::timestamp::{day_start_utc, parse_timestamp};
use crate::metrics::FetchMetrics;
use crate::parser::{self, TabularFormat};
use chrono::NaiveDate;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    /// Column holding the row timestamp.
    pub ts_column: String,
    /// Leading value columns discarded from a range fetch.
    pub drop_leading_columns: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            ts_column: TS_COLUMN.to_string(),
            drop_leading_columns: DEFAULT_DROP_LEADING_COLUMNS,
        }
    }
}

impl From<&FetchSettings> for FetchOptions {
    fn from(settings: &FetchSettings) -> Self {
        Self {
            ts_column: settings.ts_column.clone(),
            drop_leading_columns: settings.drop_leading_columns,
        }
    }
}

/// Merged partitions, indexed by timestamp, with every column kept.
#[derive(Debug, Clone, Default)]
pub struct Collected {
    pub table: TimeSeriesTable,
    pub report: FetchReport,
}

/// Everything read from one partition, held back until the whole partition succeeded.
struct StagedPartition {
    frame: Frame,
    files: Vec<FileReport>,
    ignored: Vec<String>,
}

pub struct FetchUseCase<L: DataLakePort + ?Sized> {
    pub lake: Box<L>,
    pub options: FetchOptions,
}

impl<L: DataLakePort + ?Sized> FetchUseCase<L> {
    pub fn new(lake: Box<L>, options: FetchOptions) -> Self {
        Self { lake, options }
    }

    /// Fetches `periods` of `entity` in order and merges them into one table.
    ///
    /// A partition that cannot be listed, read or decoded is reported as
    /// skipped and contributes no rows.
    #[instrument(skip(self, periods), fields(partitions = periods.len()))]
    pub async fn collect_partitions(&self, entity: &str, periods: &[YearMonth]) -> Result<Collected> {
        let ts_column = self.options.ts_column.as_str();
        let mut merged = Frame::default();
        let mut report = FetchReport::default();

        for &period in periods {
            let partition = Partition::new(entity, period);
            let status = match self.stage_partition(&partition).await {
                Ok(staged) => {
                    let rows_added = staged.frame.len();
                    debug!(
                        "Partition {} staged {} rows from {} files",
                        partition,
                        rows_added,
                        staged.files.len()
                    );
                    FetchMetrics::record_partition_fetched(staged.files.len());
                    FetchMetrics::record_rows_merged(rows_added);
                    merged.append(staged.frame);
                    PartitionStatus::Fetched {
                        files: staged.files,
                        ignored: staged.ignored,
                        rows_added,
                    }
                }
                Err(e) => {
                    warn!("Skipping partition {}: {}", partition, e);
                    FetchMetrics::record_partition_skipped();
                    PartitionStatus::Skipped { reason: e.to_string() }
                }
            };
            report.partitions.push(PartitionReport { partition, status });
        }

        report.empty_rows_dropped = merged.drop_empty_rows();
        report.duplicates_removed = merged
            .dedup_by_key(ts_column, parse_timestamp)
            .unwrap_or(0);
        let (table, unparsed) = TimeSeriesTable::from_frame(merged, ts_column);
        report.unparsed_timestamps = unparsed;

        FetchMetrics::record_rows_dropped("empty", report.empty_rows_dropped);
        FetchMetrics::record_rows_dropped("duplicate", report.duplicates_removed);
        FetchMetrics::record_rows_dropped("unparsed_ts", report.unparsed_timestamps);

        Ok(Collected { table, report })
    }

    /// Rows of `entity` with `start <= ts < end`, both dates taken at 00:00 UTC.
    #[instrument(skip(self), fields(run_id = %uuid::Uuid::new_v4()))]
    pub async fn fetch_range(&self, entity: &str, start: NaiveDate, end: NaiveDate) -> Result<FetchOutcome> {
        if end < start {
            return Err(FetchError::InvalidRange { start, end });
        }
        let started = Instant::now();

        let periods = months_in_range(start, end);
        info!("Fetching {} from {} to {} ({} partitions)", entity, start, end, periods.len());

        let Collected { mut table, mut report } = self.collect_partitions(entity, &periods).await?;

        report.out_of_range = table.retain_range(day_start_utc(start), day_start_utc(end));
        FetchMetrics::record_rows_dropped("out_of_range", report.out_of_range);
        table.drop_leading_columns(self.options.drop_leading_columns);
        table.drop_column(&self.options.ts_column);
        table.sort_by_time();

        FetchMetrics::record_run(table.len(), started.elapsed().as_secs_f64());
        if report.is_complete() {
            info!("Fetched {} rows for {}", table.len(), entity);
        } else {
            warn!(
                "Fetched {} rows for {} with {} of {} partitions skipped",
                table.len(),
                entity,
                report.partitions.len() - report.fetched_count(),
                report.partitions.len()
            );
        }

        Ok(FetchOutcome { table, report })
    }

    async fn stage_partition(&self, partition: &Partition) -> Result<StagedPartition> {
        let ts_column = self.options.ts_column.as_str();
        let mut entries = self.lake.list_paths(&partition.path()).await?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let mut staged = StagedPartition {
            frame: Frame::default(),
            files: Vec::new(),
            ignored: Vec::new(),
        };

        for entry in entries {
            if entry.is_directory {
                continue;
            }
            let Some(format) = TabularFormat::detect(&entry.name) else {
                debug!("Ignoring {}", entry.name);
                staged.ignored.push(entry.name);
                continue;
            };

            let object = self.lake.read_file(&entry.name).await?;
            let frame = parser::decode(format, &object.bytes)?;
            if frame.column_index(ts_column).is_none() {
                return Err(FetchError::MissingColumn(format!(
                    "{} has no '{}' column",
                    entry.name, ts_column
                )));
            }

            let sha256 = {
                use sha2::{Digest, Sha256};
                let mut h = Sha256::new();
                h.update(&object.bytes);
                hex::encode(h.finalize())
            };
            staged.files.push(FileReport {
                path: object.path,
                format,
                bytes: object.bytes.len(),
                rows: frame.len(),
                sha256,
                etag: object.etag,
            });
            staged.frame.append(frame);
        }

        Ok(staged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::{LakeObject, PathEntry};
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashSet};
    use std::io::{Cursor, Write};

    #[derive(Default)]
    struct MemoryLake {
        files: BTreeMap<String, Vec<u8>>,
        broken_listings: HashSet<String>,
    }

    impl MemoryLake {
        fn with(mut self, path: &str, content: &[u8]) -> Self {
            self.files.insert(path.to_string(), content.to_vec());
            self
        }

        fn broken(mut self, prefix: &str) -> Self {
            self.broken_listings.insert(prefix.to_string());
            self
        }
    }

    #[async_trait]
    impl DataLakePort for MemoryLake {
        async fn list_paths(&self, prefix: &str) -> Result<Vec<PathEntry>> {
            if self.broken_listings.contains(prefix) {
                return Err(FetchError::Storage {
                    status: 500,
                    message: "InternalError".into(),
                });
            }
            let dir = format!("{}/", prefix);
            Ok(self
                .files
                .iter()
                .filter(|(name, _)| name.starts_with(&dir))
                .map(|(name, bytes)| PathEntry {
                    name: name.clone(),
                    is_directory: false,
                    content_length: Some(bytes.len() as u64),
                })
                .collect())
        }

        async fn read_file(&self, path: &str) -> Result<LakeObject> {
            let bytes = self.files.get(path).cloned().ok_or_else(|| FetchError::Storage {
                status: 404,
                message: format!("BlobNotFound: {}", path),
            })?;
            Ok(LakeObject {
                path: path.to_string(),
                bytes,
                etag: None,
            })
        }
    }

    fn use_case(lake: MemoryLake) -> FetchUseCase<MemoryLake> {
        FetchUseCase::new(Box::new(lake), FetchOptions::default())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn zipped(name: &str, content: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file(name, zip::write::SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    const MAY_A: &str = "\
,id,ts,rpm
0,a,2024-05-01T00:00:00Z,900
1,a,2024-05-01T01:00:00Z,910
";

    const MAY_B: &str = "\
,id,ts,rpm
0,b,2024-05-01 00:00:00+00:00,999
1,b,2024-05-02T00:00:00Z,920
,,,
";

    #[tokio::test]
    async fn merges_files_and_keeps_first_duplicate() {
        let lake = MemoryLake::default()
            .with("vessel/2024/05/a.csv", MAY_A.as_bytes())
            .with("vessel/2024/05/b.zip", &zipped("b.csv", MAY_B));

        let collected = use_case(lake)
            .collect_partitions("vessel", &[YearMonth::new(2024, 5).unwrap()])
            .await
            .unwrap();

        assert_eq!(collected.table.len(), 3);
        assert_eq!(collected.table.columns(), &["Unnamed: 0", "id", "ts", "rpm"]);
        let rpm: Vec<Option<&str>> = collected.table.column("rpm").unwrap().collect();
        assert_eq!(rpm, vec![Some("900"), Some("910"), Some("920")]);
        assert_eq!(collected.report.duplicates_removed, 1);
        assert_eq!(collected.report.empty_rows_dropped, 1);

        let files: Vec<&FileReport> = collected.report.files().collect();
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].format, TabularFormat::ZipCsv);
        assert_eq!(files[0].sha256.len(), 64);
    }

    #[tokio::test]
    async fn range_is_half_open_and_leading_columns_dropped() {
        let lake = MemoryLake::default()
            .with("vessel/2024/05/a.csv", MAY_A.as_bytes())
            .with(
                "vessel/2024/06/a.csv",
                b",id,ts,rpm\n0,a,2024-06-01T00:00:00Z,930\n",
            );

        let outcome = use_case(lake)
            .fetch_range("vessel", date(2024, 5, 1), date(2024, 6, 1))
            .await
            .unwrap();

        assert_eq!(outcome.table.columns(), &["rpm"]);
        assert_eq!(outcome.table.len(), 2);
        assert_eq!(outcome.report.out_of_range, 1);
        assert!(outcome.report.is_complete());
        assert_eq!(
            outcome.table.last_ts().map(|t| t.to_rfc3339()),
            Some("2024-05-01T01:00:00+00:00".to_string())
        );
    }

    #[tokio::test]
    async fn failed_partition_is_skipped_not_fatal() {
        let lake = MemoryLake::default()
            .with("vessel/2024/05/a.csv", MAY_A.as_bytes())
            .broken("vessel/2024/06");

        let outcome = use_case(lake)
            .fetch_range("vessel", date(2024, 5, 1), date(2024, 6, 30))
            .await
            .unwrap();

        assert_eq!(outcome.table.len(), 2);
        assert!(!outcome.report.is_complete());
        let skipped: Vec<String> = outcome.report.skipped().map(|(p, _)| p.path()).collect();
        assert_eq!(skipped, vec!["vessel/2024/06".to_string()]);
    }

    #[tokio::test]
    async fn one_bad_file_discards_its_whole_partition() {
        let lake = MemoryLake::default()
            .with("vessel/2024/05/a.csv", MAY_A.as_bytes())
            .with("vessel/2024/05/b.zip", b"not a zip")
            .with("vessel/2024/06/a.csv", b"ts,rpm\n2024-06-03T00:00:00Z,940\n");

        let collected = use_case(lake)
            .collect_partitions(
                "vessel",
                &[YearMonth::new(2024, 5).unwrap(), YearMonth::new(2024, 6).unwrap()],
            )
            .await
            .unwrap();

        assert_eq!(collected.table.len(), 1);
        assert!(collected.report.partitions[0].is_skipped());
        assert!(!collected.report.partitions[1].is_skipped());
    }

    #[tokio::test]
    async fn file_without_ts_column_skips_partition() {
        let lake = MemoryLake::default().with("vessel/2024/05/a.csv", b"time,rpm\n2024-05-01,900\n");

        let collected = use_case(lake)
            .collect_partitions("vessel", &[YearMonth::new(2024, 5).unwrap()])
            .await
            .unwrap();

        match &collected.report.partitions[0].status {
            PartitionStatus::Skipped { reason } => assert!(reason.contains("'ts'")),
            other => panic!("unexpected status: {other:?}"),
        }
        assert!(collected.table.is_empty());
    }

    #[tokio::test]
    async fn empty_partitions_and_stray_files_are_tolerated() {
        let lake = MemoryLake::default()
            .with("vessel/2024/05/readme.txt", b"hello")
            .with("vessel/2024/05/a.csv", MAY_A.as_bytes());

        let outcome = use_case(lake)
            .fetch_range("vessel", date(2024, 4, 1), date(2024, 6, 1))
            .await
            .unwrap();

        assert!(outcome.report.is_complete());
        assert_eq!(outcome.report.partitions.len(), 3);
        match &outcome.report.partitions[1].status {
            PartitionStatus::Fetched { ignored, files, .. } => {
                assert_eq!(ignored, &vec!["vessel/2024/05/readme.txt".to_string()]);
                assert_eq!(files.len(), 1);
            }
            other => panic!("unexpected status: {other:?}"),
        }
        assert_eq!(outcome.table.len(), 2);
    }

    #[tokio::test]
    async fn unparseable_timestamps_are_counted() {
        let lake = MemoryLake::default().with(
            "vessel/2024/05/a.csv",
            b"ts,rpm\nyesterday,1\n,2\n2024-05-04T00:00:00Z,3\n",
        );

        let collected = use_case(lake)
            .collect_partitions("vessel", &[YearMonth::new(2024, 5).unwrap()])
            .await
            .unwrap();

        assert_eq!(collected.table.len(), 1);
        assert_eq!(collected.report.unparsed_timestamps, 2);
    }

    #[tokio::test]
    async fn reversed_range_is_rejected() {
        let result = use_case(MemoryLake::default())
            .fetch_range("vessel", date(2024, 6, 1), date(2024, 5, 1))
            .await;
        assert!(matches!(result, Err(FetchError::InvalidRange { .. })));
    }

    #[test]
    fn options_follow_settings() {
        let settings = FetchSettings {
            ts_column: "time".into(),
            drop_leading_columns: 0,
            ..Default::default()
        };
        assert_eq!(
            FetchOptions::from(&settings),
            FetchOptions {
                ts_column: "time".into(),
                drop_leading_columns: 0,
            }
        );
    }
}
