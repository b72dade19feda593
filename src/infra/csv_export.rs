use crate::common::error::Result;
use crate::domain::table::TimeSeriesTable;
use chrono::{DateTime, Local, SecondsFormat, TimeZone};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// `{prefix}{YYYYmmdd-HHMMSS}.csv`
pub fn export_filename<Tz: TimeZone>(prefix: &str, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}{}.csv", prefix, now.format("%Y%m%d-%H%M%S"))
}

/// Writes the table with `ts` as the first column.
pub fn write_csv<W: Write>(table: &TimeSeriesTable, writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);

    let mut header = Vec::with_capacity(table.columns().len() + 1);
    header.push("ts");
    header.extend(table.columns().iter().map(String::as_str));
    out.write_record(&header)?;

    for row in table.rows() {
        let mut record = Vec::with_capacity(row.values.len() + 1);
        record.push(row.ts.to_rfc3339_opts(SecondsFormat::AutoSi, true));
        record.extend(row.values.iter().map(|v| v.clone().unwrap_or_default()));
        out.write_record(&record)?;
    }

    out.flush()?;
    Ok(())
}

/// Writes `table` to a fresh timestamped file under `dir` and returns its path.
pub fn export_table(table: &TimeSeriesTable, dir: &Path, prefix: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(export_filename(prefix, &Local::now()));
    let file = fs::File::create(&path)?;
    write_csv(table, file)?;
    info!("Wrote {} rows to {}", table.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::frame::Frame;
    use chrono::Utc;

    fn table() -> TimeSeriesTable {
        let frame = Frame::from_rows(
            vec!["ts".into(), "rpm".into(), "note".into()],
            vec![
                vec![Some("2024-05-01 00:00:00+00:00".into()), Some("900".into()), None],
                vec![Some("2024-05-01T01:00:00.5Z".into()), None, Some("a,b".into())],
            ],
        );
        let (mut table, _) = TimeSeriesTable::from_frame(frame, "ts");
        table.drop_column("ts");
        table
    }

    #[test]
    fn filename_uses_compact_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 6, 3, 14, 5, 9).unwrap();
        assert_eq!(export_filename("test_fetch", &now), "test_fetch20240603-140509.csv");
    }

    #[test]
    fn writes_ts_first_and_empty_for_missing() {
        let mut buf = Vec::new();
        write_csv(&table(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "ts,rpm,note\n2024-05-01T00:00:00Z,900,\n2024-05-01T01:00:00.500Z,,\"a,b\"\n"
        );
    }

    #[test]
    fn export_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("out");
        let path = export_table(&table(), &target, "run_").unwrap();
        assert!(path.starts_with(&target));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("run_") && name.ends_with(".csv"));
        assert!(fs::read_to_string(path).unwrap().starts_with("ts,rpm,note\n"));
    }
}
