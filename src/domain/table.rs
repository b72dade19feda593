use crate::domain::frame::{Cell, Frame};
use crate::domain::timestamp::parse_timestamp;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesRow {
    pub ts: DateTime<Utc>,
    pub values: Vec<Cell>,
}

/// Rows indexed by a parsed UTC timestamp, one row per instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeriesTable {
    columns: Vec<String>,
    rows: Vec<TimeSeriesRow>,
}

impl TimeSeriesTable {
    /// Indexes `frame` by `ts_column`.
    ///
    /// All columns, including the raw `ts_column`, stay as value columns.
    /// Rows whose timestamp is missing or unparseable are dropped, as are
    /// later rows repeating an instant already seen. Returns the table and
    /// the number of rows dropped for an unusable timestamp.
    pub fn from_frame(frame: Frame, ts_column: &str) -> (Self, usize) {
        let Some(idx) = frame.column_index(ts_column) else {
            let (columns, rows) = frame.into_parts();
            return (
                Self {
                    columns,
                    rows: Vec::new(),
                },
                rows.len(),
            );
        };

        let (columns, raw_rows) = frame.into_parts();
        let mut unparsed = 0;
        let mut seen = HashSet::with_capacity(raw_rows.len());
        let mut rows = Vec::with_capacity(raw_rows.len());
        for values in raw_rows {
            match values[idx].as_deref().and_then(parse_timestamp) {
                Some(ts) => {
                    if seen.insert(ts) {
                        rows.push(TimeSeriesRow { ts, values });
                    }
                }
                None => unparsed += 1,
            }
        }

        (Self { columns, rows }, unparsed)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[TimeSeriesRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_ts(&self) -> Option<DateTime<Utc>> {
        self.rows.iter().map(|r| r.ts).min()
    }

    pub fn last_ts(&self) -> Option<DateTime<Utc>> {
        self.rows.iter().map(|r| r.ts).max()
    }

    /// Values of one column, row by row.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = Option<&str>> + '_> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(move |r| r.values[idx].as_deref()))
    }

    /// Keeps rows with `start <= ts < end`. Returns how many were removed.
    pub fn retain_range(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> usize {
        let before = self.rows.len();
        self.rows.retain(|r| r.ts >= start && r.ts < end);
        before - self.rows.len()
    }

    /// Removes the first `n` value columns (all of them if there are fewer).
    pub fn drop_leading_columns(&mut self, n: usize) {
        let n = n.min(self.columns.len());
        self.columns.drain(..n);
        for row in &mut self.rows {
            row.values.drain(..n);
        }
    }

    /// Removes a value column by name; returns whether it existed.
    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.columns.iter().position(|c| c == name) else {
            return false;
        };
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.values.remove(idx);
        }
        true
    }

    pub fn sort_by_time(&mut self) {
        self.rows.sort_by_key(|r| r.ts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn frame(columns: &[&str], rows: &[&[&str]]) -> Frame {
        Frame::from_rows(
            columns.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| {
                    r.iter()
                        .map(|c| (!c.is_empty()).then(|| c.to_string()))
                        .collect()
                })
                .collect(),
        )
    }

    fn utc(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, h, 0, 0).unwrap()
    }

    #[test]
    fn indexes_and_counts_bad_timestamps() {
        let (table, unparsed) = TimeSeriesTable::from_frame(
            frame(
                &["idx", "ts", "rpm"],
                &[
                    &["0", "2024-05-01T00:00:00Z", "900"],
                    &["1", "garbage", "910"],
                    &["2", "", "920"],
                    &["3", "2024-05-01 01:00:00+00:00", "930"],
                ],
            ),
            "ts",
        );
        assert_eq!(unparsed, 2);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1].ts, utc(1, 1));
        assert_eq!(table.columns(), &["idx", "ts", "rpm"]);
    }

    #[test]
    fn same_instant_in_two_spellings_is_one_row() {
        let (table, _) = TimeSeriesTable::from_frame(
            frame(
                &["ts", "v"],
                &[&["2024-05-01T00:00:00Z", "a"], &["2024-05-01 00:00:00", "b"]],
            ),
            "ts",
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].values[1].as_deref(), Some("a"));
    }

    #[test]
    fn missing_ts_column_yields_empty_table() {
        let (table, unparsed) = TimeSeriesTable::from_frame(frame(&["a"], &[&["1"], &["2"]]), "ts");
        assert!(table.is_empty());
        assert_eq!(unparsed, 2);
    }

    #[test]
    fn range_is_half_open() {
        let (mut table, _) = TimeSeriesTable::from_frame(
            frame(
                &["ts"],
                &[
                    &["2024-04-30T23:59:59Z"],
                    &["2024-05-01T00:00:00Z"],
                    &["2024-05-31T23:00:00Z"],
                    &["2024-06-01T00:00:00Z"],
                ],
            ),
            "ts",
        );
        let start = utc(1, 0);
        let end = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(table.retain_range(start, end), 2);
        assert!(table.rows().iter().all(|r| r.ts >= start && r.ts < end));
    }

    #[test]
    fn drops_leading_and_named_columns() {
        let (mut table, _) = TimeSeriesTable::from_frame(
            frame(&["Unnamed: 0", "ts", "rpm", "speed"], &[&["0", "2024-05-01", "900", "12"]]),
            "ts",
        );
        table.drop_leading_columns(2);
        assert_eq!(table.columns(), &["rpm", "speed"]);
        assert_eq!(table.rows()[0].values, vec![Some("900".to_string()), Some("12".to_string())]);

        assert!(table.drop_column("rpm"));
        assert!(!table.drop_column("rpm"));
        assert_eq!(table.column("speed").unwrap().collect::<Vec<_>>(), vec![Some("12")]);

        table.drop_leading_columns(10);
        assert!(table.columns().is_empty());
    }

    #[test]
    fn sorts_chronologically() {
        let (mut table, _) = TimeSeriesTable::from_frame(
            frame(&["ts"], &[&["2024-05-02T00:00:00Z"], &["2024-05-01T00:00:00Z"]]),
            "ts",
        );
        table.sort_by_time();
        assert_eq!(table.first_ts(), Some(utc(1, 0)));
        assert_eq!(table.rows()[0].ts, utc(1, 0));
        assert_eq!(table.last_ts(), Some(utc(2, 0)));
    }
}
