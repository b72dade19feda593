//! Decoding of partition files into [`Frame`]s.
//!
//! A partition holds plain CSV files and zip archives that wrap a single CSV.
//! The format is chosen from the file name only.

use crate::common::error::{FetchError, Result};
use crate::domain::frame::{Cell, Frame};
use csv::ReaderBuilder;
use serde::Serialize;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tracing::debug;
use zip::ZipArchive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TabularFormat {
    Csv,
    ZipCsv,
}

impl TabularFormat {
    /// Looks at the extension of the last path segment, ignoring case.
    pub fn detect(path: &str) -> Option<Self> {
        let name = path.rsplit('/').next().unwrap_or(path).to_ascii_lowercase();
        if name.ends_with(".zip") {
            Some(Self::ZipCsv)
        } else if name.ends_with(".csv") {
            Some(Self::Csv)
        } else {
            None
        }
    }
}

pub fn decode(format: TabularFormat, bytes: &[u8]) -> Result<Frame> {
    match format {
        TabularFormat::Csv => read_csv(bytes),
        TabularFormat::ZipCsv => read_zip(bytes),
    }
}

fn read_zip(bytes: &[u8]) -> Result<Frame> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let entries: Vec<usize> = (0..archive.len())
        .filter(|&i| archive.by_index(i).map(|f| f.is_file()).unwrap_or(false))
        .collect();

    let index = match entries.as_slice() {
        [only] => *only,
        [] => return Err(FetchError::Archive("zip archive contains no files".into())),
        many => {
            return Err(FetchError::Archive(format!(
                "zip archive contains {} files, expected exactly one",
                many.len()
            )))
        }
    };

    let mut entry = archive.by_index(index)?;
    debug!("Decoding zip entry {} ({} bytes)", entry.name(), entry.size());
    // the declared size is untrusted, let the buffer grow with the data
    let mut inner = Vec::new();
    entry.read_to_end(&mut inner)?;
    read_csv(&inner)
}

fn read_csv(bytes: &[u8]) -> Result<Frame> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = mangle_headers(reader.headers()?.iter());
    let mut frame = Frame::new(headers);

    for record in reader.records() {
        let record = record?;
        let row: Vec<Cell> = record
            .iter()
            .map(|field| {
                let field = field.trim();
                (!field.is_empty()).then(|| field.to_string())
            })
            .collect();
        frame.push_row(row);
    }

    Ok(frame)
}

/// Blank names become `Unnamed: {position}`; repeats get `.1`, `.2`, ...
///
/// A suffixed name that is itself taken keeps being suffixed (`v`, `v.1`,
/// `v.1.1`), so the result never holds the same name twice.
fn mangle_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::new();
    for (i, name) in raw.enumerate() {
        let name = name.trim();
        let mut column = if name.is_empty() {
            format!("Unnamed: {}", i)
        } else {
            name.to_string()
        };
        let mut seen = counts.get(&column).copied().unwrap_or(0);
        while seen > 0 {
            counts.insert(column.clone(), seen + 1);
            column = format!("{}.{}", column, seen);
            seen = counts.get(&column).copied().unwrap_or(0);
        }
        counts.insert(column.clone(), 1);
        out.push(column);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn zip_of(files: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            for (name, content) in files {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn detects_by_extension() {
        assert_eq!(TabularFormat::detect("ship/2024/05/a.csv"), Some(TabularFormat::Csv));
        assert_eq!(TabularFormat::detect("ship/2024/05/A.ZIP"), Some(TabularFormat::ZipCsv));
        assert_eq!(TabularFormat::detect("ship/2024/05/a.csv.zip"), Some(TabularFormat::ZipCsv));
        assert_eq!(TabularFormat::detect("ship/2024/05"), None);
        assert_eq!(TabularFormat::detect("ship/2024/05/notes.txt"), None);
        assert_eq!(TabularFormat::detect("ship.csv/2024/05/readme"), None);
    }

    #[test]
    fn reads_plain_csv_with_missing_cells() {
        let frame = decode(
            TabularFormat::Csv,
            b",ts,rpm\n0,2024-05-01T00:00:00Z,900\n1,2024-05-01T01:00:00Z,\n2,2024-05-01T02:00:00Z\n",
        )
        .unwrap();
        assert_eq!(frame.columns(), &["Unnamed: 0", "ts", "rpm"]);
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.rows()[1][2], None);
        assert_eq!(frame.rows()[2][2], None);
    }

    #[test]
    fn repeated_headers_are_suffixed() {
        let frame = decode(TabularFormat::Csv, b"ts,v,v,v\n").unwrap();
        assert_eq!(frame.columns(), &["ts", "v", "v.1", "v.2"]);
        assert!(frame.is_empty());
    }

    #[test]
    fn suffixed_header_never_collides_with_an_existing_one() {
        let csv = b"ts,v,v,v.1\n2024-05-01T01:00:00Z,4,5,6\n";
        let mut merged = decode(TabularFormat::Csv, csv).unwrap();
        assert_eq!(merged.columns(), &["ts", "v", "v.1", "v.1.1"]);

        merged.append(decode(TabularFormat::Csv, csv).unwrap());
        assert_eq!(merged.columns().len(), 4);
        for row in merged.rows() {
            let values: Vec<Option<&str>> = row[1..].iter().map(|c| c.as_deref()).collect();
            assert_eq!(values, vec![Some("4"), Some("5"), Some("6")]);
        }
    }

    #[test]
    fn reads_single_entry_zip() {
        let bytes = zip_of(&[("signals.csv", "ts,rpm\n2024-05-01T00:00:00Z,900\n")]);
        let frame = decode(TabularFormat::ZipCsv, &bytes).unwrap();
        assert_eq!(frame.columns(), &["ts", "rpm"]);
        assert_eq!(frame.rows()[0][1].as_deref(), Some("900"));
    }

    #[test]
    fn rejects_zip_with_several_entries() {
        let bytes = zip_of(&[("a.csv", "ts\n"), ("b.csv", "ts\n")]);
        assert!(matches!(
            decode(TabularFormat::ZipCsv, &bytes),
            Err(FetchError::Archive(_))
        ));
    }

    #[test]
    fn rejects_empty_zip() {
        let bytes = zip_of(&[]);
        assert!(matches!(
            decode(TabularFormat::ZipCsv, &bytes),
            Err(FetchError::Archive(_))
        ));
    }

    /// Rewrites the uncompressed size recorded for the first entry in the
    /// central directory, through its zip64 extra field when there is one.
    fn claim_uncompressed_size(buf: &mut [u8], size: u64) {
        let cd = buf
            .windows(4)
            .position(|w| w == [0x50, 0x4b, 0x01, 0x02])
            .expect("central directory header");
        let u16_at = |b: &[u8], at: usize| u16::from_le_bytes([b[at], b[at + 1]]) as usize;
        let name_len = u16_at(buf, cd + 28);
        let extra_len = u16_at(buf, cd + 30);

        let mut at = cd + 46 + name_len;
        let end = at + extra_len;
        while at + 4 <= end {
            let (id, len) = (u16_at(buf, at), u16_at(buf, at + 2));
            if id == 0x0001 && len >= 8 {
                buf[cd + 24..cd + 28].copy_from_slice(&u32::MAX.to_le_bytes());
                buf[at + 4..at + 12].copy_from_slice(&size.to_le_bytes());
                return;
            }
            at += 4 + len;
        }
        buf[cd + 24..cd + 28].copy_from_slice(&(size.min(u32::MAX as u64 - 1) as u32).to_le_bytes());
    }

    #[test]
    fn oversized_entry_claim_does_not_abort() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file("big.csv", SimpleFileOptions::default().large_file(true))
                .unwrap();
            zip.write_all(b"ts,rpm\n2024-05-01T00:00:00Z,900\n").unwrap();
            zip.finish().unwrap();
        }
        claim_uncompressed_size(&mut buf, 1 << 50);

        // either outcome is fine as long as decoding returns
        if let Ok(frame) = decode(TabularFormat::ZipCsv, &buf) {
            assert_eq!(frame.len(), 1);
        }
    }

    #[test]
    fn corrupt_zip_is_an_error() {
        assert!(matches!(
            decode(TabularFormat::ZipCsv, b"definitely not a zip"),
            Err(FetchError::Zip(_))
        ));
    }
}
