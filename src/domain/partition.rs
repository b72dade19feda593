//! Year-month partitions of an entity's folder tree.
//!
//! Ship data is laid out as `{entity}/{YYYY}/{MM}/...`. A date range is
//! covered by walking it one day at a time and collecting each distinct
//! year-month, end date included.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}/{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    /// Accepts `YYYY/MM` and `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once(|c: char| c == '/' || c == '-')
            .ok_or_else(|| format!("expected YYYY/MM, got '{}'", s))?;
        let year: i32 = year
            .parse()
            .map_err(|_| format!("invalid year in '{}'", s))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("invalid month in '{}'", s))?;
        YearMonth::new(year, month).ok_or_else(|| format!("month out of range in '{}'", s))
    }
}

/// Every year-month touched by the days from `start` through `end`, inclusive.
pub fn months_in_range(start: NaiveDate, end: NaiveDate) -> Vec<YearMonth> {
    if end < start {
        return Vec::new();
    }
    let last = YearMonth::from_date(end);
    let mut current = YearMonth::from_date(start);
    let mut months = vec![current];
    while current < last {
        current = current.next();
        months.push(current);
    }
    months
}

/// One entity's folder for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub entity: String,
    pub period: YearMonth,
}

impl Partition {
    pub fn new(entity: impl Into<String>, period: YearMonth) -> Self {
        Self {
            entity: entity.into(),
            period,
        }
    }

    pub fn path(&self) -> String {
        format!("{}/{}", self.entity.trim_end_matches('/'), self.period)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

pub fn partitions_for(entity: &str, start: NaiveDate, end: NaiveDate) -> Vec<Partition> {
    months_in_range(start, end)
        .into_iter()
        .map(|period| Partition::new(entity, period))
        .collect()
}
