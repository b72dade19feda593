use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// A single CSV field; `None` for an empty or absent value.
pub type Cell = Option<String>;

/// Loosely typed table as decoded from one or more files.
///
/// Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Frame {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Rows shorter than the header are padded with missing cells, longer
    /// ones are cut.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<Cell>>) {
        (self.columns, self.rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    /// Drops rows in which every cell is missing. Returns how many went.
    pub fn drop_empty_rows(&mut self) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| row.iter().any(Option::is_some));
        before - self.rows.len()
    }

    /// Appends `other` below `self`, matching columns by name.
    ///
    /// Columns only `other` has are added at the end (existing rows get
    /// missing cells there); columns only `self` has stay missing in the
    /// appended rows.
    pub fn append(&mut self, other: Frame) {
        if self.columns.is_empty() && self.rows.is_empty() {
            *self = other;
            return;
        }

        let mut index: HashMap<String, usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();

        let mut mapping = Vec::with_capacity(other.columns.len());
        for column in other.columns {
            let position = match index.get(&column) {
                Some(&i) => i,
                None => {
                    let i = self.columns.len();
                    index.insert(column.clone(), i);
                    self.columns.push(column);
                    i
                }
            };
            mapping.push(position);
        }

        let width = self.columns.len();
        for row in &mut self.rows {
            row.resize(width, None);
        }
        for source in other.rows {
            let mut row: Vec<Cell> = vec![None; width];
            for (cell, &target) in source.into_iter().zip(&mapping) {
                row[target] = cell;
            }
            self.rows.push(row);
        }
    }

    /// Keeps the first row for every distinct key of `column`.
    ///
    /// `key_fn` maps the raw cell to a key; rows where the cell is missing or
    /// `key_fn` returns `None` are left in place. Returns rows removed, or
    /// `None` when the column does not exist.
    pub fn dedup_by_key<K, F>(&mut self, column: &str, mut key_fn: F) -> Option<usize>
    where
        K: Eq + Hash,
        F: FnMut(&str) -> Option<K>,
    {
        let idx = self.column_index(column)?;
        let before = self.rows.len();
        let mut seen: HashSet<K> = HashSet::with_capacity(before);
        self.rows.retain(|row| {
            match row[idx].as_deref().and_then(&mut key_fn) {
                Some(key) => seen.insert(key),
                None => true,
            }
        });
        Some(before - self.rows.len())
    }
}
