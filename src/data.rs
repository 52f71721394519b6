// src/data.rs
//
// DataSet: one flat output table as produced by a report generator.
// Cells are already formatted strings; the writer only handles quoting.

use std::collections::HashSet;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataSet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DataSet {
    pub fn new(name: &str, headers: Vec<String>) -> Self {
        Self { name: s!(name), headers, rows: Vec::new() }
    }

    /// Append a row. Short rows are padded; long rows are a programming error.
    pub fn push(&mut self, mut row: Vec<String>) {
        debug_assert!(row.len() <= self.headers.len(), "{}: row wider than header", self.name);
        row.resize(self.headers.len(), s!());
        self.rows.push(row);
    }

    pub fn len(&self) -> usize { self.rows.len() }
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Drop exact duplicate rows, keeping the first occurrence.
    pub fn dedup(&mut self) {
        let mut seen = HashSet::with_capacity(self.rows.len());
        self.rows.retain(|r| seen.insert(r.clone()));
    }

    /// Stable sort by the named columns; unknown names are ignored.
    pub fn sort_by_columns(&mut self, columns: &[&str]) {
        let ix: Vec<usize> = columns.iter().filter_map(|c| self.column(c)).collect();
        self.rows.sort_by(|a, b| {
            ix.iter()
                .map(|&i| a[i].cmp(&b[i]))
                .find(|o| o.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    /// Values of one column, row order.
    pub fn values<'a>(&'a self, header: &str) -> Vec<&'a str> {
        match self.column(header) {
            Some(i) => self.rows.iter().map(|r| r[i].as_str()).collect(),
            None => Vec::new(),
        }
    }
}
