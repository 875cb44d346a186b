use std::io;

use camino::Utf8Path;
use indexmap::{IndexMap, IndexSet};

use crate::error::ToolkitError;

/// Default header of the index column.
pub const INDEX_COLUMN: &str = "name";

pub type Row = IndexMap<String, String>;

/// Rows keyed by an index value, with columns derived from the union of
/// row keys in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowTable {
    index: String,
    rows: IndexMap<String, Row>,
}

impl Default for RowTable {
    fn default() -> Self {
        Self::with_index(INDEX_COLUMN)
    }
}

impl RowTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty table whose index column is headed `index`; may be empty.
    pub fn with_index(index: &str) -> Self {
        Self {
            index: index.to_string(),
            rows: IndexMap::new(),
        }
    }

    /// Inserts a row, replacing any row already stored under `key`. The
    /// replaced row keeps its position.
    pub fn insert(&mut self, key: String, row: Row) -> Option<Row> {
        self.rows.insert(key, row)
    }

    pub fn get(&self, key: &str) -> Option<&Row> {
        self.rows.get(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn columns(&self) -> Vec<&str> {
        let mut columns = IndexSet::new();
        for row in self.rows.values() {
            for column in row.keys() {
                columns.insert(column.as_str());
            }
        }
        columns.into_iter().collect()
    }

    /// Writes the table as CSV, replacing whatever is at `path`.
    pub fn write_csv(&self, path: &Utf8Path) -> Result<(), ToolkitError> {
        let writer = csv::Writer::from_path(path.as_std_path())?;
        self.write_to(writer)
    }

    pub fn write_csv_to<W: io::Write>(&self, out: W) -> Result<(), ToolkitError> {
        self.write_to(csv::Writer::from_writer(out))
    }

    fn write_to<W: io::Write>(&self, mut writer: csv::Writer<W>) -> Result<(), ToolkitError> {
        let columns = self.columns();
        let mut header = Vec::with_capacity(columns.len() + 1);
        header.push(self.index.as_str());
        header.extend(columns.iter().copied());
        writer.write_record(&header)?;

        for (key, row) in &self.rows {
            let mut record = Vec::with_capacity(columns.len() + 1);
            record.push(key.as_str());
            for column in &columns {
                record.push(row.get(*column).map(String::as_str).unwrap_or(""));
            }
            writer.write_record(&record)?;
        }
        writer
            .flush()
            .map_err(|err| ToolkitError::Filesystem(err.to_string()))?;
        Ok(())
    }

    /// Column-aligned text rendering for log output.
    pub fn to_pretty_string(&self) -> String {
        let columns = self.columns();
        let mut lines: Vec<Vec<&str>> = Vec::with_capacity(self.rows.len() + 1);
        let mut header = vec![self.index.as_str()];
        header.extend(columns.iter().copied());
        lines.push(header);
        for (key, row) in &self.rows {
            let mut line = vec![key.as_str()];
            line.extend(
                columns
                    .iter()
                    .map(|column| row.get(*column).map(String::as_str).unwrap_or("")),
            );
            lines.push(line);
        }

        let mut widths = vec![0usize; columns.len() + 1];
        for line in &lines {
            for (idx, cell) in line.iter().enumerate() {
                widths[idx] = widths[idx].max(cell.chars().count());
            }
        }

        lines
            .iter()
            .map(|line| {
                line.iter()
                    .zip(&widths)
                    .map(|(cell, width)| format!("{cell:<width$}"))
                    .collect::<Vec<_>>()
                    .join("  ")
                    .trim_end()
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
