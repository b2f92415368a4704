//! Raw delimited table and the cleaning steps applied to it
//!
//! The table keeps every cell as text so that cleaning (missing markers,
//! row drops, duplicate detection) happens before any numeric parsing.

use crate::core::{PipelineError, Result};
use csv::ReaderBuilder;
use log::{debug, info};
use serde::Serialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Cells that mark a missing value in the risk-factor dataset
pub const DEFAULT_MISSING_MARKERS: [&str; 2] = ["?", ""];

/// In-memory table of optional string cells; `None` is a missing cell
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Build a table, checking that every row matches the header width
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Result<Self> {
        if columns.is_empty() {
            return Err(PipelineError::InvalidDataset(
                "table has no columns".to_string(),
            ));
        }
        if let Some(row) = rows.iter().find(|row| row.len() != columns.len()) {
            return Err(PipelineError::DimensionMismatch {
                expected: columns.len(),
                actual: row.len(),
            });
        }
        Ok(Self { columns, rows })
    }

    /// Load a comma-separated file with a header row
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let table = Self::from_reader(BufReader::new(file))?;
        info!(
            "Loaded {} rows x {} columns from {}",
            table.len(),
            table.n_columns(),
            path.display()
        );
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

        let columns: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect();
        if columns.iter().all(|c| c.is_empty()) {
            return Err(PipelineError::InvalidDataset(
                "missing header row".to_string(),
            ));
        }

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(|cell| Some(cell.to_string())).collect());
        }

        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Spaces become underscores, then everything is lowercased
    pub fn normalize_column_names(&mut self) {
        for column in &mut self.columns {
            *column = column.replace(' ', "_").to_lowercase();
        }
    }

    /// Turn every cell equal to one of `markers` into a missing cell
    ///
    /// Returns the number of cells marked.
    pub fn mark_missing<S: AsRef<str>>(&mut self, markers: &[S]) -> usize {
        let mut marked = 0;
        for cell in self.rows.iter_mut().flatten() {
            let is_marker = cell
                .as_deref()
                .is_some_and(|value| markers.iter().any(|m| m.as_ref() == value));
            if is_marker {
                *cell = None;
                marked += 1;
            }
        }
        marked
    }

    /// Drop every row with a missing cell in any column
    ///
    /// Returns the number of rows dropped.
    pub fn drop_missing(&mut self) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| row.iter().all(Option::is_some));
        before - self.rows.len()
    }

    /// Drop rows that exactly repeat an earlier row, keeping the first
    ///
    /// Returns the number of rows dropped.
    pub fn drop_duplicates(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen = HashSet::with_capacity(before);
        self.rows.retain(|row| seen.insert(row.clone()));
        before - self.rows.len()
    }

    /// Missing cells per column, in column order
    pub fn missing_counts(&self) -> Vec<(String, usize)> {
        self.columns
            .iter()
            .enumerate()
            .map(|(j, name)| {
                let count = self.rows.iter().filter(|row| row[j].is_none()).count();
                (name.clone(), count)
            })
            .collect()
    }

    /// Run the full cleaning sequence: normalize names, mark missing
    /// cells, drop incomplete rows, drop duplicates
    pub fn clean<S: AsRef<str>>(&mut self, markers: &[S]) -> CleaningSummary {
        let rows_loaded = self.len();

        self.normalize_column_names();
        let missing_cells = self.mark_missing(markers);
        let missing_by_column: Vec<ColumnMissing> = self
            .missing_counts()
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(column, missing)| ColumnMissing { column, missing })
            .collect();
        for entry in &missing_by_column {
            debug!("Column {} has {} missing cells", entry.column, entry.missing);
        }

        let incomplete_rows_dropped = self.drop_missing();
        let duplicates_dropped = self.drop_duplicates();

        info!(
            "Cleaning: {} rows loaded, {} incomplete rows dropped, {} duplicates dropped, {} rows remain",
            rows_loaded,
            incomplete_rows_dropped,
            duplicates_dropped,
            self.len()
        );

        CleaningSummary {
            rows_loaded,
            missing_cells,
            incomplete_rows_dropped,
            duplicates_dropped,
            rows_remaining: self.len(),
            missing_by_column,
        }
    }
}

/// Missing cell count of one column before rows were dropped
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMissing {
    pub column: String,
    pub missing: usize,
}

/// Row and cell counts recorded by `RawTable::clean`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleaningSummary {
    pub rows_loaded: usize,
    pub missing_cells: usize,
    pub incomplete_rows_dropped: usize,
    pub duplicates_dropped: usize,
    pub rows_remaining: usize,
    pub missing_by_column: Vec<ColumnMissing>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "Age,Smokes (years),Dx:Cancer,Biopsy\n\
                          18,0,0,0\n\
                          35,?,0,1\n\
                          27,3.5,,0\n\
                          18,0,0,0\n\
                          44,12,1,1\n";

    fn sample_table() -> RawTable {
        RawTable::from_reader(Cursor::new(SAMPLE)).expect("valid csv")
    }

    #[test]
    fn test_from_reader_keeps_text_cells() {
        let table = sample_table();
        assert_eq!(table.len(), 5);
        assert_eq!(table.n_columns(), 4);
        assert_eq!(table.rows()[1][1].as_deref(), Some("?"));
        assert_eq!(table.rows()[2][2].as_deref(), Some(""));
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let data = "a,b\n1,2\n3\n";
        let result = RawTable::from_reader(Cursor::new(data));
        assert!(matches!(result, Err(PipelineError::CsvError(_))));
    }

    #[test]
    fn test_new_rejects_width_mismatch() {
        let result = RawTable::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![Some("1".to_string())]],
        );
        assert!(matches!(
            result,
            Err(PipelineError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_normalize_column_names() {
        let mut table = sample_table();
        table.normalize_column_names();
        assert_eq!(
            table.columns(),
            &["age", "smokes_(years)", "dx:cancer", "biopsy"]
        );
        assert_eq!(table.column_index("dx:cancer"), Some(2));
    }

    #[test]
    fn test_mark_and_drop_missing() {
        let mut table = sample_table();
        let marked = table.mark_missing(&DEFAULT_MISSING_MARKERS);
        assert_eq!(marked, 2);

        let counts = table.missing_counts();
        assert_eq!(counts[1].1, 1);
        assert_eq!(counts[2].1, 1);

        let dropped = table.drop_missing();
        assert_eq!(dropped, 2);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_drop_duplicates_keeps_first() {
        let mut table = sample_table();
        let dropped = table.drop_duplicates();
        assert_eq!(dropped, 1);
        assert_eq!(table.len(), 4);
        assert_eq!(table.rows()[0][0].as_deref(), Some("18"));
        assert_eq!(table.rows()[3][0].as_deref(), Some("44"));
    }

    #[test]
    fn test_clean_leaves_no_markers_or_duplicates() {
        let mut table = sample_table();
        let summary = table.clean(&DEFAULT_MISSING_MARKERS);

        assert_eq!(summary.rows_loaded, 5);
        assert_eq!(summary.missing_cells, 2);
        assert_eq!(summary.incomplete_rows_dropped, 2);
        assert_eq!(summary.duplicates_dropped, 1);
        assert_eq!(summary.rows_remaining, 2);
        assert_eq!(summary.missing_by_column.len(), 2);

        let mut seen = HashSet::new();
        for row in table.rows() {
            for cell in row {
                let value = cell.as_deref().expect("no missing cells after cleaning");
                assert!(!DEFAULT_MISSING_MARKERS.contains(&value));
            }
            assert!(seen.insert(row.clone()), "duplicate row survived cleaning");
        }
    }

    #[test]
    fn test_custom_markers() {
        let mut table = RawTable::from_reader(Cursor::new("a,b\nNA,1\n2,3\n")).unwrap();
        assert_eq!(table.mark_missing(&["NA"]), 1);
        assert_eq!(table.drop_missing(), 1);
    }
}
