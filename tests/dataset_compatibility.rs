//! Dataset compatibility and format validation tests
//!
//! Tests for the CSV layouts the loader and cleaning stage must accept

use biopsy_svm::{Dataset, LabeledData, PipelineError, RawTable, DEFAULT_FEATURES};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".csv").expect("Failed to create temp file");
    write!(file, "{contents}").expect("Failed to write");
    file.flush().expect("Failed to flush");
    file
}

/// Test CSV format variations
#[test]
fn test_csv_format_variations() {
    let test_cases = vec![
        ("Age,Dx,Biopsy\n30,0,1\n41,1,0\n", "basic format"),
        ("Age,Dx,Biopsy\r\n30,0,1\r\n41,1,0\r\n", "CRLF line endings"),
        ("\"Age\",\"Dx\",\"Biopsy\"\n\"30\",\"0\",\"1\"\n41,1,0\n", "quoted cells"),
        ("Age,Dx,Biopsy\n30.0,0.0,1\n41.5,1,0\n", "decimal features"),
        ("Age,Dx,Biopsy\n30,0,1\n41,1,0", "no trailing newline"),
    ];

    for (data, description) in test_cases {
        let file = write_file(data);
        let mut table = RawTable::from_file(file.path())
            .unwrap_or_else(|e| panic!("Failed to load CSV ({description}): {e}"));
        table.clean(&["?", ""]);

        let dataset = LabeledData::from_table(&table, &["age", "dx"], "biopsy")
            .unwrap_or_else(|e| panic!("Failed to select features ({description}): {e}"));

        assert_eq!(dataset.len(), 2, "row count: {description}");
        assert_eq!(dataset.dim(), 2, "feature count: {description}");
        assert_eq!(dataset.labels(), &[1, 0], "labels: {description}");
    }
}

/// Column names from the published risk-factor file normalize to the
/// names the default feature list uses
#[test]
fn test_risk_factor_header_normalization() {
    let header = "Age,Number of sexual partners,First sexual intercourse,Num of pregnancies,\
Smokes,Smokes (years),Smokes (packs/year),Hormonal Contraceptives,\
Hormonal Contraceptives (years),IUD,IUD (years),STDs,STDs (number),\
STDs: Number of diagnosis,STDs: Time since first diagnosis,\
STDs: Time since last diagnosis,Dx:Cancer,Dx:CIN,Dx:HPV,Dx,Hinselmann,Schiller,Citology,Biopsy";
    let n_columns = header.split(',').count();
    let row = vec!["0"; n_columns].join(",");
    let file = write_file(&format!("{header}\n{row}\n"));

    let mut table = RawTable::from_file(file.path()).unwrap();
    table.normalize_column_names();

    for feature in DEFAULT_FEATURES {
        assert!(
            table.column_index(feature).is_some(),
            "column {feature} not found after normalization"
        );
    }
    assert!(table.column_index("smokes_(packs/year)").is_some());
    assert!(table.column_index("biopsy").is_some());
}

/// Markers are matched on the whole cell, not as substrings
#[test]
fn test_missing_markers_match_whole_cells() {
    let file = write_file("a,b,biopsy\n1?,2,0\n?,3,1\n4, ,0\n");
    let mut table = RawTable::from_file(file.path()).unwrap();
    let summary = table.clean(&["?", ""]);

    assert_eq!(summary.missing_cells, 1);
    assert_eq!(summary.rows_remaining, 2);
}

/// Dropping incomplete rows considers every column, not only features
#[test]
fn test_incomplete_unused_column_drops_row() {
    let file = write_file("age,notes,biopsy\n30,?,1\n41,x,0\n52,y,1\n");
    let mut table = RawTable::from_file(file.path()).unwrap();
    table.clean(&["?", ""]);

    let dataset = LabeledData::from_table(&table, &["age"], "biopsy").unwrap();
    assert_eq!(dataset.features(), &[vec![41.0], vec![52.0]]);
}

#[test]
fn test_malformed_files() {
    // Ragged row
    let file = write_file("a,b,biopsy\n1,2,0\n3,1\n");
    assert!(matches!(
        RawTable::from_file(file.path()),
        Err(PipelineError::CsvError(_))
    ));

    // Header only
    let file = write_file("a,biopsy\n");
    let table = RawTable::from_file(file.path()).unwrap();
    assert!(table.is_empty());
    assert!(matches!(
        LabeledData::from_table(&table, &["a"], "biopsy"),
        Err(PipelineError::EmptyDataset(_))
    ));

    // Non-numeric feature survives cleaning but fails selection
    let file = write_file("a,biopsy\nhigh,0\n");
    let table = RawTable::from_file(file.path()).unwrap();
    assert!(matches!(
        LabeledData::from_table(&table, &["a"], "biopsy"),
        Err(PipelineError::ParseError(_))
    ));
}
