//! Feature matrix and label vector selected from a cleaned table

use crate::core::{Dataset, PipelineError, Result, Sample};
use crate::data::RawTable;
use log::debug;

/// Dense feature rows of the selected columns with a 0/1 label per row
///
/// NaN marks a feature gap that has not been imputed yet.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledData {
    feature_names: Vec<String>,
    features: Vec<Vec<f64>>,
    labels: Vec<u8>,
}

impl LabeledData {
    pub fn new(feature_names: Vec<String>, features: Vec<Vec<f64>>, labels: Vec<u8>) -> Result<Self> {
        if features.len() != labels.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: labels.len(),
                actual: features.len(),
            });
        }
        if let Some(row) = features.iter().find(|row| row.len() != feature_names.len()) {
            return Err(PipelineError::DimensionMismatch {
                expected: feature_names.len(),
                actual: row.len(),
            });
        }
        if let Some(&label) = labels.iter().find(|&&label| label > 1) {
            return Err(PipelineError::InvalidLabel(format!(
                "expected 0 or 1, got {label}"
            )));
        }

        Ok(Self {
            feature_names,
            features,
            labels,
        })
    }

    /// Select `features` and `label` from a cleaned table
    ///
    /// Missing feature cells become NaN; labels are coerced to integers
    /// and must be 0 or 1.
    pub fn from_table<S: AsRef<str>>(table: &RawTable, features: &[S], label: &str) -> Result<Self> {
        if table.is_empty() {
            return Err(PipelineError::EmptyDataset(
                "no rows left after cleaning".to_string(),
            ));
        }

        let feature_columns = features
            .iter()
            .map(|name| {
                table
                    .column_index(name.as_ref())
                    .ok_or_else(|| PipelineError::MissingColumn(name.as_ref().to_string()))
            })
            .collect::<Result<Vec<usize>>>()?;
        let label_column = table
            .column_index(label)
            .ok_or_else(|| PipelineError::MissingColumn(label.to_string()))?;

        let mut matrix = Vec::with_capacity(table.len());
        let mut labels = Vec::with_capacity(table.len());

        for (row_idx, row) in table.rows().iter().enumerate() {
            let line = row_idx + 1;

            let values = features
                .iter()
                .zip(&feature_columns)
                .map(|(name, &col)| match row[col].as_deref() {
                    None => Ok(f64::NAN),
                    Some(cell) => cell.trim().parse::<f64>().map_err(|_| {
                        PipelineError::ParseError(format!(
                            "column '{}', row {}: '{}' is not numeric",
                            name.as_ref(),
                            line,
                            cell
                        ))
                    }),
                })
                .collect::<Result<Vec<f64>>>()?;

            matrix.push(values);
            labels.push(parse_label(row[label_column].as_deref(), line)?);
        }

        let feature_names = features.iter().map(|f| f.as_ref().to_string()).collect();
        let data = Self::new(feature_names, matrix, labels)?;
        let (negatives, positives) = data.class_counts();
        debug!(
            "Selected {} features for {} rows ({} positive, {} negative)",
            data.n_features(),
            data.len(),
            positives,
            negatives
        );
        Ok(data)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Rows at `indices`, in that order
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// Same labels with a transformed feature matrix
    pub fn with_features(&self, features: Vec<Vec<f64>>) -> Result<Self> {
        Self::new(self.feature_names.clone(), features, self.labels.clone())
    }

    /// (negatives, positives)
    pub fn class_counts(&self) -> (usize, usize) {
        let positives = self.labels.iter().filter(|&&l| l == 1).count();
        (self.labels.len() - positives, positives)
    }

    /// Solver samples with labels mapped to {-1, +1}
    pub fn samples(&self) -> Vec<Sample> {
        (0..self.len()).map(|i| self.get_sample(i)).collect()
    }
}

impl Dataset for LabeledData {
    fn len(&self) -> usize {
        self.labels.len()
    }

    fn dim(&self) -> usize {
        self.n_features()
    }

    fn get_sample(&self, i: usize) -> Sample {
        Sample::from_class(self.features[i].clone(), self.labels[i])
    }

    fn get_labels(&self) -> Vec<f64> {
        self.labels
            .iter()
            .map(|&l| if l == 1 { 1.0 } else { -1.0 })
            .collect()
    }
}

fn parse_label(cell: Option<&str>, line: usize) -> Result<u8> {
    let cell = cell.ok_or_else(|| PipelineError::InvalidLabel(format!("row {line}: missing label")))?;
    let value = cell.trim().parse::<i64>().map_err(|_| {
        PipelineError::InvalidLabel(format!("row {line}: cannot convert '{cell}' to integer"))
    })?;
    match value {
        0 => Ok(0),
        1 => Ok(1),
        other => Err(PipelineError::InvalidLabel(format!(
            "row {line}: expected 0 or 1, got {other}"
        ))),
    }
}
