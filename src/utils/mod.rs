//! Preprocessing utilities: imputation, train/test splitting and scaling
//!
//! Every fitted transform here is fitted on the training partition only
//! and then applied unchanged to both partitions.

use crate::core::{PipelineError, Result};

fn check_width(row: &[f64], expected: usize) -> Result<()> {
    if row.len() != expected {
        return Err(PipelineError::DimensionMismatch {
            expected,
            actual: row.len(),
        });
    }
    Ok(())
}

/// Missing value imputation
pub mod imputation {
    use super::*;

    /// Replaces NaN feature values with the column median
    #[derive(Debug, Clone, PartialEq)]
    pub struct MedianImputer {
        medians: Vec<f64>,
    }

    impl MedianImputer {
        /// Compute per-column medians over the non-NaN values
        ///
        /// A column without any value gets a median of 0.0.
        pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
            let width = rows.first().map(|r| r.len()).ok_or_else(|| {
                PipelineError::EmptyDataset("cannot fit imputer on zero rows".to_string())
            })?;
            for row in rows {
                check_width(row, width)?;
            }

            let medians = (0..width)
                .map(|j| {
                    let mut values: Vec<f64> = rows
                        .iter()
                        .map(|row| row[j])
                        .filter(|v| !v.is_nan())
                        .collect();
                    median(&mut values).unwrap_or(0.0)
                })
                .collect();

            Ok(Self { medians })
        }

        pub fn medians(&self) -> &[f64] {
            &self.medians
        }

        pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
            rows.iter()
                .map(|row| {
                    check_width(row, self.medians.len())?;
                    Ok(row
                        .iter()
                        .zip(&self.medians)
                        .map(|(&v, &m)| if v.is_nan() { m } else { v })
                        .collect())
                })
                .collect()
        }

        /// Number of NaN cells `transform` would fill
        pub fn count_missing(rows: &[Vec<f64>]) -> usize {
            rows.iter().flatten().filter(|v| v.is_nan()).count()
        }
    }

    /// Median of the values; sorts in place
    pub fn median(values: &mut [f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.total_cmp(b));
        let mid = values.len() / 2;
        Some(if values.len() % 2 == 0 {
            (values[mid - 1] + values[mid]) / 2.0
        } else {
            values[mid]
        })
    }
}

/// Seeded train/test partitioning
pub mod split {
    use super::*;
    use log::info;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Row indices of the two partitions
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct TrainTestSplit {
        pub train: Vec<usize>,
        pub test: Vec<usize>,
    }

    /// Shuffle `0..n` with a seeded generator and cut off the test rows
    ///
    /// The test partition gets `ceil(test_size * n)` rows and the training
    /// partition the rest. Both must be non-empty.
    pub fn train_test_split(n: usize, test_size: f64, seed: u64) -> Result<TrainTestSplit> {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "test size must be in (0, 1), got: {test_size}"
            )));
        }

        let n_test = (test_size * n as f64).ceil() as usize;
        let n_train = n.saturating_sub(n_test);
        if n_test == 0 || n_train == 0 {
            return Err(PipelineError::InvalidParameter(format!(
                "test size {test_size} on {n} rows leaves an empty partition"
            )));
        }

        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let test = indices.split_off(n_train);
        info!(
            "Split {} rows with seed {}: train={}, test={}",
            n,
            seed,
            indices.len(),
            test.len()
        );

        Ok(TrainTestSplit {
            train: indices,
            test,
        })
    }
}

/// Feature scaling
pub mod scaling {
    use super::*;

    /// Standardizes features to zero mean and unit variance
    ///
    /// Uses the population standard deviation; a constant column gets a
    /// scale of 1.0 so it maps to zero instead of dividing by zero.
    #[derive(Debug, Clone, PartialEq)]
    pub struct StandardScaler {
        means: Vec<f64>,
        scales: Vec<f64>,
    }

    impl StandardScaler {
        pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
            let width = rows.first().map(|r| r.len()).ok_or_else(|| {
                PipelineError::EmptyDataset("cannot fit scaler on zero rows".to_string())
            })?;
            for row in rows {
                check_width(row, width)?;
            }

            let n = rows.len() as f64;
            let means: Vec<f64> = (0..width)
                .map(|j| rows.iter().map(|row| row[j]).sum::<f64>() / n)
                .collect();
            let scales = (0..width)
                .map(|j| {
                    let variance =
                        rows.iter().map(|row| (row[j] - means[j]).powi(2)).sum::<f64>() / n;
                    let std = variance.sqrt();
                    if std < 1e-12 {
                        1.0
                    } else {
                        std
                    }
                })
                .collect();

            Ok(Self { means, scales })
        }

        pub fn means(&self) -> &[f64] {
            &self.means
        }

        pub fn scales(&self) -> &[f64] {
            &self.scales
        }

        pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
            check_width(row, self.means.len())?;
            Ok(row
                .iter()
                .zip(self.means.iter().zip(&self.scales))
                .map(|(&x, (&mean, &scale))| (x - mean) / scale)
                .collect())
        }

        pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
            rows.iter().map(|row| self.transform_row(row)).collect()
        }
    }

    /// Fit on `rows` and transform them in one step
    pub fn fit_transform(rows: &[Vec<f64>]) -> Result<(Vec<Vec<f64>>, StandardScaler)> {
        let scaler = StandardScaler::fit(rows)?;
        let transformed = scaler.transform(rows)?;
        Ok((transformed, scaler))
    }
}
