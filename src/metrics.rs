//! Evaluation metrics for binary classification
//!
//! Labels use the dataset's 0/1 encoding with 1 as the positive class.

use crate::core::{PipelineError, Result};
use serde::Serialize;
use std::fmt;

/// Area under the ROC curve from scores where larger means "more positive"
///
/// Computed from the Mann-Whitney rank statistic with average ranks for
/// tied scores. Requires both classes to be present.
pub fn roc_auc_score(labels: &[u8], scores: &[f64]) -> Result<f64> {
    if labels.len() != scores.len() {
        return Err(PipelineError::DimensionMismatch {
            expected: labels.len(),
            actual: scores.len(),
        });
    }

    let n_pos = labels.iter().filter(|&&l| l == 1).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(PipelineError::UndefinedMetric(
            "ROC AUC needs both classes in the labels".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // 1-based ranks, ties share the average rank of their run
    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        let average_rank = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = average_rank;
        }
        start = end;
    }

    let positive_rank_sum: f64 = labels
        .iter()
        .zip(&ranks)
        .filter(|(&l, _)| l == 1)
        .map(|(_, &r)| r)
        .sum();

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Ok((positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Confusion counts with the derived threshold metrics
///
/// Metrics with a zero denominator evaluate to 0.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EvaluationMetrics {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl EvaluationMetrics {
    pub fn new(tp: usize, tn: usize, fp: usize, fn_: usize) -> Self {
        Self {
            true_positives: tp,
            true_negatives: tn,
            false_positives: fp,
            false_negatives: fn_,
        }
    }

    /// Tally predictions against the true labels
    pub fn from_predictions(labels: &[u8], predictions: &[u8]) -> Result<Self> {
        if labels.len() != predictions.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: labels.len(),
                actual: predictions.len(),
            });
        }

        let mut metrics = Self::new(0, 0, 0, 0);
        for (&actual, &predicted) in labels.iter().zip(predictions) {
            match (predicted == 1, actual == 1) {
                (true, true) => metrics.true_positives += 1,
                (false, false) => metrics.true_negatives += 1,
                (true, false) => metrics.false_positives += 1,
                (false, true) => metrics.false_negatives += 1,
            }
        }
        Ok(metrics)
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    /// (TP + TN) / total
    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    /// TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1_score(&self) -> f64 {
        f1(self.precision(), self.recall())
    }

    /// TN / (TN + FP), the recall of the negative class
    pub fn specificity(&self) -> f64 {
        ratio(self.true_negatives, self.true_negatives + self.false_positives)
    }

    /// TN / (TN + FN)
    pub fn negative_predictive_value(&self) -> f64 {
        ratio(self.true_negatives, self.true_negatives + self.false_negatives)
    }

    /// Mean of per-class recall over the classes present in the labels
    pub fn balanced_accuracy(&self) -> f64 {
        let mut recalls = Vec::with_capacity(2);
        if self.true_positives + self.false_negatives > 0 {
            recalls.push(self.recall());
        }
        if self.true_negatives + self.false_positives > 0 {
            recalls.push(self.specificity());
        }
        if recalls.is_empty() {
            0.0
        } else {
            recalls.iter().sum::<f64>() / recalls.len() as f64
        }
    }

    pub fn report(&self) -> ClassificationReport {
        ClassificationReport::from_metrics(self)
    }
}

/// Precision, recall, F1 and support of one class (or one average)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Per-class and averaged scores in the layout of a classification report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    /// Scores for class 0 and class 1
    pub classes: [ClassScores; 2],
    pub accuracy: f64,
    pub macro_avg: ClassScores,
    pub weighted_avg: ClassScores,
}

impl ClassificationReport {
    pub fn from_metrics(m: &EvaluationMetrics) -> Self {
        let negative = ClassScores {
            precision: m.negative_predictive_value(),
            recall: m.specificity(),
            f1_score: f1(m.negative_predictive_value(), m.specificity()),
            support: m.true_negatives + m.false_positives,
        };
        let positive = ClassScores {
            precision: m.precision(),
            recall: m.recall(),
            f1_score: m.f1_score(),
            support: m.true_positives + m.false_negatives,
        };
        let classes = [negative, positive];
        let total = m.total();

        let macro_avg = ClassScores {
            precision: (negative.precision + positive.precision) / 2.0,
            recall: (negative.recall + positive.recall) / 2.0,
            f1_score: (negative.f1_score + positive.f1_score) / 2.0,
            support: total,
        };

        let weighted = |pick: fn(&ClassScores) -> f64| -> f64 {
            if total == 0 {
                return 0.0;
            }
            classes
                .iter()
                .map(|c| pick(c) * c.support as f64)
                .sum::<f64>()
                / total as f64
        };
        let weighted_avg = ClassScores {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1_score: weighted(|c| c.f1_score),
            support: total,
        };

        Self {
            classes,
            accuracy: m.accuracy(),
            macro_avg,
            weighted_avg,
        }
    }
}

const NAME_WIDTH: usize = 12;

fn write_scores(f: &mut fmt::Formatter<'_>, name: &str, scores: &ClassScores) -> fmt::Result {
    writeln!(
        f,
        "{:>w$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
        name,
        scores.precision,
        scores.recall,
        scores.f1_score,
        scores.support,
        w = NAME_WIDTH
    )
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>w$}  {:>9} {:>9} {:>9} {:>9}",
            "",
            "precision",
            "recall",
            "f1-score",
            "support",
            w = NAME_WIDTH
        )?;
        writeln!(f)?;
        for (class, scores) in self.classes.iter().enumerate() {
            write_scores(f, &class.to_string(), scores)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>w$}  {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.macro_avg.support,
            w = NAME_WIDTH
        )?;
        write_scores(f, "macro avg", &self.macro_avg)?;
        write_scores(f, "weighted avg", &self.weighted_avg)
    }
}
