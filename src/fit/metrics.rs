//! Held-out evaluation metrics for binary classifiers.

use serde::{Deserialize, Serialize};

/// Precision/recall/F1/support for one class (or an average).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub negative: ClassScores,
    pub positive: ClassScores,
    pub accuracy: f64,
    pub macro_avg: ClassScores,
    pub weighted_avg: ClassScores,
}

/// Area under the ROC curve via the rank-sum statistic; tied scores count ½.
///
/// `None` when only one class is present.
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> Option<f64> {
    let n = labels.len().min(scores.len());
    let n_pos = labels[..n].iter().filter(|&&y| y == 1).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // Average ranks (1-based) over runs of equal scores.
    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            ranks[k] = avg;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = (0..n).filter(|&k| labels[k] == 1).map(|k| ranks[k]).sum();
    let u = pos_rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0;
    Some(u / (n_pos as f64 * n_neg as f64))
}

/// Hard predictions at `threshold` (`p >= threshold → 1`).
pub fn threshold_predictions(scores: &[f64], threshold: f64) -> Vec<u8> {
    scores.iter().map(|&p| u8::from(p >= threshold)).collect()
}

fn class_scores(labels: &[u8], predicted: &[u8], class: u8) -> ClassScores {
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut fn_ = 0usize;
    for (&y, &p) in labels.iter().zip(predicted) {
        match (y == class, p == class) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }
    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    ClassScores {
        precision,
        recall,
        f1,
        support: tp + fn_,
    }
}

pub fn recall(labels: &[u8], predicted: &[u8]) -> f64 {
    class_scores(labels, predicted, 1).recall
}

pub fn f1_score(labels: &[u8], predicted: &[u8]) -> f64 {
    class_scores(labels, predicted, 1).f1
}

pub fn classification_report(labels: &[u8], predicted: &[u8]) -> ClassificationReport {
    let negative = class_scores(labels, predicted, 0);
    let positive = class_scores(labels, predicted, 1);
    let total = negative.support + positive.support;

    let correct = labels.iter().zip(predicted).filter(|(y, p)| y == p).count();
    let accuracy = if total == 0 { 0.0 } else { correct as f64 / total as f64 };

    let macro_avg = ClassScores {
        precision: (negative.precision + positive.precision) / 2.0,
        recall: (negative.recall + positive.recall) / 2.0,
        f1: (negative.f1 + positive.f1) / 2.0,
        support: total,
    };
    let w = |a: f64, b: f64| {
        if total == 0 {
            0.0
        } else {
            (a * negative.support as f64 + b * positive.support as f64) / total as f64
        }
    };
    let weighted_avg = ClassScores {
        precision: w(negative.precision, positive.precision),
        recall: w(negative.recall, positive.recall),
        f1: w(negative.f1, positive.f1),
        support: total,
    };

    ClassificationReport {
        negative,
        positive,
        accuracy,
        macro_avg,
        weighted_avg,
    }
}

impl ClassificationReport {
    /// Plain-text table in the usual precision/recall/f1/support layout.
    pub fn render(&self) -> String {
        let row = |name: &str, s: &ClassScores| {
            format!(
                "{name:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}\n",
                s.precision, s.recall, s.f1, s.support
            )
        };
        let mut out = String::new();
        out.push_str(&format!(
            "{:>12} {:>9} {:>9} {:>9} {:>9}\n\n",
            "", "precision", "recall", "f1-score", "support"
        ));
        out.push_str(&row("0", &self.negative));
        out.push_str(&row("1", &self.positive));
        out.push('\n');
        out.push_str(&format!(
            "{:>12} {:>9} {:>9} {:>9.2} {:>9}\n",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        ));
        out.push_str(&row("macro avg", &self.macro_avg));
        out.push_str(&row("weighted avg", &self.weighted_avg));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auc_perfect_inverse_and_ties() {
        let y = [0, 0, 1, 1];
        assert_eq!(roc_auc(&y, &[0.1, 0.2, 0.8, 0.9]), Some(1.0));
        assert_eq!(roc_auc(&y, &[0.9, 0.8, 0.2, 0.1]), Some(0.0));
        assert_eq!(roc_auc(&y, &[0.5, 0.5, 0.5, 0.5]), Some(0.5));
        // One positive tied with one negative: 3 wins + ½.
        assert_eq!(roc_auc(&y, &[0.1, 0.6, 0.6, 0.9]), Some(0.875));
        assert_eq!(roc_auc(&[1, 1], &[0.1, 0.2]), None);
    }

    #[test]
    fn f1_and_recall_on_positive_class() {
        let y = [1, 1, 1, 0, 0];
        let p = [1, 1, 0, 1, 0];
        assert!((recall(&y, &p) - 2.0 / 3.0).abs() < 1e-12);
        // precision 2/3, recall 2/3
        assert!((f1_score(&y, &p) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn report_accuracy_and_supports() {
        let y = [1, 1, 1, 0, 0];
        let p = [1, 1, 0, 1, 0];
        let report = classification_report(&y, &p);
        assert_eq!(report.positive.support, 3);
        assert_eq!(report.negative.support, 2);
        assert!((report.accuracy - 0.6).abs() < 1e-12);
        let text = report.render();
        assert!(text.contains("weighted avg"));
        assert!(text.contains("precision"));
    }

    #[test]
    fn degenerate_predictions_give_zero_not_nan() {
        let y = [1, 0];
        let p = [0, 0];
        let report = classification_report(&y, &p);
        assert_eq!(report.positive.precision, 0.0);
        assert_eq!(report.positive.f1, 0.0);
    }
}
