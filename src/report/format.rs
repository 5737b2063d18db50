//! Human-readable stage summaries for stdout.

use std::path::Path;

use crate::domain::{RowError, TargetingSelection};
use crate::explain::ExplanationSummary;
use crate::features::Encoding;
use crate::fit::TrainReport;
use crate::models::Prediction;
use crate::report::DatasetSnapshot;

/// Row errors shown before the rest are summarized as a count.
const MAX_ROW_ERRORS_SHOWN: usize = 10;

pub fn format_preprocess_summary(encoding: &Encoding, output: &Path) -> String {
    let snap = DatasetSnapshot::from_table(&encoding.table);
    let mut out = String::new();

    out.push_str("=== churn preprocess ===\n");
    out.push_str(&format!(
        "Rows: read={} kept={} dropped={}\n",
        encoding.rows_read,
        snap.rows,
        encoding.row_errors.len()
    ));
    out.push_str(&format!(
        "Features: {} ({} numeric, {} categorical fields one-hot encoded)\n",
        snap.features,
        encoding.schema.numeric.len(),
        encoding.schema.categorical.len()
    ));
    if let Some(rate) = snap.churn_rate {
        out.push_str(&format!("Churn rate: {}\n", fmt_pct(rate)));
    }
    if !encoding.row_errors.is_empty() {
        out.push('\n');
        out.push_str(&format_row_errors(&encoding.row_errors));
    }
    out.push_str(&format!("Saved to {}\n", output.display()));
    out
}

pub fn format_row_errors(errors: &[RowError]) -> String {
    let mut out = String::from("Dropped rows:\n");
    for e in errors.iter().take(MAX_ROW_ERRORS_SHOWN) {
        let id = e.id.as_deref().unwrap_or("-");
        out.push_str(&format!("  line {:>6}  {:<12} {}\n", e.line, truncate(id, 12), e.message));
    }
    if errors.len() > MAX_ROW_ERRORS_SHOWN {
        out.push_str(&format!("  ... and {} more\n", errors.len() - MAX_ROW_ERRORS_SHOWN));
    }
    out
}

pub fn format_train_summary(report: &TrainReport, models_dir: &Path) -> String {
    let mut out = String::new();

    out.push_str("=== churn train ===\n");
    out.push_str(&format!(
        "Rows: {} (train={} test={}) | features={} | churn rate={} | seed={}\n",
        report.n_rows,
        report.n_train,
        report.n_test,
        report.n_features,
        fmt_pct(report.positive_rate),
        report.seed
    ));

    for m in &report.variants {
        out.push('\n');
        out.push_str(&format!("--- {} ---\n", m.variant.display_name()));
        out.push_str(&format!("ROC-AUC: {:.4}\n", m.roc_auc));
        out.push_str(&format!("F1 (churn): {:.4}\n", m.f1));
        out.push_str(&format!("Recall (churn): {:.4}\n", m.recall));
        out.push('\n');
        out.push_str(&m.report.render());
    }

    out.push_str(&format!("\nModels saved to {}\n", models_dir.display()));
    out
}

pub fn format_explain_summary(summary: &ExplanationSummary, top_n: usize, png: Option<&Path>, json: &Path) -> String {
    let mut out = String::new();

    out.push_str("=== churn explain ===\n");
    out.push_str(&format!(
        "Model: {} | rows={} | units={} | base={:.4}\n\n",
        summary.variant.display_name(),
        summary.n_rows,
        summary.units.label(),
        summary.base_value
    ));

    out.push_str(
        format!("{:<4} {:<40} {:>10} {:>10}  {}\n", "#", "feature", "mean|phi|", "mean phi", "effect").trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<4} {:-<40} {:->10} {:->10}  {:-<6}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    for (i, f) in summary.top(top_n).iter().enumerate() {
        let effect = match f.direction {
            crate::explain::Direction::HigherRaisesRisk => "higher → more churn",
            crate::explain::Direction::HigherLowersRisk => "higher → less churn",
            crate::explain::Direction::Mixed => "mixed",
        };
        out.push_str(
            format!(
                "{:<4} {:<40} {:>10.4} {:>10.4}  {}\n",
                i + 1,
                truncate(&f.feature, 40),
                f.mean_abs,
                f.mean_signed,
                effect
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out.push('\n');
    if let Some(png) = png {
        out.push_str(&format!("Saved plot to {}\n", png.display()));
    }
    out.push_str(&format!("Saved summary to {}\n", json.display()));
    out
}

pub fn format_optimize_summary(selection: &TargetingSelection, output: &Path) -> String {
    let mut out = String::new();
    out.push_str(&format!("Targeted customers: {}\n", selection.customers.len()));
    out.push_str(&format!(
        "Expected total profit: ${:.2}\n",
        selection.total_expected_profit()
    ));
    out.push_str(&format!("Saved to {}\n", output.display()));
    out
}

/// Compact table of the best `n` targets.
pub fn format_targets_table(selection: &TargetingSelection, n: usize) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>6} {:>10} {:>10} {:>12} {:>12}\n",
            "row", "churn_prob", "monthly", "revenue", "profit"
        )
        .trim_end(),
    );
    out.push('\n');

    let monthly_idx = selection
        .columns
        .iter()
        .position(|c| c == crate::optimize::REVENUE_FIELD);
    for c in selection.customers.iter().take(n) {
        let monthly = monthly_idx.map(|j| c.values[j]).unwrap_or(f64::NAN);
        out.push_str(&format!(
            "{:>6} {:>10.4} {:>10.2} {:>12.2} {:>12.2}\n",
            c.row_index, c.churn_prob, monthly, c.expected_revenue, c.expected_profit
        ));
    }
    out
}

pub fn format_prediction(prediction: &Prediction) -> String {
    let mut out = String::new();
    out.push_str(&format!("Churn Probability: {}\n", fmt_pct(prediction.churn_prob)));
    out.push_str(&format!(
        "{}: {}\n",
        prediction.band.label(),
        prediction.band.action()
    ));
    if !prediction.ignored.is_empty() {
        out.push_str(&format!("Ignored fields: {}\n", prediction.ignored.join(", ")));
    }
    out
}

pub fn fmt_pct(p: f64) -> String {
    format!("{:.2}%", p * 100.0)
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
