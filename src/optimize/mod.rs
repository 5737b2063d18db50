//! Budget-constrained retention targeting.
//!
//! For every customer:
//!
//! ```text
//! expected_revenue = MonthlyCharges × 12
//! expected_profit  = churn_prob × retention_rate × expected_revenue − discount
//! ```
//!
//! Customers are ranked by expected profit (stable, so ties keep table order)
//! and the first `floor(budget / discount)` are selected.

use tracing::{debug, info};

use crate::domain::{BusinessParams, CustomerScored, EncodedTable, SelectionPolicy, TargetingSelection};
use crate::error::AppError;
use crate::models::ModelArtifact;

/// Field the annual revenue estimate is derived from.
pub const REVENUE_FIELD: &str = "MonthlyCharges";
pub const REVENUE_MONTHS: f64 = 12.0;

pub fn expected_revenue(monthly_charges: f64) -> f64 {
    monthly_charges * REVENUE_MONTHS
}

pub fn expected_profit(churn_prob: f64, expected_revenue: f64, params: &BusinessParams) -> f64 {
    churn_prob * params.retention_rate * expected_revenue - params.discount
}

/// Score every customer of `table` with `artifact`.
pub fn score_customers(
    table: &EncodedTable,
    artifact: &ModelArtifact,
    params: &BusinessParams,
) -> Result<Vec<CustomerScored>, AppError> {
    let revenue_idx = table.column_index(REVENUE_FIELD).ok_or_else(|| {
        AppError::data(format!("Missing required column: `{REVENUE_FIELD}`"))
    })?;
    let probs = artifact.predict_proba_table(table)?;

    Ok(table
        .rows
        .iter()
        .zip(probs)
        .enumerate()
        .map(|(row_index, (row, churn_prob))| {
            let revenue = expected_revenue(row[revenue_idx]);
            CustomerScored {
                row_index,
                values: row.clone(),
                churn_prob,
                expected_revenue: revenue,
                expected_profit: expected_profit(churn_prob, revenue, params),
            }
        })
        .collect())
}

/// Rank scored customers and apply the budget and the policy.
pub fn select_targets(
    columns: Vec<String>,
    mut scored: Vec<CustomerScored>,
    params: &BusinessParams,
    policy: SelectionPolicy,
) -> TargetingSelection {
    let pool_size = scored.len();
    let max_customers = params.max_customers();

    scored.sort_by(|a, b| b.expected_profit.total_cmp(&a.expected_profit));
    scored.truncate(max_customers);
    if policy == SelectionPolicy::ProfitableOnly {
        scored.retain(|c| c.expected_profit > 0.0);
    }

    debug!(pool_size, max_customers, selected = scored.len(), ?policy, "targets selected");

    TargetingSelection {
        columns,
        customers: scored,
        pool_size,
        max_customers,
    }
}

/// Score, rank and select in one step.
pub fn optimize(
    table: &EncodedTable,
    artifact: &ModelArtifact,
    params: &BusinessParams,
    policy: SelectionPolicy,
) -> Result<TargetingSelection, AppError> {
    params.validate()?;
    let scored = score_customers(table, artifact, params)?;
    let selection = select_targets(table.columns.clone(), scored, params, policy);
    info!(
        selected = selection.customers.len(),
        total_profit = selection.total_expected_profit(),
        "targeting complete"
    );
    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeatureSchema, SCHEMA_VERSION};
    use crate::models::{Classifier, LogisticRegression, Pipeline};

    fn scored(row_index: usize, profit: f64) -> CustomerScored {
        CustomerScored {
            row_index,
            values: vec![row_index as f64],
            churn_prob: 0.5,
            expected_revenue: 100.0,
            expected_profit: profit,
        }
    }

    /// Probability rises with monthly charges only.
    fn artifact() -> ModelArtifact {
        let columns = vec!["tenure".to_string(), "MonthlyCharges".to_string()];
        ModelArtifact::new(
            FeatureSchema {
                version: SCHEMA_VERSION,
                label: "Churn".into(),
                numeric: columns.clone(),
                columns,
                categorical: Vec::new(),
            },
            Pipeline {
                scaler: None,
                classifier: Classifier::Logistic(LogisticRegression {
                    intercept: -3.0,
                    coefficients: vec![0.0, 0.05],
                }),
            },
        )
    }

    fn table(n: usize) -> EncodedTable {
        EncodedTable {
            columns: vec!["tenure".into(), "MonthlyCharges".into(), "Churn".into()],
            label: "Churn".into(),
            rows: (0..n)
                .map(|i| vec![(i % 24) as f64, 20.0 + (i * 37 % 90) as f64, (i % 2) as f64])
                .collect(),
        }
    }

    #[test]
    fn profit_formula_matches_worked_example() {
        let params = BusinessParams::default();
        let revenue = expected_revenue(95.0);
        assert_eq!(revenue, 1140.0);
        assert!((expected_profit(0.8, revenue, &params) - 314.8).abs() < 1e-9);
    }

    #[test]
    fn budget_caps_selection_at_two_hundred() {
        let params = BusinessParams::default();
        let selection = optimize(&table(500), &artifact(), &params, SelectionPolicy::All).unwrap();
        assert_eq!(selection.customers.len(), 200);
        assert_eq!(selection.pool_size, 500);

        let small = optimize(&table(30), &artifact(), &params, SelectionPolicy::All).unwrap();
        assert_eq!(small.customers.len(), 30);
    }

    #[test]
    fn ranking_is_descending_and_stable_on_ties() {
        let params = BusinessParams {
            budget: 200.0,
            ..BusinessParams::default()
        };
        let input = vec![scored(0, 5.0), scored(1, 9.0), scored(2, 5.0), scored(3, -1.0), scored(4, 9.0)];
        let selection = select_targets(vec!["x".into()], input, &params, SelectionPolicy::All);
        let order: Vec<usize> = selection.customers.iter().map(|c| c.row_index).collect();
        assert_eq!(order, vec![1, 4, 0, 2]);
    }

    #[test]
    fn profitable_only_drops_losses() {
        let params = BusinessParams::default();
        let input = vec![scored(0, 5.0), scored(1, -3.0), scored(2, 0.0)];
        let all = select_targets(vec!["x".into()], input.clone(), &params, SelectionPolicy::All);
        assert_eq!(all.customers.len(), 3);
        let profitable = select_targets(vec!["x".into()], input, &params, SelectionPolicy::ProfitableOnly);
        assert_eq!(profitable.customers.len(), 1);
    }

    #[test]
    fn missing_revenue_field_and_bad_params_fail() {
        let mut t = table(5);
        t.columns[1] = "Charges".into();
        let err = score_customers(&t, &artifact(), &BusinessParams::default()).unwrap_err();
        assert!(matches!(err, AppError::Data(_)));

        let bad = BusinessParams {
            discount: 0.0,
            ..BusinessParams::default()
        };
        let err = optimize(&table(5), &artifact(), &bad, SelectionPolicy::All).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn repeated_runs_are_identical() {
        let params = BusinessParams::default();
        let a = optimize(&table(300), &artifact(), &params, SelectionPolicy::All).unwrap();
        let b = optimize(&table(300), &artifact(), &params, SelectionPolicy::All).unwrap();
        assert_eq!(a.customers, b.customers);
    }
}
