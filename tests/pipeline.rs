//! End-to-end run of the batch stages on a synthetic customer export.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use churn_targeting::app::pipeline::{model_path, run_explain, run_optimize, run_predict, run_preprocess, run_train};
use churn_targeting::domain::{AlignMode, ArtifactPaths, BusinessParams, ModelVariant, SelectionPolicy};
use churn_targeting::fit::TrainOptions;
use churn_targeting::io::read_encoded_table;
use churn_targeting::models::ForestOptions;

const CONTRACTS: [&str; 3] = ["Month-to-month", "One year", "Two year"];
const INTERNET: [&str; 3] = ["DSL", "Fiber optic", "No"];
const PAYMENT: [&str; 3] = ["Bank transfer (automatic)", "Electronic check", "Mailed check"];

/// 400 customers; short-tenure monthly fiber customers churn most.
fn synthetic_export(path: &Path) {
    let mut rng = StdRng::seed_from_u64(7);
    let mut csv = String::from(
        "customerID,gender,tenure,Contract,InternetService,PaymentMethod,PaperlessBilling,MonthlyCharges,TotalCharges,Churn\n",
    );

    for i in 0..400 {
        // New customers have no TotalCharges yet; the first one always is.
        let tenure: u32 = if i == 0 { 0 } else { rng.gen_range(0..72) };
        let contract = CONTRACTS[rng.gen_range(0..3)];
        let internet = INTERNET[rng.gen_range(0..3)];
        let payment = PAYMENT[rng.gen_range(0..3)];
        let paperless = if rng.gen_range(0..2) == 0 { "Yes" } else { "No" };
        let gender = if i % 2 == 0 { "Female" } else { "Male" };
        let monthly = 20.0 + rng.gen_range(0..900) as f64 / 10.0;
        let total = if tenure == 0 { String::new() } else { format!("{:.2}", monthly * tenure as f64) };

        let mut risk: f64 = 0.05;
        if contract == "Month-to-month" {
            risk += 0.35;
        }
        if tenure < 12 {
            risk += 0.25;
        }
        if internet == "Fiber optic" {
            risk += 0.15;
        }
        let churn = if rng.gen_range(0.0..1.0) < risk { "Yes" } else { "No" };

        writeln!(
            csv,
            "C{i:04},{gender},{tenure},{contract},{internet},\"{payment}\",{paperless},{monthly:.2},{total},{churn}"
        )
        .unwrap();
    }
    fs::write(path, csv).unwrap();
}

fn small_train_options() -> TrainOptions {
    TrainOptions {
        forest: ForestOptions {
            n_trees: 15,
            max_depth: 5,
            ..ForestOptions::default()
        },
        ..TrainOptions::default()
    }
}

#[test]
fn stages_run_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths::rooted_at(dir.path());
    fs::create_dir_all(paths.raw.parent().unwrap()).unwrap();
    synthetic_export(&paths.raw);

    // preprocess
    let encoding = run_preprocess(&paths.raw, &paths.processed, &paths.schema).unwrap();
    assert!(paths.processed.exists());
    assert!(paths.schema.exists());
    assert!(!encoding.row_errors.is_empty(), "blank TotalCharges rows are dropped");
    assert_eq!(encoding.rows_read, 400);
    assert_eq!(encoding.table.n_rows() + encoding.row_errors.len(), 400);

    let encoded = read_encoded_table(&paths.processed, "Churn").unwrap();
    assert!(!encoded.columns.iter().any(|c| c == "customerID"));
    assert!(encoded.columns.iter().any(|c| c == "Contract_Two year"));
    assert!(!encoded.columns.iter().any(|c| c == "Contract_Month-to-month"));
    assert!(encoded.labels().unwrap().iter().all(|&y| y <= 1));

    // train
    let trained = run_train(&paths.processed, &paths.schema, &paths.models_dir, &paths.metrics, &small_train_options()).unwrap();
    assert_eq!(trained.report.variants.len(), 2);
    for m in &trained.report.variants {
        assert!((0.0..=1.0).contains(&m.roc_auc), "{m:?}");
    }
    let logistic = model_path(&paths.models_dir, ModelVariant::Logistic);
    let forest = model_path(&paths.models_dir, ModelVariant::RandomForest);
    assert!(logistic.exists() && forest.exists() && paths.metrics.exists());

    // explain, both variants
    for model in [&logistic, &forest] {
        fs::remove_file(&paths.explanation_png).ok();
        let out = run_explain(&paths.processed, model, &paths.explanation_png, &paths.explanation_json, 10).unwrap();
        assert_eq!(out.summary.features.len(), encoding.schema.len());
        assert!(paths.explanation_json.exists());
        assert_eq!(out.png.as_deref(), Some(paths.explanation_png.as_path()));
        assert!(paths.explanation_png.exists());
    }

    // optimize
    let params = BusinessParams::default();
    let first = run_optimize(&paths.processed, &logistic, &paths.targets, &params, SelectionPolicy::All).unwrap();
    assert!(first.customers.len() <= params.max_customers());
    assert_eq!(first.customers.len(), 200.min(encoding.table.n_rows()));
    assert!(first.customers.windows(2).all(|w| w[0].expected_profit >= w[1].expected_profit));
    let bytes = fs::read(&paths.targets).unwrap();

    run_optimize(&paths.processed, &logistic, &paths.targets, &params, SelectionPolicy::All).unwrap();
    assert_eq!(fs::read(&paths.targets).unwrap(), bytes, "targeting output is deterministic");

    let profitable =
        run_optimize(&paths.processed, &logistic, &paths.targets, &params, SelectionPolicy::ProfitableOnly).unwrap();
    assert!(profitable.customers.iter().all(|c| c.expected_profit > 0.0));

    // predict
    let demo = run_predict::<&str>(&logistic, &[], AlignMode::Tolerant).unwrap();
    assert!((0.0..=1.0).contains(&demo.churn_prob));
    let loyal = run_predict(
        &logistic,
        &["tenure=70", "MonthlyCharges=25", "TotalCharges=1750", "Contract=Two year", "InternetService=DSL"],
        AlignMode::Strict,
    )
    .unwrap();
    assert!(loyal.churn_prob < demo.churn_prob);
}

#[test]
fn retraining_with_the_same_seed_reproduces_the_report() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths::rooted_at(dir.path());
    fs::create_dir_all(paths.raw.parent().unwrap()).unwrap();
    synthetic_export(&paths.raw);
    run_preprocess(&paths.raw, &paths.processed, &paths.schema).unwrap();

    let opts = small_train_options();
    let a = run_train(&paths.processed, &paths.schema, &paths.models_dir, &paths.metrics, &opts).unwrap();
    let b = run_train(&paths.processed, &paths.schema, &paths.models_dir, &paths.metrics, &opts).unwrap();
    for (x, y) in a.report.variants.iter().zip(&b.report.variants) {
        assert_eq!(x.roc_auc, y.roc_auc);
        assert_eq!(x.f1, y.f1);
    }
}
