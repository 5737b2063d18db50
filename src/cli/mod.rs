//! Command-line parsing for the churn pipeline.
//!
//! Argument parsing and command dispatch stay separate from the modeling code.
//! Every path defaults to the fixed artifact layout, so each stage runs with no
//! arguments from the project root.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{AlignMode, ArtifactPaths, BusinessParams, ModelVariant, SelectionPolicy};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "churn",
    version,
    about = "Customer churn prediction, explanation and retention targeting"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands, in pipeline order.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Encode the raw customer export into a numeric feature table.
    Preprocess(PreprocessArgs),
    /// Fit the classifier variants and report held-out metrics.
    Train(TrainArgs),
    /// Compute feature attributions and render the summary plot.
    Explain(ExplainArgs),
    /// Rank customers by expected retention profit under a budget.
    Optimize(OptimizeArgs),
    /// Score a single customer.
    Predict(PredictArgs),
    /// Launch the interactive dashboard (default when no subcommand is given).
    Dashboard(DashboardArgs),
}

#[derive(Debug, Clone, Args)]
pub struct PreprocessArgs {
    /// Raw customer CSV.
    #[arg(long, value_name = "CSV", default_value_os_t = ArtifactPaths::default().raw)]
    pub input: PathBuf,

    /// Encoded output CSV.
    #[arg(long, value_name = "CSV", default_value_os_t = ArtifactPaths::default().processed)]
    pub output: PathBuf,

    /// Feature schema JSON written next to the encoded table.
    #[arg(long, value_name = "JSON", default_value_os_t = ArtifactPaths::default().schema)]
    pub schema: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct TrainArgs {
    /// Encoded feature table.
    #[arg(long, value_name = "CSV", default_value_os_t = ArtifactPaths::default().processed)]
    pub data: PathBuf,

    /// Feature schema produced by `churn preprocess`.
    #[arg(long, value_name = "JSON", default_value_os_t = ArtifactPaths::default().schema)]
    pub schema: PathBuf,

    /// Directory receiving one `{variant}.json` per model.
    #[arg(long, value_name = "DIR", default_value_os_t = ArtifactPaths::default().models_dir)]
    pub models_dir: PathBuf,

    /// Train report JSON.
    #[arg(long, value_name = "JSON", default_value_os_t = ArtifactPaths::default().metrics)]
    pub metrics: PathBuf,

    /// Variants to fit (repeatable; default: all).
    #[arg(long = "variant", value_enum)]
    pub variants: Vec<ModelVariant>,

    /// Seed for the split and the forest.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Held-out fraction.
    #[arg(long, default_value_t = 0.2)]
    pub test_size: f64,

    /// Inverse L2 strength of the logistic model.
    #[arg(long, default_value_t = 1.0)]
    pub c: f64,

    /// L-BFGS iteration cap of the logistic model.
    #[arg(long, default_value_t = 3000)]
    pub max_iter: usize,

    /// Trees in the random forest.
    #[arg(long, default_value_t = 200)]
    pub trees: usize,

    /// Maximum depth of each tree.
    #[arg(long, default_value_t = 10)]
    pub max_depth: usize,
}

#[derive(Debug, Clone, Args)]
pub struct ExplainArgs {
    /// Encoded feature table to explain.
    #[arg(long, value_name = "CSV", default_value_os_t = ArtifactPaths::default().processed)]
    pub data: PathBuf,

    /// Model artifact.
    #[arg(long, value_name = "JSON", default_value_os_t = ArtifactPaths::default().model(ModelVariant::Logistic))]
    pub model: PathBuf,

    /// Summary plot.
    #[arg(long, value_name = "PNG", default_value_os_t = ArtifactPaths::default().explanation_png)]
    pub png: PathBuf,

    /// Summary JSON.
    #[arg(long, value_name = "JSON", default_value_os_t = ArtifactPaths::default().explanation_json)]
    pub summary: PathBuf,

    /// Features shown in the plot and the printed table.
    #[arg(long, default_value_t = 20)]
    pub top: usize,
}

/// Retention-offer economics, overridable from the environment.
#[derive(Debug, Clone, Copy, Args)]
pub struct BusinessArgs {
    /// Cost of the offer per targeted customer.
    #[arg(long, env = "CHURN_DISCOUNT", default_value_t = BusinessParams::default().discount)]
    pub discount: f64,

    /// Probability the offer retains a churning customer.
    #[arg(long, env = "CHURN_RETENTION_RATE", default_value_t = BusinessParams::default().retention_rate)]
    pub retention_rate: f64,

    /// Total offer budget.
    #[arg(long, env = "CHURN_BUDGET", default_value_t = BusinessParams::default().budget)]
    pub budget: f64,
}

impl BusinessArgs {
    pub fn params(&self) -> BusinessParams {
        BusinessParams {
            discount: self.discount,
            retention_rate: self.retention_rate,
            budget: self.budget,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct OptimizeArgs {
    /// Encoded feature table to score.
    #[arg(long, value_name = "CSV", default_value_os_t = ArtifactPaths::default().processed)]
    pub data: PathBuf,

    /// Model artifact.
    #[arg(long, value_name = "JSON", default_value_os_t = ArtifactPaths::default().model(ModelVariant::Logistic))]
    pub model: PathBuf,

    /// Targeting CSV.
    #[arg(long, value_name = "CSV", default_value_os_t = ArtifactPaths::default().targets)]
    pub output: PathBuf,

    #[command(flatten)]
    pub business: BusinessArgs,

    /// Whether customers with non-positive expected profit may be targeted.
    #[arg(long, value_enum, default_value_t = SelectionPolicy::All)]
    pub policy: SelectionPolicy,

    /// Also print the best N targets.
    #[arg(long, default_value_t = 0)]
    pub show: usize,
}

#[derive(Debug, Clone, Args)]
pub struct PredictArgs {
    /// Model artifact.
    #[arg(long, value_name = "JSON", default_value_os_t = ArtifactPaths::default().model(ModelVariant::Logistic))]
    pub model: PathBuf,

    /// Customer field as `name=value` (repeatable). Numbers set columns,
    /// text selects a category, e.g. `--set "Contract=One year"`.
    /// Without any, a high-risk demo customer is scored.
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    pub fields: Vec<String>,

    /// How gaps between the input and the schema are treated.
    #[arg(long, value_enum, default_value_t = AlignMode::Tolerant)]
    pub align: AlignMode,
}

#[derive(Debug, Clone, Args)]
pub struct DashboardArgs {
    /// Encoded feature table.
    #[arg(long, value_name = "CSV", default_value_os_t = ArtifactPaths::default().processed)]
    pub data: PathBuf,

    /// Deployed model artifact.
    #[arg(long, value_name = "JSON", default_value_os_t = ArtifactPaths::default().model(ModelVariant::Logistic))]
    pub model: PathBuf,

    /// Train report JSON.
    #[arg(long, value_name = "JSON", default_value_os_t = ArtifactPaths::default().metrics)]
    pub metrics: PathBuf,

    /// Explanation summary JSON.
    #[arg(long, value_name = "JSON", default_value_os_t = ArtifactPaths::default().explanation_json)]
    pub summary: PathBuf,

    /// Explanation plot.
    #[arg(long, value_name = "PNG", default_value_os_t = ArtifactPaths::default().explanation_png)]
    pub png: PathBuf,

    /// Targeting CSV.
    #[arg(long, value_name = "CSV", default_value_os_t = ArtifactPaths::default().targets)]
    pub targets: PathBuf,
}
