//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - installs logging for the batch stages
//! - dispatches to the stage functions in [`pipeline`]
//! - prints the stage summaries

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{
    Command, DashboardArgs, ExplainArgs, OptimizeArgs, PredictArgs, PreprocessArgs, TrainArgs,
};
use crate::domain::ModelVariant;
use crate::error::AppError;
use crate::fit::TrainOptions;
use crate::models::{ForestOptions, LogisticOptions};

pub mod pipeline;

/// Default log filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "warn";

/// Entry point for the `churn` binary.
pub fn run() -> Result<(), AppError> {
    // Business parameters may come from a `.env` file; a missing file is fine.
    dotenvy::dotenv().ok();

    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    // The dashboard owns the terminal; log lines on stderr would tear the screen.
    if !matches!(cli.command, Command::Dashboard(_)) {
        init_logging();
    }

    match cli.command {
        Command::Preprocess(args) => handle_preprocess(args),
        Command::Train(args) => handle_train(args),
        Command::Explain(args) => handle_explain(args),
        Command::Optimize(args) => handle_optimize(args),
        Command::Predict(args) => handle_predict(args),
        Command::Dashboard(args) => handle_dashboard(args),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    // Ignore a second initialization (tests may have installed one already).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_preprocess(args: PreprocessArgs) -> Result<(), AppError> {
    let encoding = pipeline::run_preprocess(&args.input, &args.output, &args.schema)?;
    print!("{}", crate::report::format_preprocess_summary(&encoding, &args.output));
    Ok(())
}

fn handle_train(args: TrainArgs) -> Result<(), AppError> {
    let opts = train_options_from_args(&args);
    let output = pipeline::run_train(&args.data, &args.schema, &args.models_dir, &args.metrics, &opts)?;
    print!("{}", crate::report::format_train_summary(&output.report, &args.models_dir));
    Ok(())
}

fn handle_explain(args: ExplainArgs) -> Result<(), AppError> {
    let output = pipeline::run_explain(&args.data, &args.model, &args.png, &args.summary, args.top)?;
    print!(
        "{}",
        crate::report::format_explain_summary(&output.summary, args.top, output.png.as_deref(), &args.summary)
    );
    Ok(())
}

fn handle_optimize(args: OptimizeArgs) -> Result<(), AppError> {
    let params = args.business.params();
    let selection = pipeline::run_optimize(&args.data, &args.model, &args.output, &params, args.policy)?;
    if args.show > 0 {
        println!("{}", crate::report::format_targets_table(&selection, args.show));
    }
    print!("{}", crate::report::format_optimize_summary(&selection, &args.output));
    Ok(())
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    let prediction = pipeline::run_predict(&args.model, &args.fields, args.align)?;
    print!("{}", crate::report::format_prediction(&prediction));
    Ok(())
}

fn handle_dashboard(args: DashboardArgs) -> Result<(), AppError> {
    crate::tui::run(args)
}

pub fn train_options_from_args(args: &TrainArgs) -> TrainOptions {
    let variants = if args.variants.is_empty() {
        ModelVariant::ALL.to_vec()
    } else {
        let mut v = args.variants.clone();
        v.sort();
        v.dedup();
        v
    };
    TrainOptions {
        variants,
        test_fraction: args.test_size,
        seed: args.seed,
        logistic: LogisticOptions {
            c: args.c,
            max_iter: args.max_iter,
            ..LogisticOptions::default()
        },
        forest: ForestOptions {
            n_trees: args.trees,
            max_depth: args.max_depth,
            seed: args.seed,
            ..ForestOptions::default()
        },
        ..TrainOptions::default()
    }
}

/// Rewrite argv so `churn` defaults to `churn dashboard`.
///
/// Rules:
/// - `churn`                       -> `churn dashboard`
/// - `churn --model m.json ...`    -> `churn dashboard --model m.json ...`
/// - `churn --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("dashboard".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    // If the first token is a flag, treat it as "dashboard flags".
    if arg1.starts_with('-') {
        argv.insert(1, "dashboard".to_string());
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_binary_runs_dashboard() {
        assert_eq!(rewrite_args(argv(&["churn"])), argv(&["churn", "dashboard"]));
        assert_eq!(
            rewrite_args(argv(&["churn", "--model", "m.json"])),
            argv(&["churn", "dashboard", "--model", "m.json"])
        );
    }

    #[test]
    fn subcommands_and_help_pass_through() {
        assert_eq!(rewrite_args(argv(&["churn", "train"])), argv(&["churn", "train"]));
        assert_eq!(rewrite_args(argv(&["churn", "--help"])), argv(&["churn", "--help"]));
    }

    #[test]
    fn train_args_map_onto_options() {
        let cli = crate::cli::Cli::parse_from(["churn", "train", "--trees", "50", "--variant", "random-forest"]);
        let Command::Train(args) = cli.command else {
            panic!("expected train");
        };
        let opts = train_options_from_args(&args);
        assert_eq!(opts.variants, vec![ModelVariant::RandomForest]);
        assert_eq!(opts.forest.n_trees, 50);
        assert_eq!(opts.forest.max_depth, 10);
        assert_eq!(opts.logistic.max_iter, 3000);
    }

    #[test]
    fn repeated_variants_are_trained_once() {
        let cli = crate::cli::Cli::parse_from([
            "churn",
            "train",
            "--variant",
            "logistic",
            "--variant",
            "random-forest",
            "--variant",
            "logistic",
        ]);
        let Command::Train(args) = cli.command else {
            panic!("expected train");
        };
        let opts = train_options_from_args(&args);
        assert_eq!(opts.variants, vec![ModelVariant::Logistic, ModelVariant::RandomForest]);
    }
}
