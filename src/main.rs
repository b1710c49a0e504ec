//! Harsel CLI
//!
//! Reduces a labeled training table, compares classifier strategies on
//! stratified partitions, and predicts unlabeled cases with the winner.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use harsel::cli::{Cli, Commands};
use harsel::pipeline::loader::estimated_size_mb;
use harsel::pipeline::{load_dataset, profile_columns, save_predictions, PipelineOutcome, PreparedData};
use harsel::report::{
    class_metrics_table, confusion_table, export_run_report, model_comparison_table, print_indented,
    print_section_title, profile_table, ReductionSummary, ReportPaths, RunReport,
};
use harsel::utils::{
    create_spinner, finish_with_error, finish_with_success, finish_with_warning, print_banner,
    print_completion, print_config, print_count, print_info, print_step_header, print_step_time,
    print_success, print_warning, ConfigCard,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    if let Some(command) = &cli.command {
        return match command {
            Commands::Profile {
                input,
                infer_schema_length,
            } => run_profile(input, *infer_schema_length),
        };
    }

    let input = cli.input().ok_or_else(|| {
        anyhow::anyhow!("Input file is required. Use -i/--input to specify a file.")
    })?;
    let config = cli.pipeline_config()?;
    let output_path = cli.predict.as_ref().and_then(|_| cli.output_path());
    let strategy_names: Vec<String> = config
        .strategies
        .iter()
        .map(|s| s.kind().short_name().to_string())
        .collect();

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&ConfigCard {
        input,
        cases: cli.predict.as_deref(),
        label: &config.label,
        output: output_path.as_deref(),
        missing_threshold: config.missing_threshold,
        correlation_cutoff: config.correlation_cutoff,
        seed: config.seed,
        strategies: &strategy_names,
    });

    // Step 1: Load data
    print_step_header(1, "Load Data");
    let step_start = Instant::now();
    let spinner = create_spinner("Loading training data...");
    let training = load_dataset(input, cli.infer_schema_length, Some(&config.label))?;
    let cases = match &cli.predict {
        Some(path) => Some(load_dataset(path, cli.infer_schema_length, None)?),
        None => None,
    };
    finish_with_success(&spinner, "Data loaded");

    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", training.height());
    println!("      Columns: {}", training.width());
    println!("      Estimated memory: {:.2} MB", estimated_size_mb(&training));
    if let Some(cases) = &cases {
        println!("      Cases to predict: {}", cases.height());
    }
    let load_elapsed = step_start.elapsed();
    print_step_time(load_elapsed);

    // Step 2: Preprocess and partition
    print_step_header(2, "Feature Selection & Partitioning");
    let step_start = Instant::now();
    let spinner = create_spinner("Fitting preprocessing stages...");
    let mut prepared = match PreparedData::prepare(&training, &config) {
        Ok(prepared) => prepared,
        Err(e) => {
            finish_with_error(&spinner, "Preprocessing failed");
            return Err(e.into());
        }
    };
    let case_features = cases
        .as_ref()
        .map(|df| prepared.case_features(df))
        .transpose()
        .context("Cases do not match the training schema")?;
    finish_with_success(&spinner, "Preprocessing fitted");

    let log = prepared.preprocessor.reduction_log().clone();
    print_count(
        "feature(s) with high missing values",
        log.missing.len(),
        Some(&format!("(>={:.1}%)", config.missing_threshold * 100.0)),
    );
    print_count("identifier column(s)", log.identifiers.len(), None);
    print_count("near-zero-variance feature(s)", log.variance.len(), None);
    print_count(
        "correlated feature(s) to drop",
        log.correlation.len(),
        Some(&format!("(|r|>{:.2})", config.correlation_cutoff)),
    );
    print_success(&format!(
        "{} of {} features retained",
        log.final_features, log.initial_features
    ));
    print_info(&format!(
        "Partitions: {} train / {} test / {} validation rows",
        prepared.rows.train.len(),
        prepared.rows.test.len(),
        prepared.rows.validation.len()
    ));
    let preprocess_elapsed = step_start.elapsed();
    print_step_time(preprocess_elapsed);

    // Step 3: Train and select
    print_step_header(3, "Train & Select Model");
    let step_start = Instant::now();
    let spinner = create_spinner(&format!(
        "Training {} strateg{}...",
        config.strategies.len(),
        if config.strategies.len() == 1 { "y" } else { "ies" }
    ));
    let selection = match prepared.select(&config) {
        Ok(selection) => selection,
        Err(e) => {
            finish_with_error(&spinner, "Model selection failed");
            return Err(e.into());
        }
    };
    let failures = selection.candidates().iter().filter(|c| !c.succeeded()).count();
    if failures > 0 {
        finish_with_warning(
            &spinner,
            &format!("Selected {} ({} strategy(ies) failed)", selection.winner(), failures),
        );
    } else {
        finish_with_success(&spinner, &format!("Selected {}", selection.winner()));
    }
    let training_elapsed = step_start.elapsed();
    print_step_time(training_elapsed);

    // Step 4: Predict and save
    let step_start = Instant::now();
    let predictions = match (&cases, case_features, &output_path) {
        (Some(cases), Some(features), Some(path)) => {
            print_step_header(4, "Predict & Save");
            let spinner = create_spinner("Predicting cases...");
            let predictions = selection.predict(&features)?;
            save_predictions(path, cases, cli.id_column.as_deref(), &predictions)?;
            finish_with_success(&spinner, &format!("Saved {} predictions to {}", predictions.len(), path.display()));
            Some(predictions)
        }
        _ => {
            print_warning("No cases file given (-p); skipping prediction");
            None
        }
    };
    let save_elapsed = step_start.elapsed();

    let outcome = PipelineOutcome {
        preprocessor: prepared.preprocessor,
        classes: prepared.classes,
        rows: prepared.rows,
        selection,
        predictions,
    };

    let mut summary = ReductionSummary::from_log(&log);
    summary.set_load_time(load_elapsed);
    summary.set_preprocess_time(preprocess_elapsed);
    summary.set_training_time(training_elapsed);
    summary.set_save_time(save_elapsed);
    summary.display();

    print_section_title("🏁", "MODEL COMPARISON (test subset)");
    print_indented(&model_comparison_table(outcome.selection.candidates()));

    let validation = outcome.selection.validation_matrix();
    print_section_title(
        "🎯",
        &format!(
            "{} ON VALIDATION: accuracy {:.2}%, out-of-sample error {:.2}%",
            outcome.selection.winner().label().to_uppercase(),
            validation.accuracy() * 100.0,
            validation.error_rate() * 100.0
        ),
    );
    print_indented(&confusion_table(validation));
    println!();
    print_indented(&class_metrics_table(validation));

    if let Some(report_path) = &cli.report {
        let report = RunReport::build(
            &outcome,
            &config,
            ReportPaths {
                input,
                cases: cli.predict.as_deref(),
                output: output_path.as_deref(),
            },
        );
        export_run_report(&report, report_path)?;
        println!();
        print_success(&format!("Run report written to {}", report_path.display()));
    }

    print_completion();
    Ok(())
}

/// Print per-column statistics of a file
fn run_profile(input: &Path, infer_schema_length: usize) -> Result<()> {
    let spinner = create_spinner("Profiling columns...");
    let df = load_dataset(input, infer_schema_length, None)?;
    let stats = profile_columns(&df)?;
    finish_with_success(&spinner, &format!("Profiled {} columns, {} rows", stats.len(), df.height()));

    print_section_title("📊", "COLUMN PROFILE");
    print_indented(&profile_table(&stats));
    Ok(())
}
