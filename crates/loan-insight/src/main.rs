//! CLI entry point for the loan dataset analysis pipeline.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use loan_insight::{
    AnalysisConfig, AnalysisConfigBuilder, Assessor, BiasAnalyzer, CleaningResult, DataCleaner,
    DataProfiler, DistributionAnalyzer, ReportWriter, TransformArtifacts, load_dataset,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Loan approval dataset analysis: assessment, distributions, bias and cleaning",
    long_about = "Analyze and clean a tabular loan-approval dataset.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  RUST_LOG              Log filter; overrides --log-level\n\n\
                  EXAMPLES:\n  \
                  # First look at the data\n  \
                  loan-insight assess -i data/loan_approval.csv\n\n  \
                  # Bias check on two features with a 10-point threshold\n  \
                  loan-insight bias --features gender,region --threshold 0.10\n\n  \
                  # Clean, dropping outlier rows and min-max scaling\n  \
                  loan-insight clean --outlier-mode remove --scaling normalize\n\n  \
                  # Apply saved encodings to new rows\n  \
                  loan-insight transform -i new.csv \\\n      \
                  --encoding-map outputs/loan_approval_cleaned_encoding_map.json \\\n      \
                  --scaling-params outputs/loan_approval_cleaned_scaling_params.json"
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

/// Options shared by every subcommand.
#[derive(Args, Debug)]
struct CommonArgs {
    /// Path to the delimited input file [default: data/loan_approval.csv]
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,

    /// Output directory for reports, charts and cleaned data [default: outputs]
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// JSON configuration file; command-line flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Field separator of the input file
    #[arg(long, global = true)]
    separator: Option<char>,

    /// Column to treat as the row identifier
    #[arg(long, global = true)]
    id_column: Option<String>,

    /// Skip PNG chart rendering
    #[arg(long, global = true)]
    no_charts: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print shape, types, missing values, duplicates and a preview
    Assess,

    /// Descriptive statistics, normality tests and distribution charts
    Distributions {
        /// Histogram bin count
        #[arg(long)]
        bins: Option<usize>,

        /// Significance level for the normality tests
        #[arg(long)]
        alpha: Option<f64>,
    },

    /// Class balance and group-wise approval-rate comparison
    Bias {
        /// Outcome column
        #[arg(short, long)]
        target: Option<String>,

        /// Value of the target that counts as a positive outcome
        #[arg(long)]
        positive_label: Option<String>,

        /// Flag groups whose rate differs from the overall rate by more than this
        #[arg(long)]
        threshold: Option<f64>,

        /// Comma-separated features to analyze (default: all categorical features)
        #[arg(long, value_delimiter = ',')]
        features: Option<Vec<String>>,

        /// Render a chart for every feature, not only flagged ones
        #[arg(long)]
        all_charts: bool,
    },

    /// Impute, deduplicate, handle outliers, encode and scale
    Clean {
        /// Outlier handling: cap, remove or keep
        #[arg(long)]
        outlier_mode: Option<String>,

        /// Scaling: standardize, normalize or none
        #[arg(long)]
        scaling: Option<String>,

        /// Encoding: auto, label, one-hot or none
        #[arg(long)]
        encoding: Option<String>,

        /// Numeric imputation: median or mean
        #[arg(long)]
        numeric_imputation: Option<String>,

        /// Categorical imputation: mode or constant
        #[arg(long)]
        categorical_imputation: Option<String>,

        /// Label order: first-seen or sorted
        #[arg(long)]
        label_order: Option<String>,

        /// Drop columns with a missing fraction above this (0.0 - 1.0)
        #[arg(long)]
        missing_threshold: Option<f64>,

        /// Keep exact duplicate rows
        #[arg(long)]
        keep_duplicates: bool,

        /// Base name of the output files (without extension)
        #[arg(long)]
        output_name: Option<String>,
    },

    /// Apply a saved encoding map and scaling parameters to new rows
    Transform {
        /// Encoding map written by `clean`
        #[arg(long)]
        encoding_map: PathBuf,

        /// Scaling parameters written by `clean`
        #[arg(long)]
        scaling_params: PathBuf,

        /// Base name of the transformed file (without extension)
        #[arg(long, default_value = "transformed")]
        output_name: String,
    },
}

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` takes precedence over `level`; `quiet` lowers the default to `warn`.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    // Load environment variables from .env file before the log filter is read
    dotenv().ok();

    let cli = Cli::parse();
    init_logging(&cli.common.log_level, cli.common.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;

    if let Command::Transform {
        encoding_map,
        scaling_params,
        output_name,
    } = &cli.command
    {
        return run_transform(&config, encoding_map, scaling_params, output_name);
    }

    info!("Loading dataset from: {}", config.input_path.display());
    let df = load_dataset(&config.input_path, config.separator_byte())?;
    info!("Dataset loaded successfully: {:?}", df.shape());
    let schema = DataProfiler::infer_schema(&df, config.id_column.as_deref())?;

    match cli.command {
        Command::Assess => {
            Assessor::assess(&df, &schema)?.print();
        }
        Command::Distributions { .. } => {
            let report = DistributionAnalyzer::new(&config).run(&df, &schema)?;
            report.print();
            println!("Report written to: {}", config.output_dir.display());
        }
        Command::Bias { .. } => {
            let report = BiasAnalyzer::new(&config).run(&df, &schema)?;
            report.print();
            println!("Report written to: {}", config.output_dir.display());
        }
        Command::Clean { .. } => {
            let result = DataCleaner::new(&config).run(df, &schema)?;
            print_cleaning_summary(&result, &config);
        }
        Command::Transform { .. } => {}
    }
    Ok(())
}

/// Merge the optional JSON file with command-line overrides and validate.
fn build_config(cli: &Cli) -> Result<AnalysisConfig> {
    let base = match &cli.common.config {
        Some(path) => AnalysisConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        None => AnalysisConfig::default(),
    };
    let mut builder = AnalysisConfigBuilder::from(base);

    let common = &cli.common;
    if let Some(input) = &common.input {
        builder = builder.input_path(input);
    }
    if let Some(output) = &common.output {
        builder = builder.output_dir(output);
    }
    if let Some(separator) = common.separator {
        builder = builder.separator(separator);
    }
    if let Some(id) = &common.id_column {
        builder = builder.id_column(id);
    }
    if common.no_charts {
        builder = builder.render_charts(false);
    }

    match &cli.command {
        Command::Assess | Command::Transform { .. } => {}
        Command::Distributions { bins, alpha } => {
            if let Some(bins) = bins {
                builder = builder.histogram_bins(*bins);
            }
            if let Some(alpha) = alpha {
                builder = builder.significance_level(*alpha);
            }
        }
        Command::Bias {
            target,
            positive_label,
            threshold,
            features,
            all_charts,
        } => {
            if let Some(target) = target {
                builder = builder.target_column(target);
            }
            if let Some(label) = positive_label {
                builder = builder.positive_label(label);
            }
            if let Some(threshold) = threshold {
                builder = builder.bias_threshold(*threshold);
            }
            if let Some(features) = features {
                builder = builder.bias_features(features.iter().map(|f| f.trim().to_string()));
            }
            if *all_charts {
                builder = builder.chart_all_features(true);
            }
        }
        Command::Clean {
            outlier_mode,
            scaling,
            encoding,
            numeric_imputation,
            categorical_imputation,
            label_order,
            missing_threshold,
            keep_duplicates,
            output_name,
        } => {
            // unknown mode strings fail here, before anything is written
            if let Some(mode) = outlier_mode {
                builder = builder.outlier_strategy(mode.parse()?);
            }
            if let Some(mode) = scaling {
                builder = builder.scaling_method(mode.parse()?);
            }
            if let Some(mode) = encoding {
                builder = builder.encoding_method(mode.parse()?);
            }
            if let Some(mode) = numeric_imputation {
                builder = builder.numeric_imputation(mode.parse()?);
            }
            if let Some(mode) = categorical_imputation {
                builder = builder.categorical_imputation(mode.parse()?);
            }
            if let Some(order) = label_order {
                builder = builder.label_order(order.parse()?);
            }
            if let Some(threshold) = missing_threshold {
                builder = builder.missing_column_threshold(*threshold);
            }
            if *keep_duplicates {
                builder = builder.remove_duplicates(false);
            }
            if let Some(name) = output_name {
                builder = builder.output_name(name);
            }
        }
    }

    Ok(builder.build()?)
}

fn run_transform(
    config: &AnalysisConfig,
    encoding_map: &Path,
    scaling_params: &Path,
    output_name: &str,
) -> Result<()> {
    let artifacts = TransformArtifacts::load(encoding_map, scaling_params)?
        .with_target_column(&config.target_column);
    let df = load_dataset(&config.input_path, config.separator_byte())?;
    let rows = df.height();

    let mut transformed = artifacts.apply(df)?;
    let path = ReportWriter::new(&config.output_dir).write_csv(
        &format!("{}.csv", output_name),
        &mut transformed,
        config.separator_byte(),
    )?;

    println!(
        "Transformed {} rows ({} columns) -> {}",
        rows,
        transformed.width(),
        path.display()
    );
    Ok(())
}

/// Print a human-readable summary of the cleaning run.
///
/// Note: This function uses `println!` intentionally for user-facing CLI output.
/// Unlike logging (`info!`, `debug!`), this output should always be visible
/// regardless of log level settings.
fn print_cleaning_summary(result: &CleaningResult, config: &AnalysisConfig) {
    let summary = &result.summary;

    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!("Input:  {}", config.input_path.display());
    println!(
        "Output: {} ({} rows x {} columns)",
        config.output_dir.display(),
        summary.rows_after,
        summary.columns_after
    );
    println!();

    println!("Processing Summary:");
    println!("  Duration: {}ms", summary.duration_ms);
    println!(
        "  Rows: {} -> {} ({} removed, {:.1}%)",
        summary.rows_before,
        summary.rows_after,
        summary.rows_removed,
        summary.rows_removed_percentage()
    );
    println!(
        "  Columns: {} -> {}",
        summary.columns_before, summary.columns_after
    );
    println!(
        "  Missing cells: {} -> {}",
        summary.missing_before, summary.missing_after
    );
    println!();

    if !summary.actions.is_empty() {
        println!("Actions Taken:");
        println!("{}", "-".repeat(40));
        for action in &summary.actions {
            match &action.details {
                Some(details) => println!(
                    "  - [{}] {}: {} ({})",
                    action.action_type.display_name(),
                    action.target,
                    action.description,
                    details
                ),
                None => println!(
                    "  - [{}] {}: {}",
                    action.action_type.display_name(),
                    action.target,
                    action.description
                ),
            }
        }
        println!();
    }

    if !summary.warnings.is_empty() {
        println!("Warnings:");
        for warning in &summary.warnings {
            println!("  ! {}", warning);
        }
        println!();
    }

    println!("Files written:");
    for path in &result.written_files {
        println!("  {}", path.display());
    }
    println!("{}", "=".repeat(80));
}
