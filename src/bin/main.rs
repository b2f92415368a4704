//! biopsy-svm Command Line Interface
//!
//! Runs the biopsy classification pipeline on a risk-factor CSV file, or
//! only its cleaning stage.

use biopsy_svm::api::Pipeline;
use biopsy_svm::config::PipelineConfig;
use biopsy_svm::core::Result;
use biopsy_svm::kernel::KernelKind;
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::{error, info};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "biopsy-svm")]
#[command(about = "Cervical cancer biopsy classification with a kernel SVM")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean, split, select a kernel and evaluate on the held-out rows
    Run(RunArgs),
    /// Report what the cleaning stage removes
    Clean(CleanArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Risk-factor CSV file with a header row
    #[arg(long)]
    data: PathBuf,

    /// JSON pipeline configuration; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed of the train/test split
    #[arg(long)]
    seed: Option<u64>,

    /// Fraction of rows held out for evaluation
    #[arg(long)]
    test_size: Option<f64>,

    /// Cross-validation folds of the kernel search
    #[arg(long)]
    cv_folds: Option<usize>,

    /// Comma-separated kernel candidates: linear, rbf, poly, sigmoid
    #[arg(long, value_delimiter = ',')]
    kernels: Option<Vec<KernelKind>>,

    /// Regularization parameter C
    #[arg(short = 'C', long)]
    c: Option<f64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CleanArgs {
    /// Risk-factor CSV file with a header row
    #[arg(long)]
    data: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Run(args) => run_command(args),
        Commands::Clean(args) => clean_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn pipeline_config(args: &RunArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {path:?}");
            PipelineConfig::from_file(path)?
        }
        None => PipelineConfig::default(),
    };

    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(test_size) = args.test_size {
        config.test_size = test_size;
    }
    if let Some(folds) = args.cv_folds {
        config.cv_folds = folds;
    }
    if let Some(kernels) = &args.kernels {
        config.kernels = kernels.clone();
    }
    if let Some(c) = args.c {
        config.c = c;
    }

    config.validate()?;
    Ok(config)
}

fn run_command(args: RunArgs) -> Result<()> {
    let config = pipeline_config(&args)?;
    info!("Data file: {:?}", args.data);
    info!(
        "Parameters: seed={}, test_size={}, cv_folds={}, C={}",
        config.seed, config.test_size, config.cv_folds, config.c
    );

    let report = Pipeline::from_config(config).run_csv(&args.data)?;

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{report}");
    }
    Ok(())
}

fn clean_command(args: CleanArgs) -> Result<()> {
    let summary = Pipeline::new().clean_csv(&args.data)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("=== Cleaning Summary ===");
    println!("Rows loaded:             {}", summary.rows_loaded);
    println!("Missing cells:           {}", summary.missing_cells);
    for entry in &summary.missing_by_column {
        println!("  {}: {}", entry.column, entry.missing);
    }
    println!("Incomplete rows dropped: {}", summary.incomplete_rows_dropped);
    println!("Duplicate rows dropped:  {}", summary.duplicates_dropped);
    println!("Rows remaining:          {}", summary.rows_remaining);
    Ok(())
}
