//! Fraud Risk Scoring - Command Line Entry Point
//!
//! Scores a CSV of UPI transactions or call-detail records and writes the
//! table back with `p_final`, `risk_bucket` and `reason` columns.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fraud_risk_scoring::{
    config::AppConfig, Domain, FeatureSchemas, ModelPaths, OnnxArtifacts, EnsembleLoader,
    ScoreOptions, ScoringPipeline,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "fraud-risk-scoring",
    about = "Batch fraud-risk scoring for UPI transactions and call-detail records."
)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, default_value = "config/config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a CSV batch
    Score {
        /// Record family: upi or cdr
        #[arg(long)]
        domain: String,

        /// Input CSV
        #[arg(long)]
        input: PathBuf,

        /// Output CSV (default: <outputs>/<domain>_predictions.csv)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Keep raw blended probabilities instead of min-max normalizing
        #[arg(long)]
        no_normalize: bool,

        /// Append isolation and reconstruction anomaly scores
        #[arg(long)]
        anomaly: bool,
    },

    /// Validate configuration, feature schemas and model artifacts
    Check,
}

fn load_config(path: &Path) -> Result<AppConfig> {
    if path.is_file() {
        AppConfig::load_from_path(path)
    } else {
        Ok(AppConfig::default())
    }
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("fraud_risk_scoring={}", config.logging.level))
    })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn cmd_score(
    config: &AppConfig,
    domain: &str,
    input: &Path,
    output: Option<PathBuf>,
    no_normalize: bool,
    anomaly: bool,
) -> Result<()> {
    let domain: Domain = domain.parse()?;
    let options = ScoreOptions {
        normalize: config.scoring.normalize && !no_normalize,
        anomaly: config.scoring.anomaly || anomaly,
    };

    let mut pipeline =
        ScoringPipeline::from_config(config).context("Failed to initialize scoring pipeline")?;

    let scored = pipeline
        .score_file(domain, input, options)
        .with_context(|| format!("Failed to score {}", input.display()))?;
    scored.summary.log_summary();

    let output = output.unwrap_or_else(|| pipeline.default_output_path(domain));
    scored
        .write_csv(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Scored {} {} records: {} high, {} medium, {} low -> {}",
        scored.summary.total,
        domain,
        scored.summary.high,
        scored.summary.medium,
        scored.summary.low,
        output.display()
    );
    Ok(())
}

/// Returns the number of problems found.
fn cmd_check(config: &AppConfig) -> usize {
    let mut problems = 0;

    match FeatureSchemas::load(config.paths.feature_order_file()) {
        Ok(schemas) => info!(
            upi_features = schemas.upi.len(),
            cdr_features = schemas.cdr.len(),
            "Feature schemas OK"
        ),
        Err(e) => {
            error!(error = %e, "Feature schemas invalid");
            problems += 1;
        }
    }

    let model_paths = match ModelPaths::load(
        config.paths.model_paths_file(),
        config.paths.project_root.clone(),
    ) {
        Ok(paths) => paths,
        Err(e) => {
            error!(error = %e, "Model path mapping invalid");
            return problems + 1;
        }
    };

    let loader = EnsembleLoader::with_factory(
        model_paths,
        OnnxArtifacts::with_threads(config.scoring.onnx_threads),
    );
    for domain in Domain::ALL {
        match loader.resolve(domain) {
            Ok(paths) => info!(domain = %domain, artifacts = paths.iter().count(), "Artifacts present"),
            Err(e) => {
                warn!(domain = %domain, error = %e, "Artifacts unavailable");
                problems += 1;
            }
        }
    }

    problems
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_logging(&config) {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }
    if !cli.config.is_file() {
        warn!(path = %cli.config.display(), "Configuration file not found, using defaults");
    }

    match cli.command {
        Commands::Score {
            domain,
            input,
            output,
            no_normalize,
            anomaly,
        } => match cmd_score(&config, &domain, &input, output, no_normalize, anomaly) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{:#}", e);
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Check => {
            let problems = cmd_check(&config);
            if problems == 0 {
                println!("Configuration OK");
                ExitCode::SUCCESS
            } else {
                println!("{} problem(s) found", problems);
                ExitCode::FAILURE
            }
        }
    }
}
