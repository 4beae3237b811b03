use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use logit_mest::logging::init_tracing;
use logit_mest::output::{create_run_dir, write_json, write_trials_csv};
use logit_mest::{run_monte_carlo, summarize_batch, MonteCarloConfig};
use tracing::info;

#[derive(Debug, Parser)]
#[command(author, version, about = "Monte Carlo MSE of logistic location estimators under contamination")]
struct Cli {
    /// JSON configuration; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of trials
    #[arg(long)]
    trials: Option<usize>,

    /// Sample size per trial
    #[arg(short = 'n')]
    sample_size: Option<usize>,

    /// Location of the contaminating component
    #[arg(long, allow_negative_numbers = true)]
    shift: Option<f64>,

    /// Scale of the contaminating component
    #[arg(long)]
    scale: Option<f64>,

    /// Probability of drawing from the contaminating component
    #[arg(short = 'c', long)]
    contamination: Option<f64>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Root of the timestamped run directories
    #[arg(long, default_value = "output-logit-mest")]
    output: PathBuf,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => MonteCarloConfig::default(),
    };
    if let Some(v) = cli.trials {
        config.trials = v;
    }
    if let Some(v) = cli.sample_size {
        config.sample_size = v;
    }
    if let Some(v) = cli.shift {
        config.distribution.shift = v;
    }
    if let Some(v) = cli.scale {
        config.distribution.scale = v;
    }
    if let Some(v) = cli.contamination {
        config.distribution.contamination = v;
    }
    if let Some(v) = cli.seed {
        config.seed = v;
    }
    config.validate().context("invalid monte carlo configuration")?;

    let batch = run_monte_carlo(&config)?;
    let summary = summarize_batch(&config, &batch);

    let label = format!(
        "n{}-c{}-shift{}-scale{}",
        config.sample_size,
        config.distribution.contamination,
        config.distribution.shift,
        config.distribution.scale
    );
    let output_dir = create_run_dir(&cli.output, &label)
        .with_context(|| format!("failed to create run directory under {}", cli.output.display()))?;
    write_trials_csv(&output_dir.join("trials.csv"), &batch.records)
        .context("failed to write trials.csv")?;
    write_json(&output_dir.join("summary.json"), &summary)
        .context("failed to write summary.json")?;
    write_json(&output_dir.join("config.json"), &config).context("failed to write config.json")?;
    info!(dir = %output_dir.display(), "run artefacts written");

    println!(
        "Trials: {} | sample size: {} | realized contamination: {:.4}",
        summary.trials, summary.sample_size, summary.realized_contamination
    );
    println!("{:<14} {:>14} {:>10} {:>8}", "estimator", "mse", "converged", "failed");
    for quality in &summary.estimators {
        println!(
            "{:<14} {:>14.6e} {:>10} {:>8}",
            quality.estimator, quality.mse, quality.converged, quality.failed
        );
    }
    println!("Output directory: {}", output_dir.display());

    Ok(())
}

fn load_config(path: &Path) -> Result<MonteCarloConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse config {}", path.display()))
}
