use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use logit_mest::influence::{default_grid, influence_table, DEFAULT_DELTAS};
use logit_mest::logging::init_tracing;
use logit_mest::monte_carlo::default_estimators;
use logit_mest::output::{
    ensure_outdir, isw_description, isw_file_name, write_influence_csv, write_isw,
};
use logit_mest::{DistributionParams, MixtureSampler, SampleSummary, SolverOptions};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Parser)]
#[command(author, version, about = "Draw one contaminated logistic sample and report on it")]
struct Cli {
    /// Sample size
    #[arg(short = 'n', default_value_t = 1000)]
    size: usize,

    /// Location of the contaminating component
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    shift: f64,

    /// Scale of the contaminating component
    #[arg(long, default_value_t = 10.0)]
    scale: f64,

    /// Probability of drawing from the contaminating component
    #[arg(short = 'c', long, default_value_t = 0.2)]
    contamination: f64,

    /// Random seed
    #[arg(long, default_value_t = 2026)]
    seed: u64,

    /// Directory for the ISW dataset
    #[arg(long, default_value = ".")]
    output: PathBuf,

    /// Also write the influence curves of the radical estimators
    #[arg(long)]
    influence: bool,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let params = DistributionParams::new(cli.shift, cli.scale, cli.contamination)
        .context("invalid mixture parameters")?;
    let sampler = MixtureSampler::new(&params)?;
    let mut rng = StdRng::seed_from_u64(cli.seed);
    let (sample, contaminated) = sampler
        .sample_with_count(&mut rng, cli.size)
        .context("failed to draw sample")?;

    let summary = SampleSummary::from_sample(&sample).context("failed to describe sample")?;
    println!("Size: {}", summary.size);
    println!("Contaminated draws: {contaminated}");
    println!("Mean: {:.6}", summary.mean);
    println!("Median: {:.6}", summary.median);
    println!("Variance: {:.6}", summary.variance);
    println!("Skewness: {:.6}", summary.skewness);
    println!("Kurtosis: {:.6}", summary.kurtosis);

    let options = SolverOptions::default();
    for spec in default_estimators() {
        match spec.estimate(&sample, 1.0, &options) {
            Ok(root) => println!(
                "Estimate {} ({}): {:.6} after {} iterations",
                spec.name(),
                root.method.label(),
                root.root,
                root.iterations
            ),
            Err(err) => println!("Estimate {}: {err}", spec.name()),
        }
    }

    ensure_outdir(&cli.output)
        .with_context(|| format!("failed to create {}", cli.output.display()))?;
    let isw_path = cli.output.join(isw_file_name(&params, cli.size));
    write_isw(&isw_path, &isw_description(&params), &sample)
        .with_context(|| format!("failed to write {}", isw_path.display()))?;
    println!("Dataset: {}", isw_path.display());

    if cli.influence {
        let rows = influence_table(&default_grid(), &DEFAULT_DELTAS, 0.0, 1.0)?;
        let influence_path = cli.output.join("influence.csv");
        write_influence_csv(&influence_path, &rows)
            .with_context(|| format!("failed to write {}", influence_path.display()))?;
        println!("Influence curves: {}", influence_path.display());
    }

    Ok(())
}
