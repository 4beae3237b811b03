use logit_mest::monte_carlo::{default_estimators, run};
use logit_mest::output::{read_isw, write_isw};
use logit_mest::{
    generate_mixture, run_monte_carlo, sample_logistic, secant, summarize_batch,
    DistributionParams, EstimatingEquation, Estimator, MixtureSampler, MonteCarloConfig,
    ScoreEquation, SolverOptions,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn mle_recovers_location_of_large_pure_sample() {
    let sampler = MixtureSampler::new(&DistributionParams::pure()).unwrap();
    let mut rng = StdRng::seed_from_u64(100_000);
    let sample = sampler.sample(&mut rng, 100_000).unwrap();

    let eq = ScoreEquation::new(&sample, 1.0, Estimator::Mle).unwrap();
    let root = secant(&eq, 0.0, &SolverOptions::default()).unwrap();
    assert!(root.root.abs() < 0.05, "mle = {}", root.root);
}

#[test]
fn mixture_realizes_requested_contamination() {
    let mut rng = StdRng::seed_from_u64(20);
    let mut from_secondary = 0usize;
    let sample = generate_mixture(
        &mut rng,
        1000,
        |rng| sample_logistic(rng, 0.0, 1.0),
        |rng| {
            from_secondary += 1;
            sample_logistic(rng, 0.0, 10.0)
        },
        0.2,
    )
    .unwrap();

    assert_eq!(sample.len(), 1000);
    let realized = from_secondary as f64 / 1000.0;
    let standard_error = (0.2 * 0.8 / 1000.0_f64).sqrt();
    assert!(
        (realized - 0.2).abs() < 3.0 * standard_error,
        "realized contamination {realized}"
    );
}

#[test]
fn harness_reports_four_finite_metrics() {
    let metrics = run(1000, 30, 0.2, 0.0, 10.0).unwrap();
    assert_eq!(metrics.len(), 4);
    for spec in default_estimators() {
        let mse = metrics[&spec.name()];
        assert!(mse.is_finite() && mse >= 0.0, "{} = {mse}", spec.name());
    }
}

#[test]
fn harness_is_deterministic_for_a_seed() {
    let config = MonteCarloConfig {
        trials: 25,
        sample_size: 50,
        seed: 9,
        ..MonteCarloConfig::default()
    };
    let first = run_monte_carlo(&config).unwrap();
    let second = run_monte_carlo(&config).unwrap();
    assert_eq!(first.records, second.records);
    assert_eq!(
        summarize_batch(&config, &first),
        summarize_batch(&config, &second)
    );
}

#[test]
fn clean_samples_give_small_errors() {
    let config = MonteCarloConfig {
        trials: 200,
        sample_size: 200,
        distribution: DistributionParams::pure(),
        ..MonteCarloConfig::default()
    };
    let batch = run_monte_carlo(&config).unwrap();
    let summary = summarize_batch(&config, &batch);
    assert_eq!(summary.realized_contamination, 0.0);
    for quality in &summary.estimators {
        assert_eq!(quality.failed, 0, "{}", quality.estimator);
        // asymptotic MLE variance is 3 / n = 0.015
        assert!(quality.mse < 0.05, "{} = {}", quality.estimator, quality.mse);
    }
}

#[test]
fn drawn_sample_survives_isw_round_trip() {
    let params = DistributionParams::new(2.0, 10.0, 0.3).unwrap();
    let sampler = MixtureSampler::new(&params).unwrap();
    let sample = sampler.sample(&mut StdRng::seed_from_u64(3), 250).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixture.dat");
    write_isw(&path, "round trip", &sample).unwrap();
    let dataset = read_isw(&path).unwrap();
    assert_eq!(dataset.values, sample.as_slice());
}

fn assert_estimates_are_roots_inside_samples(config: &MonteCarloConfig) {
    let batch = run_monte_carlo(config).unwrap();
    let sampler = MixtureSampler::new(&config.distribution).unwrap();
    // estimation does not draw from the generator, so the samples replay
    let mut rng = StdRng::seed_from_u64(config.seed);
    let per_trial = config.estimators.len();

    for (trial, records) in batch.records.chunks(per_trial).enumerate() {
        let sample = sampler.sample(&mut rng, config.sample_size).unwrap();
        let lo = sample.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = sample.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        for (record, spec) in records.iter().zip(&config.estimators) {
            assert_eq!(record.trial, trial);
            let Some(estimate) = record.estimate else {
                continue;
            };
            assert!(
                estimate >= lo && estimate <= hi,
                "trial {trial} {}: {estimate} outside [{lo}, {hi}]",
                record.estimator
            );
            let eq = ScoreEquation::new(&sample, config.estimator_scale, spec.estimator).unwrap();
            assert!(
                eq.score(estimate).abs() < 1e-6,
                "trial {trial} {}: score {} at {estimate}",
                record.estimator,
                eq.score(estimate)
            );
        }
    }
}

#[test]
fn tiny_contaminated_samples_give_real_roots() {
    let config = MonteCarloConfig {
        trials: 1000,
        sample_size: 5,
        distribution: DistributionParams::new(0.0, 10.0, 0.2).unwrap(),
        ..MonteCarloConfig::default()
    };
    assert_estimates_are_roots_inside_samples(&config);
}

#[test]
fn heavy_shifted_contamination_gives_real_roots() {
    let config = MonteCarloConfig {
        trials: 300,
        sample_size: 20,
        distribution: DistributionParams::new(20.0, 10.0, 0.5).unwrap(),
        ..MonteCarloConfig::default()
    };
    assert_estimates_are_roots_inside_samples(&config);

    let batch = run_monte_carlo(&config).unwrap();
    let summary = summarize_batch(&config, &batch);
    let mle = &summary.estimators[0];
    assert_eq!(mle.estimator, "mle");
    assert_eq!(mle.failed, 0);
    // squared estimates are bounded by the squared sample range
    for quality in &summary.estimators {
        assert!(quality.mse < 1.0e4, "{} = {}", quality.estimator, quality.mse);
    }
}
