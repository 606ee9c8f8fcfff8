//! Integration tests for the full sampling-to-analysis pipeline.
//!
//! These tests drive the public API end to end: registering cases, sampling
//! them, compiling run results, comparing runs, and estimating complexity,
//! without touching any real benchmark workload beyond small spin loops.

use regatta::{
    compile_run, consume, estimate_scaling, run_registry, AnalysisSettings, CancelToken,
    CaseDescriptor, CaseRegistry, ChangeDirection, Config, DiffEngine, DownsampleSettings,
    FitOptions, SamplerError, SamplingOutcome, SamplingSettings, TestCaseId, TestKind,
};

fn spin_case(method: &str, iterations: u64) -> CaseDescriptor {
    CaseDescriptor::builder(method)
        .body(move || async move {
            consume((0..iterations).sum::<u64>());
            Ok(())
        })
        .build()
        .unwrap()
}

fn small_run_config() -> Config {
    Config {
        sampling: SamplingSettings {
            sample_size: 10,
            warmup_iterations: 1,
            ..SamplingSettings::default()
        },
        ..Config::default()
    }
}

fn synthetic_outcome(name: &str, sample: Vec<f64>) -> SamplingOutcome {
    SamplingOutcome {
        id: TestCaseId::new(name),
        scaling_variable: None,
        sample,
        failures: Vec::new(),
        ops_per_invoke: 1,
    }
}

#[tokio::test]
async fn test_run_registry_produces_results_for_every_case() {
    let mut registry = CaseRegistry::new();
    registry.register(spin_case("Pipeline.fast", 100)).unwrap();
    registry.register(spin_case("Pipeline.slow", 50_000)).unwrap();

    let artifacts = run_registry(&registry, &small_run_config(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(artifacts.run.results.len(), 2);
    assert!(artifacts.run.failures.is_empty());

    for result in &artifacts.run.results {
        assert!(result.statistics.sample_size >= 2);
        assert!(result.statistics.mean >= 0.0);
        assert!(
            (result.statistics.std_dev - result.statistics.variance.sqrt()).abs() < 1e-12
        );
    }
}

#[tokio::test]
async fn test_run_registry_isolates_broken_case() {
    let mut registry = CaseRegistry::new();
    registry.register(spin_case("Pipeline.ok", 100)).unwrap();
    registry
        .register(
            CaseDescriptor::builder("Pipeline.broken")
                .body(|| async { anyhow::bail!("intentional failure") })
                .build()
                .unwrap(),
        )
        .unwrap();

    let artifacts = run_registry(&registry, &small_run_config(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(artifacts.run.results.len(), 1);
    assert_eq!(artifacts.run.failures.len(), 1);
    assert_eq!(
        artifacts.run.failures[0].0,
        TestCaseId::new("Pipeline.broken")
    );
}

#[tokio::test]
async fn test_run_registry_cancellation() {
    let mut registry = CaseRegistry::new();
    registry.register(spin_case("Pipeline.case", 100)).unwrap();

    let token = CancelToken::new();
    token.cancel();

    let result = run_registry(&registry, &small_run_config(), &token).await;
    assert!(matches!(result, Err(SamplerError::Cancelled)));
}

#[tokio::test]
async fn test_scaling_cases_feed_the_estimator() {
    let mut registry = CaseRegistry::new();
    for n in [64u64, 128, 256, 512] {
        let case = CaseDescriptor::builder("Pipeline.scaling")
            .variable("n", n as i64)
            .scaling_variable("n")
            .body(move || async move {
                consume((0..n).sum::<u64>());
                Ok(())
            })
            .build()
            .unwrap();
        registry.register(case).unwrap();
    }

    let artifacts = run_registry(&registry, &small_run_config(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(artifacts.scaling.len(), 1);
    let report = &artifacts.scaling[0];
    assert_eq!(report.method, "Pipeline.scaling");
    assert_eq!(report.variable, "n");
    assert_eq!(report.measurements.len(), 4);
    // Real timings are noisy, so only the shape of the analysis is asserted,
    // not which curve wins.
    assert!(report.outcome.is_ok());
}

#[tokio::test]
async fn test_before_after_comparison_over_compiled_runs() {
    let analysis = AnalysisSettings {
        test: TestKind::RankSum,
        alpha: 0.05,
        ..AnalysisSettings::default()
    };

    let before_outcomes = vec![
        synthetic_outcome(
            "Pipeline.stable",
            (0..30).map(|i| 10.0 + (i % 5) as f64 * 0.1).collect(),
        ),
        synthetic_outcome(
            "Pipeline.regressing",
            (0..30).map(|i| 10.0 + (i % 5) as f64 * 0.1).collect(),
        ),
    ];
    let after_outcomes = vec![
        synthetic_outcome(
            "Pipeline.stable",
            (0..30).map(|i| 10.0 + ((i + 2) % 5) as f64 * 0.1).collect(),
        ),
        synthetic_outcome(
            "Pipeline.regressing",
            (0..30).map(|i| 30.0 + (i % 5) as f64 * 0.1).collect(),
        ),
    ];

    let before = compile_run(&before_outcomes, &analysis);
    let after = compile_run(&after_outcomes, &analysis);

    let engine = DiffEngine::new(
        analysis,
        DownsampleSettings {
            seed: Some(11),
            ..DownsampleSettings::default()
        },
    );
    let report = engine.compare_runs(&before.results, &after.results).await;

    assert_eq!(report.comparisons.len(), 2);
    assert_eq!(report.skipped, 0);

    let stable = report
        .comparisons
        .iter()
        .find(|c| c.id == TestCaseId::new("Pipeline.stable"))
        .unwrap();
    assert_eq!(
        stable.outcome.as_ref().unwrap().change,
        ChangeDirection::NoChange
    );

    let regressing = report
        .comparisons
        .iter()
        .find(|c| c.id == TestCaseId::new("Pipeline.regressing"))
        .unwrap();
    assert_eq!(
        regressing.outcome.as_ref().unwrap().change,
        ChangeDirection::Regressed
    );

    // Every successful comparison has an FDR-adjusted q-value at or above
    // its p-value.
    for comparison in &report.comparisons {
        let result = comparison.outcome.as_ref().unwrap();
        let q = report.q_values[&comparison.id];
        assert!(q >= result.p_value);
        assert!(q <= 1.0);
    }
}

#[tokio::test]
async fn test_canonical_rank_sum_fixture_no_change() {
    // Canonical regression-comparison scenario: nearly identical
    // distributions must be classified as no change at alpha 0.01.
    let analysis = AnalysisSettings {
        test: TestKind::RankSum,
        alpha: 0.01,
        ..AnalysisSettings::default()
    };
    let engine = DiffEngine::new(analysis, DownsampleSettings::default());

    let before = [2.0, 3.0, 4.0, 4.0, 5.0, 5.0, 6.0, 6.0, 6.0];
    let after = [9.0, 8.0, 7.0, 6.0, 4.0, 4.0, 1.0, 2.0, 3.0, 2.0];

    let comparison = engine
        .compare_case(&TestCaseId::new("Fixture.case"), &before, &after)
        .await;
    let result = comparison.outcome.unwrap();

    assert_eq!(result.median_before, 5.0);
    assert_eq!(result.median_after, 4.0);
    assert_eq!(result.change, ChangeDirection::NoChange);
    assert!(result.p_value > 0.01);
}

#[test]
fn test_synthetic_quadratic_recovery_through_compile_and_estimate() {
    let analysis = AnalysisSettings {
        outlier_detection: false,
        ..AnalysisSettings::default()
    };

    let outcomes: Vec<SamplingOutcome> = [2i64, 5, 8, 11, 14, 17, 20, 23, 26, 29, 32]
        .iter()
        .map(|&n| {
            let y = (n * n) as f64;
            SamplingOutcome {
                id: TestCaseId::with_variables("Fixture.quadratic", [("n", n)]),
                scaling_variable: Some("n".to_string()),
                sample: vec![y, y, y],
                failures: Vec::new(),
                ops_per_invoke: 1,
            }
        })
        .collect();

    let run = compile_run(&outcomes, &analysis);
    let reports = estimate_scaling(&run.results, &FitOptions::default());

    assert_eq!(reports.len(), 1);
    let model = reports[0].outcome.as_ref().unwrap();
    assert_eq!(model.primary.function().name(), "Quadratic");
    assert!(model.primary.fitness.r_squared > 0.9999);
}

#[test]
fn test_run_results_serialize_for_external_sinks() {
    let analysis = AnalysisSettings::default();
    let run = compile_run(
        &[synthetic_outcome(
            "Pipeline.serialized",
            vec![10.0, 11.0, 10.5, 10.2, 10.8],
        )],
        &analysis,
    );

    let json = serde_json::to_string(&run.results).unwrap();
    assert!(json.contains("Pipeline.serialized"));
    assert!(json.contains("confidence_interval"));
}
