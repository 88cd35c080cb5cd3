// tests/monte_carlo_test.rs
use fast_basket::analytics::bs_analytic::bs_price;
use fast_basket::{
    build_basket, price_moment_matching, price_monte_carlo, Asset, Basket, BasketError,
    BasketOption, Curve, McConfig, MonteCarloPricer, OptionKind,
};

fn reference_basket() -> Basket {
    build_basket(
        vec![
            Asset::new("A", 100.0, 0.20, 0.02).unwrap(),
            Asset::new("B", 120.0, 0.25, 0.015).unwrap(),
        ],
        vec![0.6, 0.4],
        vec![vec![1.0, 0.3], vec![0.3, 1.0]],
        0.03,
    )
    .unwrap()
}

// With constant parameters the log-Euler step is exact, so a coarse grid is unbiased
fn coarse(paths: usize, use_control_variate: bool, seed: u64) -> McConfig {
    McConfig {
        paths,
        steps: Some(12),
        use_control_variate,
        seed,
        ..Default::default()
    }
}

#[test]
fn test_mc_agrees_with_moment_matching_across_seeds() {
    let basket = reference_basket();

    for kind in [OptionKind::Call, OptionKind::Put] {
        let option = BasketOption::new(&basket, kind, 108.0, 1.0).unwrap();
        let mm = price_moment_matching(&option).unwrap();

        for seed in [1, 42, 2024] {
            let result = MonteCarloPricer::new(coarse(100_000, false, seed))
                .unwrap()
                .price_parallel(&option)
                .unwrap();
            let rel = (result.price - mm).abs() / mm;
            println!(
                "{} seed {}: MC {:.6} ± {:.6} vs MM {:.6} (rel {:.4})",
                kind, seed, result.price, result.standard_error, mm, rel
            );
            assert!(rel < 0.05, "MC should be within 5% of moment matching, got {:.4}", rel);
            assert!(result.standard_error < 0.1, "standard error too large: {}", result.standard_error);
            assert_eq!(result.paths, 100_000);

            let (lo, hi) = result.confidence_interval(1.96);
            assert!(lo < result.price && result.price < hi);
        }
    }
}

#[test]
fn test_default_step_grid() {
    let basket = reference_basket();
    let option = BasketOption::new(&basket, OptionKind::Call, 108.0, 1.0).unwrap();
    let mm = price_moment_matching(&option).unwrap();

    let result = MonteCarloPricer::new(McConfig { paths: 100_000, seed: 7, ..Default::default() })
        .unwrap()
        .price_parallel(&option)
        .unwrap();
    println!("default grid: {} steps, MC {:.6} ± {:.6}, MM {:.6}", result.steps, result.price, result.standard_error, mm);

    assert_eq!(result.steps, 365);
    assert!((result.price - mm).abs() / mm < 0.05);
    assert!(result.standard_error < 0.1);
}

#[test]
fn test_control_variate_reduces_error() {
    let basket = reference_basket();

    for kind in [OptionKind::Call, OptionKind::Put] {
        let option = BasketOption::new(&basket, kind, 108.0, 1.0).unwrap();
        for seed in [3, 11] {
            let plain = MonteCarloPricer::new(coarse(20_000, false, seed)).unwrap().price(&option).unwrap();
            let cv = MonteCarloPricer::new(coarse(20_000, true, seed)).unwrap().price(&option).unwrap();
            let report = cv.control_variate.expect("control variate should be applied");

            println!(
                "{} seed {}: plain {:.6} ± {:.6}, cv {:.6} ± {:.6}, β={:.4}, reduction {:.2}%",
                kind, seed, plain.price, plain.standard_error, cv.price, cv.standard_error,
                report.beta, report.variance_reduction_pct
            );

            assert!(cv.standard_error <= plain.standard_error, "control variate must not increase the standard error");
            assert!(report.variance_reduction_pct >= 0.0);
            assert!(
                report.variance_reduction_pct > 50.0,
                "geometric control should remove most of the variance, got {:.2}%",
                report.variance_reduction_pct
            );
            assert!((report.adjustment - (cv.price - plain.price)).abs() < 1e-12);
            assert_eq!(cv.control_variate_adjustment(), Some(report.adjustment));
            assert!(
                (cv.price - plain.price).abs() < 4.0 * plain.standard_error,
                "centred adjustment should stay within the raw estimator's noise"
            );
        }
    }
}

#[test]
fn test_control_variate_on_time_dependent_basket() {
    let basket = build_basket(
        vec![
            Asset::new("A", 100.0, Curve::from_points([(0.0, 0.15), (1.0, 0.25)]).unwrap(), 0.02).unwrap(),
            Asset::new("B", 120.0, Curve::from_points([(0.0, 0.30), (0.5, 0.25), (1.0, 0.22)]).unwrap(), 0.015)
                .unwrap(),
        ],
        vec![0.6, 0.4],
        vec![vec![1.0, 0.3], vec![0.3, 1.0]],
        Curve::from_points([(0.0, 0.02), (1.0, 0.04)]).unwrap(),
    )
    .unwrap();
    let option = BasketOption::new(&basket, OptionKind::Call, 108.0, 1.0).unwrap();
    let mm = price_moment_matching(&option).unwrap();

    let cfg = McConfig { paths: 40_000, use_control_variate: true, seed: 99, ..Default::default() };
    let result = MonteCarloPricer::new(cfg).unwrap().price_parallel(&option).unwrap();
    println!("H2 basket: MC+CV {:.6} ± {:.6} vs MM {:.6}", result.price, result.standard_error, mm);

    assert!((result.price - mm).abs() / mm < 0.02);
    assert!(result.variance_reduction_pct().unwrap() > 50.0);
}

#[test]
fn test_single_asset_control_variate_is_exact() {
    let (s, k, r, q, sigma, t) = (100.0, 105.0, 0.04, 0.01, 0.3, 0.75);
    let basket = build_basket(vec![Asset::new("X", s, sigma, q).unwrap()], vec![1.0], vec![vec![1.0]], r).unwrap();

    for kind in [OptionKind::Call, OptionKind::Put] {
        let option = BasketOption::new(&basket, kind, k, t).unwrap();
        let result = MonteCarloPricer::new(coarse(2_000, true, 17)).unwrap().price(&option).unwrap();
        let bs = bs_price(kind, s, k, r, q, sigma, t);
        let report = result.control_variate.unwrap();

        println!("{}: MC+CV {:.10} vs BS {:.10}, β={}", kind, result.price, bs, report.beta);
        // Geometric and arithmetic baskets coincide, so β = 1 and the estimator is E[X]
        assert!((report.beta - 1.0).abs() < 1e-12);
        assert!((result.price - bs).abs() < 1e-8);
        assert!(result.standard_error < 1e-6);
    }
}

#[test]
fn test_seeded_reproducibility() {
    let basket = reference_basket();
    let option = BasketOption::new(&basket, OptionKind::Call, 108.0, 1.0).unwrap();

    let a = price_monte_carlo(&option, 2_000, true, 123).unwrap();
    let b = price_monte_carlo(&option, 2_000, true, 123).unwrap();
    let c = price_monte_carlo(&option, 2_000, true, 124).unwrap();

    assert_eq!(a, b, "same seed must reproduce the result bit for bit");
    assert_ne!(a.price, c.price, "different seeds should give different estimates");
}

#[test]
fn test_parallel_partitions() {
    let basket = reference_basket();
    let option = BasketOption::new(&basket, OptionKind::Put, 108.0, 1.0).unwrap();

    let single = McConfig { partitions: 1, ..coarse(5_000, true, 5) };
    let pricer = MonteCarloPricer::new(single).unwrap();
    assert_eq!(
        pricer.price_parallel(&option).unwrap(),
        pricer.price(&option).unwrap(),
        "one partition must replay the serial stream"
    );

    let split = MonteCarloPricer::new(McConfig { partitions: 7, ..coarse(5_001, true, 5) }).unwrap();
    let first = split.price_parallel(&option).unwrap();
    let second = split.price_parallel(&option).unwrap();
    assert_eq!(first, second, "partitioned runs depend only on seed, partitions and paths");
    assert_eq!(first.paths, 5_001);

    // More partitions than paths
    let tiny = MonteCarloPricer::new(McConfig { partitions: 16, ..coarse(3, false, 5) }).unwrap();
    assert_eq!(tiny.price_parallel(&option).unwrap().paths, 3);
}

#[test]
fn test_invalid_inputs() {
    let basket = reference_basket();
    let option = BasketOption::new(&basket, OptionKind::Call, 108.0, 1.0).unwrap();

    assert!(matches!(
        price_monte_carlo(&option, 0, false, 1),
        Err(BasketError::InvalidConfiguration { .. })
    ));
    assert!(MonteCarloPricer::new(McConfig { paths: 100, path_limit: 10, ..Default::default() }).is_err());
    assert!(MonteCarloPricer::new(McConfig { steps: Some(0), ..Default::default() }).is_err());

    // Valid entries but not positive semi-definite
    let bad = build_basket(
        vec![
            Asset::new("A", 100.0, 0.2, 0.0).unwrap(),
            Asset::new("B", 100.0, 0.2, 0.0).unwrap(),
            Asset::new("C", 100.0, 0.2, 0.0).unwrap(),
        ],
        vec![0.3, 0.3, 0.4],
        vec![vec![1.0, 0.9, -0.9], vec![0.9, 1.0, 0.9], vec![-0.9, 0.9, 1.0]],
        0.03,
    )
    .unwrap();
    let bad_option = BasketOption::new(&bad, OptionKind::Call, 100.0, 1.0).unwrap();
    match price_monte_carlo(&bad_option, 100, false, 1) {
        Err(e @ BasketError::CholeskyFailure { .. }) => println!("rejected as expected: {}", e),
        other => panic!("expected a Cholesky failure, got {:?}", other),
    }
}

#[test]
fn test_long_maturity_step_grid_is_rejected() {
    let basket = build_basket(vec![Asset::new("X", 100.0, 0.2, 0.0).unwrap()], vec![1.0], vec![vec![1.0]], 0.03).unwrap();

    // max(252, ⌊365·T⌋) far beyond the step ceiling must fail before any grid is allocated
    for maturity in [1e15, 1_000.0] {
        let option = BasketOption::new(&basket, OptionKind::Call, 100.0, maturity).unwrap();
        match price_monte_carlo(&option, 1, false, 1) {
            Err(BasketError::InvalidConfiguration { field, .. }) => assert_eq!(field, "steps"),
            other => panic!("T={} should be rejected, got {:?}", maturity, other),
        }
    }

    let option = BasketOption::new(&basket, OptionKind::Call, 100.0, 1_000.0).unwrap();
    let explicit = MonteCarloPricer::new(coarse(100, false, 1)).unwrap();
    let result = explicit.price_parallel(&option).unwrap();
    assert_eq!(result.steps, 12, "an explicit step count keeps long maturities usable");
}
