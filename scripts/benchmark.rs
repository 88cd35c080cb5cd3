// scripts/benchmark.rs
use fast_basket::analytics::moment_matching::MomentMatchingPricer;
use fast_basket::math_utils::Timer;
use fast_basket::output::{write_price_table_to_csv, write_summary_to_csv, PriceRow};
use fast_basket::{
    build_basket, Asset, Basket, BasketOption, BasketResult, Curve, McConfig, MonteCarloPricer,
    OptionKind,
};
use std::env;
use std::process::{self, Command};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct SystemInfo {
    os: String,
    cpu_cores: usize,
    rust_version: String,
    rustc_flags: String,
    rayon_threads: usize,
}

impl SystemInfo {
    fn gather() -> Self {
        let rust_version = Command::new("rustc")
            .arg("--version")
            .output()
            .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
            .unwrap_or_else(|_| "Unknown Rust version".to_string());

        Self {
            os: env::consts::OS.to_string(),
            cpu_cores: num_cpus::get(),
            rust_version,
            rustc_flags: env::var("RUSTFLAGS").unwrap_or_else(|_| "default".to_string()),
            rayon_threads: rayon::current_num_threads(),
        }
    }
}

/// Two-asset reference basket, flat (H1) or with term structures (H2)
fn reference_basket(time_dependent: bool) -> BasketResult<Basket> {
    let (vol_a, vol_b, rate) = if time_dependent {
        (
            Curve::from_points([(0.0, 0.18), (0.5, 0.20), (1.0, 0.22)])?,
            Curve::from_points([(0.0, 0.27), (1.0, 0.23)])?,
            Curve::from_points([(0.0, 0.025), (1.0, 0.035)])?,
        )
    } else {
        (Curve::constant(0.20), Curve::constant(0.25), Curve::constant(0.03))
    };

    build_basket(
        vec![
            Asset::new("A", 100.0, vol_a, 0.02)?,
            Asset::new("B", 120.0, vol_b, 0.015)?,
        ],
        vec![0.6, 0.4],
        vec![vec![1.0, 0.3], vec![0.3, 1.0]],
        rate,
    )
}

fn run_basket_benchmarks(label: &str, basket: &Basket, paths: usize) -> BasketResult<Vec<PriceRow>> {
    let mut rows = Vec::new();
    let mut timer = Timer::new();

    for kind in [OptionKind::Call, OptionKind::Put] {
        let option = BasketOption::new(basket, kind, 108.0, 1.0)?;

        timer.start();
        let analytic = MomentMatchingPricer::default().price(&option)?;
        rows.push(PriceRow {
            method: format!("{}_moment_matching", label),
            kind: kind.to_string(),
            price: analytic,
            standard_error: None,
            time_ms: timer.elapsed_ms(),
        });

        for use_control_variate in [false, true] {
            let pricer = MonteCarloPricer::new(McConfig {
                paths,
                use_control_variate,
                ..Default::default()
            })?;
            let suffix = if use_control_variate { "_cv" } else { "" };

            timer.start();
            let serial = pricer.price(&option)?;
            rows.push(PriceRow {
                method: format!("{}_monte_carlo{}", label, suffix),
                kind: kind.to_string(),
                price: serial.price,
                standard_error: Some(serial.standard_error),
                time_ms: timer.elapsed_ms(),
            });

            timer.start();
            let parallel = pricer.price_parallel(&option)?;
            rows.push(PriceRow {
                method: format!("{}_monte_carlo_parallel{}", label, suffix),
                kind: kind.to_string(),
                price: parallel.price,
                standard_error: Some(parallel.standard_error),
                time_ms: timer.elapsed_ms(),
            });

            if let Some(pct) = parallel.variance_reduction_pct() {
                info!(kind = %kind, label, variance_reduction_pct = pct, "control variate");
            }
        }
    }

    Ok(rows)
}

fn run() -> BasketResult<()> {
    let paths: usize = env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(100_000);

    let system_info = SystemInfo::gather();
    println!("fast-basket Benchmark Suite");
    println!("===========================\n");
    println!("System Information:");
    println!("  OS: {}", system_info.os);
    println!("  CPU Cores: {}", system_info.cpu_cores);
    println!("  Rust Version: {}", system_info.rust_version);
    println!("  RUSTFLAGS: {}", system_info.rustc_flags);
    println!("  Rayon Threads: {}", system_info.rayon_threads);
    println!("  Paths: {}\n", paths);

    let mut rows = run_basket_benchmarks("h1", &reference_basket(false)?, paths)?;
    rows.extend(run_basket_benchmarks("h2", &reference_basket(true)?, paths)?);

    println!("{:=<80}", "");
    println!(
        "{:<32} {:>6} {:>12} {:>12} {:>12}",
        "Method", "Kind", "Price", "Std Error", "Time (ms)"
    );
    println!("{:-<80}", "");
    for row in &rows {
        println!(
            "{:<32} {:>6} {:>12.6} {:>12} {:>12.2}",
            row.method,
            row.kind,
            row.price,
            row.standard_error
                .map(|se| format!("{:.6}", se))
                .unwrap_or_else(|| "N/A".to_string()),
            row.time_ms
        );
    }
    println!("{:=<80}", "");

    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let prices_file = format!("basket_benchmark_{}.csv", timestamp);
    let summary_file = format!("basket_benchmark_{}_system.csv", timestamp);

    let date = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let cores = system_info.cpu_cores.to_string();
    let threads = system_info.rayon_threads.to_string();
    let paths_label = paths.to_string();
    let summary = [
        ("benchmark_date", date.as_str()),
        ("os", system_info.os.as_str()),
        ("cpu_cores", cores.as_str()),
        ("rayon_threads", threads.as_str()),
        ("rust_version", system_info.rust_version.as_str()),
        ("rustflags", system_info.rustc_flags.as_str()),
        ("paths", paths_label.as_str()),
    ];

    let written = write_price_table_to_csv(&prices_file, &rows)
        .and_then(|_| write_summary_to_csv(&summary_file, &summary));
    match written {
        Ok(()) => println!("\nResults saved to: {} and {}", prices_file, summary_file),
        Err(e) => error!(error = %e, "could not write benchmark report"),
    }

    Ok(())
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run() {
        error!(error = %e, "benchmark failed");
        process::exit(1);
    }
}
