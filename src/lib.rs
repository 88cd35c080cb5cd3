//! # fast-basket: Basket Option Pricing
//!
//! A Rust library for pricing European options on weighted baskets of
//! correlated assets, under constant or deterministic time-dependent rates
//! and volatilities.
//!
//! ## Key Features
//!
//! - **Moment Matching**: closed-form lognormal approximation of the basket (Levy)
//! - **Monte Carlo**: correlated log-Euler paths with a geometric-basket control variate
//! - **Deterministic Curves**: flat or piecewise-linear rate and volatility term structures
//! - **Reproducible**: every variate comes from an injected, seeded source
//! - **Parallel**: seed-partitioned Monte Carlo on Rayon, independent of thread count
//!
//! ## Quick Start
//!
//! ```rust
//! use fast_basket::{build_basket, Asset, BasketOption, OptionKind};
//! use fast_basket::{price_moment_matching, price_monte_carlo};
//!
//! let basket = build_basket(
//!     vec![
//!         Asset::new("A", 100.0, 0.20, 0.02)?,
//!         Asset::new("B", 120.0, 0.25, 0.015)?,
//!     ],
//!     vec![0.6, 0.4],
//!     vec![vec![1.0, 0.3], vec![0.3, 1.0]],
//!     0.03,
//! )?;
//! let option = BasketOption::new(&basket, OptionKind::Call, 108.0, 1.0)?;
//!
//! let analytic = price_moment_matching(&option)?;
//! let mc = price_monte_carlo(&option, 2_000, true, 42)?;
//! println!("moment matching {:.4}, monte carlo {:.4} ± {:.4}", analytic, mc.price, mc.standard_error);
//! # Ok::<(), fast_basket::BasketError>(())
//! ```
//!
//! ## Mathematical Foundation
//!
//! Each asset follows dSᵢ = (r(t) − qᵢ)Sᵢdt + σᵢ(t)SᵢdWᵢ with
//! d⟨Wᵢ, Wⱼ⟩ = ρᵢⱼdt. The option pays max(±(Σ wᵢSᵢ(T) − K), 0) at T and is
//! valued as its discounted risk-neutral expectation.

pub mod error;
pub mod rng;
pub mod math_utils;
pub mod correlation;
pub mod models;
pub mod mc;
pub mod analytics;
pub mod output;

pub use analytics::moment_matching::{price_moment_matching, BasketMoments, MomentFlags, MomentMatchingPricer};
pub use correlation::{CholeskyFactor, CorrelationMatrix};
pub use error::{BasketError, BasketResult, ErrorKind};
pub use mc::mc_engine::{price_monte_carlo, ControlVariateReport, McConfig, McResult, MonteCarloPricer};
pub use mc::payoffs::OptionKind;
pub use models::{build_basket, Asset, Basket, BasketOption, Curve, PiecewiseLinearCurve, TimeDependentCurve};
