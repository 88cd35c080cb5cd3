// src/analytics/bs_analytic.rs
//! Analytical Black-Scholes formulas for European options
//!
//! # Mathematical Foundation
//!
//! Under the Black-Scholes model with continuous dividend yield q, the
//! underlying asset follows:
//! ```text
//! dS_t = (r - q) S_t dt + σ S_t dW_t
//! ```
//!
//! The risk-neutral pricing formula gives:
//! ```text
//! V(S,t) = e^(-r(T-t)) * E^Q[payoff(S_T) | S_t = S]
//! ```
//!
//! For European options, this has closed-form solutions involving
//! the cumulative normal distribution function Φ(x). The same closed form,
//! written on a forward F and a discount factor DF, prices any payoff on a
//! lognormal underlying; the moment-matching basket pricer relies on it.

use crate::math_utils::norm_cdf;
use crate::mc::payoffs::OptionKind;

/// Black-Scholes European call option price with dividend yield
///
/// # Formula
/// ```text
/// C(S,K,r,q,σ,T) = S*e^(-qT)*Φ(d₁) - K*e^(-rT)*Φ(d₂)
/// ```
///
/// Where:
/// ```text
/// d₁ = [ln(S/K) + (r - q + σ²/2)T] / (σ√T)
/// d₂ = d₁ - σ√T
/// ```
pub fn bs_call_price(s: f64, k: f64, r: f64, q: f64, sigma: f64, t: f64) -> f64 {
    let d1 = ((s / k).ln() + (r - q + 0.5 * sigma * sigma) * t) / (sigma * t.sqrt());
    let d2 = d1 - sigma * t.sqrt();
    s * (-q * t).exp() * norm_cdf(d1) - k * (-r * t).exp() * norm_cdf(d2)
}

/// Black-Scholes European put option price with dividend yield
///
/// # Formula
/// ```text
/// P(S,K,r,q,σ,T) = K*e^(-rT)*Φ(-d₂) - S*e^(-qT)*Φ(-d₁)
/// ```
pub fn bs_put_price(s: f64, k: f64, r: f64, q: f64, sigma: f64, t: f64) -> f64 {
    let d1 = ((s / k).ln() + (r - q + 0.5 * sigma * sigma) * t) / (sigma * t.sqrt());
    let d2 = d1 - sigma * t.sqrt();
    k * (-r * t).exp() * norm_cdf(-d2) - s * (-q * t).exp() * norm_cdf(-d1)
}

pub fn bs_price(kind: OptionKind, s: f64, k: f64, r: f64, q: f64, sigma: f64, t: f64) -> f64 {
    match kind {
        OptionKind::Call => bs_call_price(s, k, r, q, sigma, t),
        OptionKind::Put => bs_put_price(s, k, r, q, sigma, t),
    }
}

/// Black price on a forward
///
/// # Formula
/// ```text
/// C = DF * (F*Φ(d₁) - K*Φ(d₂))
/// P = DF * (K*Φ(-d₂) - F*Φ(-d₁))
/// d₁ = [ln(F/K) + σ²T/2] / (σ√T),  d₂ = d₁ - σ√T
/// ```
///
/// With σ ≤ 0 or T ≤ 0 the distribution collapses onto F and the price is
/// the discounted intrinsic value.
pub fn black_forward_price(
    kind: OptionKind,
    forward: f64,
    strike: f64,
    discount_factor: f64,
    sigma: f64,
    t: f64,
) -> f64 {
    if sigma <= 0.0 || t <= 0.0 {
        return discount_factor * kind.payoff(forward, strike);
    }

    let sigma_sqrt_t = sigma * t.sqrt();
    let d1 = ((forward / strike).ln() + 0.5 * sigma * sigma * t) / sigma_sqrt_t;
    let d2 = d1 - sigma_sqrt_t;

    match kind {
        OptionKind::Call => discount_factor * (forward * norm_cdf(d1) - strike * norm_cdf(d2)),
        OptionKind::Put => discount_factor * (strike * norm_cdf(-d2) - forward * norm_cdf(-d1)),
    }
}

/// Undiscounted E[payoff(e^X)] for X ~ N(mean_log, var_log)
///
/// # Formula
/// ```text
/// E[(e^X - K)⁺] = e^(m + v/2) Φ(d₁) - K Φ(d₂)
/// d₁ = (m - ln K + v) / √v,  d₂ = d₁ - √v
/// ```
pub fn lognormal_expected_payoff(kind: OptionKind, mean_log: f64, var_log: f64, strike: f64) -> f64 {
    if var_log <= 0.0 {
        return kind.payoff(mean_log.exp(), strike);
    }

    let std_log = var_log.sqrt();
    let forward = (mean_log + 0.5 * var_log).exp();
    let d1 = (mean_log - strike.ln() + var_log) / std_log;
    let d2 = d1 - std_log;

    match kind {
        OptionKind::Call => forward * norm_cdf(d1) - strike * norm_cdf(d2),
        OptionKind::Put => strike * norm_cdf(-d2) - forward * norm_cdf(-d1),
    }
}
