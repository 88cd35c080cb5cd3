// src/analytics/moment_matching.rs
//! Moment-Matching Pricer for Basket Options
//!
//! # Mathematical Framework
//!
//! The terminal basket value B_T = Σ wᵢ Sᵢ(T) is a sum of correlated
//! lognormals and has no closed-form law. It is replaced by a lognormal with
//! the same first two risk-neutral moments:
//! ```text
//! Fᵢ  = Sᵢ exp(∫₀ᵀ r(s) ds - qᵢ T)
//! M₁  = Σᵢ wᵢ Fᵢ
//! M₂  = Σᵢⱼ wᵢ wⱼ Fᵢ Fⱼ exp(ρᵢⱼ Cᵢⱼ),   Cᵢⱼ = ∫₀ᵀ σᵢ(s) σⱼ(s) ds
//! σ̂²  = ln(M₂ / M₁²) / T
//! μ̂   = ln(M₁ / A₀) / T
//! ```
//! and priced with the Black formula on forward M₁, volatility σ̂ and
//! discount factor exp(-∫₀ᵀ r). With constant parameters (H1) the integrals
//! reduce to rT and σᵢσⱼT; with a single asset the price is exactly
//! Black-Scholes.
//!
//! # Second-moment floor
//!
//! When M₂ ≤ M₁² (zero volatilities, or rounding on extreme inputs) the
//! equivalent variance would be non-positive. M₂ is then forced to
//! M₁²·1.0001, which biases the price upwards. The result carries
//! [`MomentFlags::SECOND_MOMENT_FLOORED`] so callers can detect it.

use super::bs_analytic::black_forward_price;
use crate::error::{validation::*, BasketError, BasketResult};
use crate::models::basket::BasketOption;
use crate::models::curves::{integrated_cross_variance, DEFAULT_INTEGRATION_STEPS};
use crate::models::model::TimeDependentCurve;
use bitflags::bitflags;
use tracing::{debug, warn};

/// Multiplier applied to M₁² when the second moment is floored
pub const SECOND_MOMENT_FLOOR: f64 = 1.0001;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MomentFlags: u32 {
        const NONE                  = 0;
        const SECOND_MOMENT_FLOORED = 1 << 0;
        const DEGENERATE_VOLATILITY = 1 << 1;
    }
}

/// Matched moments and equivalent lognormal parameters
#[derive(Debug, Clone, PartialEq)]
pub struct BasketMoments {
    /// A₀ = Σ wᵢ Sᵢ(0)
    pub basket_value: f64,
    pub forwards: Vec<f64>,
    pub m1: f64,
    pub m2: f64,
    pub sigma_hat: f64,
    /// Diagnostic only; the pricing formula does not use it
    pub mu_hat: f64,
    pub discount_factor: f64,
    pub flags: MomentFlags,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentMatchingPricer {
    integration_steps: usize,
}

impl Default for MomentMatchingPricer {
    fn default() -> Self {
        MomentMatchingPricer {
            integration_steps: DEFAULT_INTEGRATION_STEPS,
        }
    }
}

impl MomentMatchingPricer {
    pub fn new(integration_steps: usize) -> BasketResult<Self> {
        validate_steps("integration_steps", integration_steps)?;
        Ok(MomentMatchingPricer { integration_steps })
    }

    pub fn integration_steps(&self) -> usize {
        self.integration_steps
    }

    pub fn moments(&self, option: &BasketOption<'_>) -> BasketResult<BasketMoments> {
        let basket = option.basket();
        let t = option.maturity();
        let steps = self.integration_steps;
        validate_positive("maturity", t)?;

        let rate_integral = basket.rate().integrate(t, steps)?;
        let discount_factor = (-rate_integral).exp();

        let forwards: Vec<f64> = basket
            .assets()
            .iter()
            .map(|a| a.spot() * (rate_integral - a.dividend_yield() * t).exp())
            .collect();
        let weights = basket.weights();

        let m1: f64 = weights.iter().zip(&forwards).map(|(w, f)| w * f).sum();

        let n = basket.len();
        let mut m2 = 0.0;
        for i in 0..n {
            let vol_i = basket.assets()[i].volatility();
            for j in i..n {
                let vol_j = basket.assets()[j].volatility();
                let cov = integrated_cross_variance(vol_i, vol_j, t, steps)?;
                let rho = basket.correlation().get(i, j)?;
                let term = weights[i] * weights[j] * forwards[i] * forwards[j] * (rho * cov).exp();
                m2 += if i == j { term } else { 2.0 * term };
            }
        }

        let mut flags = MomentFlags::NONE;
        if m2 <= m1 * m1 {
            warn!(
                m1,
                m2,
                "second moment below M1^2; flooring equivalent variance (approximation artifact)"
            );
            m2 = m1 * m1 * SECOND_MOMENT_FLOOR;
            flags |= MomentFlags::SECOND_MOMENT_FLOORED;
        }

        let sigma_hat_sq = (m2 / (m1 * m1)).ln() / t;
        let sigma_hat = sigma_hat_sq.max(0.0).sqrt();
        if sigma_hat <= 0.0 {
            flags |= MomentFlags::DEGENERATE_VOLATILITY;
        }
        let basket_value = basket.spot_value();
        let mu_hat = (m1 / basket_value).ln() / t;

        if !(m1.is_finite() && m2.is_finite() && sigma_hat.is_finite()) {
            return Err(BasketError::NumericalInstability {
                method: "moment matching".to_string(),
                reason: format!("non-finite moments: M1 = {}, M2 = {}, sigma = {}", m1, m2, sigma_hat),
            });
        }

        Ok(BasketMoments {
            basket_value,
            forwards,
            m1,
            m2,
            sigma_hat,
            mu_hat,
            discount_factor,
            flags,
        })
    }

    pub fn price(&self, option: &BasketOption<'_>) -> BasketResult<f64> {
        let moments = self.moments(option)?;
        let price = black_forward_price(
            option.kind(),
            moments.m1,
            option.strike(),
            moments.discount_factor,
            moments.sigma_hat,
            option.maturity(),
        );

        debug!(
            kind = %option.kind(),
            strike = option.strike(),
            maturity = option.maturity(),
            m1 = moments.m1,
            sigma_hat = moments.sigma_hat,
            price,
            "moment-matching price"
        );
        Ok(price)
    }
}

/// Price with the default quadrature resolution
pub fn price_moment_matching(option: &BasketOption<'_>) -> BasketResult<f64> {
    MomentMatchingPricer::default().price(option)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mc::payoffs::OptionKind;
    use crate::models::{build_basket, Asset};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_zero_volatility_floors_second_moment() {
        let basket = build_basket(
            vec![Asset::new("A", 100.0, 0.0, 0.0).unwrap()],
            vec![1.0],
            vec![vec![1.0]],
            0.05,
        )
        .unwrap();
        let option = BasketOption::new(&basket, OptionKind::Call, 90.0, 1.0).unwrap();

        let moments = MomentMatchingPricer::default().moments(&option).unwrap();
        assert!(moments.flags.contains(MomentFlags::SECOND_MOMENT_FLOORED));
        assert_abs_diff_eq!(moments.m2, moments.m1 * moments.m1 * SECOND_MOMENT_FLOOR, epsilon = 1e-9);
        assert_abs_diff_eq!(moments.sigma_hat, SECOND_MOMENT_FLOOR.ln().sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_forwards_and_drift() {
        let basket = build_basket(
            vec![
                Asset::new("A", 100.0, 0.2, 0.02).unwrap(),
                Asset::new("B", 120.0, 0.25, 0.015).unwrap(),
            ],
            vec![0.6, 0.4],
            vec![vec![1.0, 0.3], vec![0.3, 1.0]],
            0.03,
        )
        .unwrap();
        let option = BasketOption::new(&basket, OptionKind::Call, 108.0, 2.0).unwrap();
        let moments = MomentMatchingPricer::default().moments(&option).unwrap();

        assert_abs_diff_eq!(moments.forwards[0], 100.0 * (0.02f64).exp(), epsilon = 1e-12);
        assert_abs_diff_eq!(moments.forwards[1], 120.0 * (0.03f64).exp(), epsilon = 1e-12);
        assert_abs_diff_eq!(moments.discount_factor, (-0.06f64).exp(), epsilon = 1e-15);
        assert_abs_diff_eq!(moments.mu_hat, (moments.m1 / 108.0).ln() / 2.0, epsilon = 1e-15);
        assert_eq!(moments.flags, MomentFlags::NONE);
    }

    #[test]
    fn test_rejects_zero_integration_steps() {
        assert!(MomentMatchingPricer::new(0).is_err());
        assert_eq!(MomentMatchingPricer::new(250).unwrap().integration_steps(), 250);
    }
}
