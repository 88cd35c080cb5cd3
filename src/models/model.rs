// src/models/model.rs
use crate::error::BasketResult;
use crate::models::curves::trapezoid;

/// Deterministic time-indexed parameter: a short rate r(t) or a volatility σ(t).
///
/// Integrals default to composite trapezoidal quadrature over `steps` uniform
/// sub-intervals of [0, T]; implementations with a closed form override them.
pub trait TimeDependentCurve {
    fn value_at(&self, t: f64) -> BasketResult<f64>;

    /// ∫₀ᵀ value(s) ds
    fn integrate(&self, maturity: f64, steps: usize) -> BasketResult<f64> {
        trapezoid(|t| self.value_at(t), maturity, steps)
    }

    /// ∫₀ᵀ value(s)² ds
    fn integrated_variance(&self, maturity: f64, steps: usize) -> BasketResult<f64> {
        trapezoid(|t| self.value_at(t).map(|v| v * v), maturity, steps)
    }

    /// The constant level, when the curve is flat by construction
    fn flat_value(&self) -> Option<f64> {
        None
    }

    /// exp(-∫₀ᵀ value(s) ds), meaningful when the curve is a short rate
    fn discount_factor(&self, maturity: f64, steps: usize) -> BasketResult<f64> {
        Ok((-self.integrate(maturity, steps)?).exp())
    }
}
