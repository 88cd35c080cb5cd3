// src/models/curves.rs
//! Deterministic Rate and Volatility Curves
//!
//! # Interpolation
//!
//! A piecewise-linear curve is defined by control points (tᵢ, vᵢ) sorted by
//! time. Between two points the value is interpolated linearly; before the
//! first and after the last point it is clamped to the boundary value:
//! ```text
//! v(t) = v₀                                   t ≤ t₀
//! v(t) = vᵢ + (t - tᵢ)/(tᵢ₊₁ - tᵢ) (vᵢ₊₁ - vᵢ)   tᵢ ≤ t ≤ tᵢ₊₁
//! v(t) = vₙ                                   t ≥ tₙ
//! ```
//!
//! # Integration
//!
//! Integrals over [0, T] use the composite trapezoidal rule with a uniform
//! step h = T/N:
//! ```text
//! ∫₀ᵀ f ≈ h [½f(0) + f(h) + ... + f((N-1)h) + ½f(T)]
//! ```
//! N is always supplied by the caller; [`DEFAULT_INTEGRATION_STEPS`] is the
//! resolution the pricers use unless configured otherwise.

use super::model::TimeDependentCurve;
use crate::error::{validation::*, BasketError, BasketResult};

/// Default number of trapezoidal sub-intervals
pub const DEFAULT_INTEGRATION_STEPS: usize = 1000;

/// Composite trapezoidal rule for ∫₀ᵀ f(t) dt
pub fn trapezoid<F>(mut f: F, upper: f64, steps: usize) -> BasketResult<f64>
where
    F: FnMut(f64) -> BasketResult<f64>,
{
    check_integration_steps(steps)?;
    if upper <= 0.0 {
        return Ok(0.0);
    }

    let dt = upper / steps as f64;
    let mut integral = 0.0;
    for i in 0..=steps {
        let value = f(i as f64 * dt)?;
        if i == 0 || i == steps {
            integral += 0.5 * value * dt;
        } else {
            integral += value * dt;
        }
    }
    Ok(integral)
}

fn check_integration_steps(steps: usize) -> BasketResult<()> {
    if steps == 0 {
        return Err(BasketError::InvalidConfiguration {
            field: "integration_steps".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }
    Ok(())
}

/// ∫₀ᵀ σ_a(s) σ_b(s) ds, the covariance kernel between two assets
pub fn integrated_cross_variance<A, B>(
    vol_a: &A,
    vol_b: &B,
    maturity: f64,
    steps: usize,
) -> BasketResult<f64>
where
    A: TimeDependentCurve + ?Sized,
    B: TimeDependentCurve + ?Sized,
{
    if let (Some(a), Some(b)) = (vol_a.flat_value(), vol_b.flat_value()) {
        check_integration_steps(steps)?;
        return Ok(if maturity <= 0.0 { 0.0 } else { a * b * maturity });
    }
    trapezoid(
        |t| Ok(vol_a.value_at(t)? * vol_b.value_at(t)?),
        maturity,
        steps,
    )
}

/// Constant curve with exact integrals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatCurve {
    value: f64,
}

impl FlatCurve {
    pub fn new(value: f64) -> Self {
        FlatCurve { value }
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl TimeDependentCurve for FlatCurve {
    fn value_at(&self, _t: f64) -> BasketResult<f64> {
        Ok(self.value)
    }

    fn integrate(&self, maturity: f64, steps: usize) -> BasketResult<f64> {
        check_integration_steps(steps)?;
        Ok(if maturity <= 0.0 { 0.0 } else { self.value * maturity })
    }

    fn integrated_variance(&self, maturity: f64, steps: usize) -> BasketResult<f64> {
        check_integration_steps(steps)?;
        Ok(if maturity <= 0.0 {
            0.0
        } else {
            self.value * self.value * maturity
        })
    }

    fn flat_value(&self) -> Option<f64> {
        Some(self.value)
    }
}

/// Linearly interpolated curve over (time, value) control points
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PiecewiseLinearCurve {
    points: Vec<(f64, f64)>,
}

impl PiecewiseLinearCurve {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points<I>(points: I) -> BasketResult<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut curve = Self::new();
        for (t, v) in points {
            curve.add_point(t, v)?;
        }
        Ok(curve)
    }

    /// Insert a control point, replacing any point already at `time`
    pub fn add_point(&mut self, time: f64, value: f64) -> BasketResult<()> {
        validate_non_negative("time", time)?;
        validate_finite("value", value)?;

        let idx = self.points.partition_point(|&(t, _)| t < time);
        match self.points.get_mut(idx) {
            Some(point) if point.0 == time => point.1 = value,
            _ => self.points.insert(idx, (time, value)),
        }
        Ok(())
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl TimeDependentCurve for PiecewiseLinearCurve {
    fn value_at(&self, t: f64) -> BasketResult<f64> {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                return Err(BasketError::EmptyCurve {
                    curve: "piecewise-linear".to_string(),
                })
            }
        };

        if t.is_nan() {
            return Err(BasketError::InvalidParameters {
                parameter: "t".to_string(),
                value: t,
                constraint: "curve query time must not be NaN".to_string(),
            });
        }
        if t <= first.0 {
            return Ok(first.1);
        }
        if t >= last.0 {
            return Ok(last.1);
        }

        // first.0 < t < last.0, so 1 <= idx <= len - 1
        let idx = self.points.partition_point(|&(time, _)| time <= t);
        let (t1, v1) = self.points[idx - 1];
        let (t2, v2) = self.points[idx];
        let weight = (t - t1) / (t2 - t1);
        Ok(v1 + weight * (v2 - v1))
    }
}

/// Rate or volatility term structure: either flat or piecewise linear
#[derive(Debug, Clone, PartialEq)]
pub enum Curve {
    Flat(FlatCurve),
    PiecewiseLinear(PiecewiseLinearCurve),
}

impl Curve {
    pub fn constant(value: f64) -> Self {
        Curve::Flat(FlatCurve::new(value))
    }

    pub fn from_points<I>(points: I) -> BasketResult<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        PiecewiseLinearCurve::from_points(points).map(Curve::PiecewiseLinear)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Curve::Flat(_) => false,
            Curve::PiecewiseLinear(curve) => curve.is_empty(),
        }
    }

    /// Check that the curve has points and every level satisfies `check`
    pub(crate) fn validate_levels<F>(&self, name: &str, check: F) -> BasketResult<()>
    where
        F: Fn(&str, f64) -> BasketResult<()>,
    {
        match self {
            Curve::Flat(curve) => check(name, curve.value()),
            Curve::PiecewiseLinear(curve) if curve.is_empty() => Err(BasketError::EmptyCurve {
                curve: name.to_string(),
            }),
            Curve::PiecewiseLinear(curve) => {
                curve.points().iter().try_for_each(|&(_, v)| check(name, v))
            }
        }
    }
}

impl From<f64> for Curve {
    fn from(value: f64) -> Self {
        Curve::constant(value)
    }
}

impl From<FlatCurve> for Curve {
    fn from(curve: FlatCurve) -> Self {
        Curve::Flat(curve)
    }
}

impl From<PiecewiseLinearCurve> for Curve {
    fn from(curve: PiecewiseLinearCurve) -> Self {
        Curve::PiecewiseLinear(curve)
    }
}

impl TimeDependentCurve for Curve {
    fn value_at(&self, t: f64) -> BasketResult<f64> {
        match self {
            Curve::Flat(c) => c.value_at(t),
            Curve::PiecewiseLinear(c) => c.value_at(t),
        }
    }

    fn integrate(&self, maturity: f64, steps: usize) -> BasketResult<f64> {
        match self {
            Curve::Flat(c) => c.integrate(maturity, steps),
            Curve::PiecewiseLinear(c) => c.integrate(maturity, steps),
        }
    }

    fn integrated_variance(&self, maturity: f64, steps: usize) -> BasketResult<f64> {
        match self {
            Curve::Flat(c) => c.integrated_variance(maturity, steps),
            Curve::PiecewiseLinear(c) => c.integrated_variance(maturity, steps),
        }
    }

    fn flat_value(&self) -> Option<f64> {
        match self {
            Curve::Flat(c) => c.flat_value(),
            Curve::PiecewiseLinear(_) => None,
        }
    }
}
