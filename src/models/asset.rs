// src/models/asset.rs
use super::curves::Curve;
use crate::error::{validation::*, BasketResult};

/// Single underlying of a basket.
///
/// The volatility is either a constant (H1) or a deterministic curve σ(t) (H2);
/// the dividend yield is constant in both regimes.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    name: String,
    spot: f64,
    volatility: Curve,
    dividend_yield: f64,
}

impl Asset {
    pub fn new(
        name: impl Into<String>,
        spot: f64,
        volatility: impl Into<Curve>,
        dividend_yield: f64,
    ) -> BasketResult<Self> {
        let volatility = volatility.into();
        validate_positive("spot", spot)?;
        validate_non_negative("dividend_yield", dividend_yield)?;
        volatility.validate_levels("volatility", validate_non_negative)?;

        Ok(Asset {
            name: name.into(),
            spot,
            volatility,
            dividend_yield,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spot(&self) -> f64 {
        self.spot
    }

    pub fn volatility(&self) -> &Curve {
        &self.volatility
    }

    pub fn dividend_yield(&self) -> f64 {
        self.dividend_yield
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::curves::PiecewiseLinearCurve;

    #[test]
    fn test_constant_and_curve_volatility() {
        let flat = Asset::new("AAA", 100.0, 0.2, 0.02).unwrap();
        assert_eq!(flat.volatility(), &Curve::constant(0.2));

        let curve = Curve::from_points([(0.0, 0.2), (1.0, 0.3)]).unwrap();
        let term = Asset::new("BBB", 50.0, curve.clone(), 0.0).unwrap();
        assert_eq!(term.volatility(), &curve);
        assert_eq!(term.name(), "BBB");
    }

    #[test]
    fn test_rejects_invalid_inputs() {
        assert!(Asset::new("A", 0.0, 0.2, 0.0).unwrap_err().is_validation());
        assert!(Asset::new("A", -10.0, 0.2, 0.0).is_err());
        assert!(Asset::new("A", 100.0, 0.2, -0.01).is_err());
        assert!(Asset::new("A", 100.0, -0.2, 0.0).is_err());
        assert!(Asset::new("A", 100.0, PiecewiseLinearCurve::new(), 0.0).is_err());
        assert!(Asset::new("A", 100.0, Curve::from_points([(0.0, 0.2), (1.0, -0.1)]).unwrap(), 0.0).is_err());
    }
}
