// src/models/basket.rs
//! Basket and basket option entities.
//!
//! Both are validated once at construction and read-only afterwards; the
//! moment-matching and Monte Carlo pricers consume them identically.

use super::asset::Asset;
use super::curves::Curve;
use crate::correlation::CorrelationMatrix;
use crate::error::{validation::*, BasketError, BasketResult};
use crate::mc::payoffs::{arithmetic_basket, OptionKind};

/// Tolerance on Σ wᵢ = 1
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Weighted basket of correlated assets sharing one rate curve
#[derive(Debug, Clone, PartialEq)]
pub struct Basket {
    assets: Vec<Asset>,
    weights: Vec<f64>,
    correlation: CorrelationMatrix,
    rate: Curve,
}

impl Basket {
    pub fn new(
        assets: Vec<Asset>,
        weights: Vec<f64>,
        correlation: CorrelationMatrix,
        rate: impl Into<Curve>,
    ) -> BasketResult<Self> {
        let rate = rate.into();

        if assets.is_empty() {
            return Err(BasketError::InvalidConfiguration {
                field: "assets".to_string(),
                reason: "basket must contain at least one asset".to_string(),
            });
        }
        if weights.len() != assets.len() {
            return Err(BasketError::InvalidConfiguration {
                field: "weights".to_string(),
                reason: format!("{} weights for {} assets", weights.len(), assets.len()),
            });
        }
        for (i, &w) in weights.iter().enumerate() {
            validate_positive(&format!("weights[{}]", i), w)?;
        }
        let total: f64 = weights.iter().sum();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(BasketError::InvalidParameters {
                parameter: "sum(weights)".to_string(),
                value: total,
                constraint: "must equal 1".to_string(),
            });
        }
        if correlation.dim() != assets.len() {
            return Err(BasketError::InvalidCorrelation {
                reason: format!(
                    "matrix is {}×{} but basket has {} assets",
                    correlation.dim(),
                    correlation.dim(),
                    assets.len()
                ),
            });
        }
        rate.validate_levels("rate", validate_finite)?;

        Ok(Basket {
            assets,
            weights,
            correlation,
            rate,
        })
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn correlation(&self) -> &CorrelationMatrix {
        &self.correlation
    }

    pub fn rate(&self) -> &Curve {
        &self.rate
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn spots(&self) -> Vec<f64> {
        self.assets.iter().map(Asset::spot).collect()
    }

    /// Current basket value A₀ = Σ wᵢ Sᵢ(0)
    pub fn spot_value(&self) -> f64 {
        arithmetic_basket(&self.weights, &self.spots())
    }
}

/// Build a basket from raw correlation rows
pub fn build_basket(
    assets: Vec<Asset>,
    weights: Vec<f64>,
    correlation: Vec<Vec<f64>>,
    rate: impl Into<Curve>,
) -> BasketResult<Basket> {
    Basket::new(assets, weights, CorrelationMatrix::new(correlation)?, rate)
}

/// European option on a basket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasketOption<'a> {
    basket: &'a Basket,
    kind: OptionKind,
    strike: f64,
    maturity: f64,
}

impl<'a> BasketOption<'a> {
    pub fn new(basket: &'a Basket, kind: OptionKind, strike: f64, maturity: f64) -> BasketResult<Self> {
        validate_positive("strike", strike)?;
        validate_positive("maturity", maturity)?;
        Ok(BasketOption {
            basket,
            kind,
            strike,
            maturity,
        })
    }

    pub fn basket(&self) -> &'a Basket {
        self.basket
    }

    pub fn kind(&self) -> OptionKind {
        self.kind
    }

    pub fn strike(&self) -> f64 {
        self.strike
    }

    pub fn maturity(&self) -> f64 {
        self.maturity
    }

    /// Payoff on a terminal basket value
    pub fn payoff(&self, basket_value: f64) -> f64 {
        self.kind.payoff(basket_value, self.strike)
    }
}
