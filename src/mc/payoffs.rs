//! Basket Option Payoff Functions
//!
//! # Mathematical Definitions
//!
//! For a basket value V at maturity and a strike K:
//! - **Call**: max(V - K, 0)
//! - **Put**: max(K - V, 0)
//!
//! # Basket aggregations
//!
//! - **Arithmetic**: V = Σ wᵢ Sᵢ(T), the traded underlying
//! - **Geometric**: G = Π Sᵢ(T)^wᵢ, lognormal whenever every Sᵢ is, which is
//!   what makes it usable as a control variate with a closed-form mean

use crate::error::{BasketError, BasketResult};
use std::fmt;
use std::str::FromStr;

/// Option kind carried by a basket option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OptionKind {
    Call,
    Put,
}

impl OptionKind {
    /// Payoff of the option on an underlying value
    pub fn payoff(&self, value: f64, strike: f64) -> f64 {
        match self {
            OptionKind::Call => (value - strike).max(0.0),
            OptionKind::Put => (strike - value).max(0.0),
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionKind::Call => write!(f, "Call"),
            OptionKind::Put => write!(f, "Put"),
        }
    }
}

impl FromStr for OptionKind {
    type Err = BasketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" | "c" => Ok(OptionKind::Call),
            "put" | "p" => Ok(OptionKind::Put),
            other => Err(BasketError::UnsupportedOperation {
                operation: "option kind".to_string(),
                context: format!("'{}' is not a supported option kind (call, put)", other),
            }),
        }
    }
}

/// Weighted arithmetic basket value Σ wᵢ Sᵢ
pub fn arithmetic_basket(weights: &[f64], prices: &[f64]) -> f64 {
    weights.iter().zip(prices).map(|(w, s)| w * s).sum()
}

/// Weighted geometric basket value Π Sᵢ^wᵢ
pub fn geometric_basket(weights: &[f64], prices: &[f64]) -> f64 {
    weights
        .iter()
        .zip(prices)
        .fold(1.0, |acc, (w, s)| acc * s.powf(*w))
}

/// Payoff of the arithmetic basket option and, on request, of its geometric control
pub fn basket_payoffs(
    kind: OptionKind,
    strike: f64,
    weights: &[f64],
    prices: &[f64],
    with_control: bool,
) -> BasketResult<(f64, Option<f64>)> {
    if weights.len() != prices.len() {
        return Err(BasketError::InvalidConfiguration {
            field: "prices".to_string(),
            reason: format!("{} prices for {} weights", prices.len(), weights.len()),
        });
    }
    let payoff = kind.payoff(arithmetic_basket(weights, prices), strike);
    let control = with_control.then(|| kind.payoff(geometric_basket(weights, prices), strike));
    Ok((payoff, control))
}
