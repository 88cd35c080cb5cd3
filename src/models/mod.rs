pub mod asset;
pub mod basket;
pub mod curves;
pub mod model;

pub use asset::Asset;
pub use basket::{build_basket, Basket, BasketOption};
pub use curves::{Curve, FlatCurve, PiecewiseLinearCurve, DEFAULT_INTEGRATION_STEPS};
pub use model::TimeDependentCurve;
