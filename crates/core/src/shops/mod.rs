//! Shop domain models and repository contract.

mod shop_model;

pub use shop_model::*;
