//! Sync domain: state models, source/platform contracts, and the
//! reconciliation engine.

mod platform_model;
mod reconcile_engine;
mod source_model;
mod sync_state_model;

pub use platform_model::*;
pub use reconcile_engine::*;
pub use source_model::*;
pub use sync_state_model::*;
