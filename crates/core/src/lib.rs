//! Domain core of the shop data-synchronization service: models, the
//! repository and client contracts, the reconciliation engine, and the job
//! queue machinery. Storage and HTTP crates plug in behind the traits
//! defined here.

pub mod errors;
pub mod jobs;
pub mod shops;
pub mod sync;

pub use errors::{Error, Result};

#[cfg(test)]
pub(crate) mod test_support;
