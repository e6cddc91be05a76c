//! Durable job queue, dispatch and worker pool.

mod dispatch_service;
mod job_model;
mod worker_pool;

pub use dispatch_service::*;
pub use job_model::*;
pub use worker_pool::*;
