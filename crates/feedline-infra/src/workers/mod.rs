//! Worker pools for background work.

mod bounded;

pub use bounded::{BoundedTaskPool, WorkerPoolConfig};
