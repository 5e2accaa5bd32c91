//! # Feedline Core
//!
//! The domain layer of the post distribution backend: posts and comments,
//! the publish/update/delete state machine, the versioned read-cache
//! protocol and the batched fan-out of change events to followers.
//!
//! Infrastructure (database, cache, message bus, directory services, worker
//! pools) is reached only through the traits in [`ports`].

pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

pub use error::DomainError;
