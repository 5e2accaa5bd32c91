//! # Feedline Infrastructure
//!
//! Concrete implementations of the ports defined in `feedline-core`:
//! post and comment stores, the versioned read cache, the event bus,
//! directory clients and bounded worker pools.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external services, in-memory only
//! - `postgres` - PostgreSQL post store via SeaORM
//! - `redis` - Redis read cache and Redis Streams event bus

pub mod cache;
pub mod database;
pub mod directory;
pub mod pubsub;
pub mod workers;

// Re-exports - In-Memory
pub use cache::InMemoryCache;
pub use database::{InMemoryCommentRepository, InMemoryPostRepository};
pub use directory::{DirectoryConfig, HttpDirectory, InMemoryDirectory};
pub use pubsub::InMemoryPubSub;
pub use workers::{BoundedTaskPool, WorkerPoolConfig};

// Re-exports - PostgreSQL
#[cfg(feature = "postgres")]
pub use database::{DatabaseConfig, PostgresCommentRepository, PostgresPostRepository};

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use cache::{RedisCache, RedisConfig};
#[cfg(feature = "redis")]
pub use pubsub::RedisPubSub;
