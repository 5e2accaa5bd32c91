//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod cache;
mod directory;
mod pubsub;
mod repository;
mod task_pool;

pub use cache::{Cache, CacheEntry, CacheError};
pub use directory::{DirectoryError, ProjectDirectory, UserDirectory};
pub use pubsub::{MessageHandler, PubSub, PubSubError, PubSubMessage};
pub use repository::{BaseRepository, CommentRepository, PostMutation, PostRepository};
pub use task_pool::{OverflowPolicy, PoolError, PoolStats, Task, TaskPool};
