//! User and project directory clients - HTTP and in-memory.

mod http;
mod memory;

pub use http::{DirectoryConfig, HttpDirectory};
pub use memory::InMemoryDirectory;
