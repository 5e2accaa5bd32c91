//! Directory ports - remote user and project lookups.

use async_trait::async_trait;

use crate::domain::{DirectoryUser, Page, PageRequest, Project};

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, id: i64) -> Result<DirectoryUser, DirectoryError>;

    /// Unknown ids are left out of the result.
    async fn get_users_by_ids(&self, ids: &[i64]) -> Result<Vec<DirectoryUser>, DirectoryError>;

    async fn list_users(&self, page: PageRequest) -> Result<Page<DirectoryUser>, DirectoryError>;
}

#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    async fn get_project(&self, id: i64) -> Result<Project, DirectoryError>;
}

/// Directory errors.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Directory unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed directory response: {0}")]
    Decode(String),
}
