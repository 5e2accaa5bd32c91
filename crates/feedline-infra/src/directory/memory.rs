//! In-memory user and project directory, seeded at startup or by tests.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use feedline_core::domain::{DirectoryUser, Page, PageRequest, Project};
use feedline_core::ports::{DirectoryError, ProjectDirectory, UserDirectory};

#[derive(Default)]
pub struct InMemoryDirectory {
    users: RwLock<BTreeMap<i64, DirectoryUser>>,
    projects: RwLock<HashMap<i64, Project>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user record.
    pub async fn put_user(&self, user: DirectoryUser) {
        self.users.write().await.insert(user.id, user);
    }

    /// Add or replace a project record.
    pub async fn put_project(&self, project: Project) {
        self.projects.write().await.insert(project.id, project);
    }

    /// Record that `follower` follows `followee`, updating both users.
    /// Unknown ids are ignored.
    pub async fn follow(&self, follower: i64, followee: i64) {
        let mut users = self.users.write().await;
        if !users.contains_key(&follower) || !users.contains_key(&followee) {
            return;
        }
        if let Some(user) = users.get_mut(&follower) {
            if !user.followee_ids.contains(&followee) {
                user.followee_ids.push(followee);
            }
        }
        if let Some(user) = users.get_mut(&followee) {
            if !user.follower_ids.contains(&follower) {
                user.follower_ids.push(follower);
            }
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn get_user(&self, id: i64) -> Result<DirectoryUser, DirectoryError> {
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::NotFound { entity: "User", id })
    }

    async fn get_users_by_ids(&self, ids: &[i64]) -> Result<Vec<DirectoryUser>, DirectoryError> {
        let users = self.users.read().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn list_users(&self, page: PageRequest) -> Result<Page<DirectoryUser>, DirectoryError> {
        let users = self.users.read().await;
        Ok(Page::from_vec(users.values().cloned().collect(), page))
    }
}

#[async_trait]
impl ProjectDirectory for InMemoryDirectory {
    async fn get_project(&self, id: i64) -> Result<Project, DirectoryError> {
        self.projects
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::NotFound { entity: "Project", id })
    }
}
