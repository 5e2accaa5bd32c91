use serde::{Deserialize, Serialize};

/// User record as served by the user directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub follower_ids: Vec<i64>,
    #[serde(default)]
    pub followee_ids: Vec<i64>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl DirectoryUser {
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: None,
            follower_ids: Vec::new(),
            followee_ids: Vec::new(),
            active: true,
        }
    }

    pub fn with_followers(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.follower_ids = ids.into_iter().collect();
        self
    }

    pub fn with_followees(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.followee_ids = ids.into_iter().collect();
        self
    }
}

/// Project record as served by the project directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub owner_id: i64,
}
