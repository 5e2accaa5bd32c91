use chrono::{DateTime, Utc};

/// Content that goes through the profanity sweep.
pub trait Moderatable {
    fn content(&self) -> &str;

    /// Never verified, failed verification, or edited since the last check.
    fn needs_moderation(&self) -> bool;

    fn apply_moderation(&mut self, passed: bool, now: DateTime<Utc>);
}
