//! Profanity moderation: the banned-word dictionary and the batch sweep.

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use chrono::Utc;

use crate::domain::Moderatable;
use crate::error::RepoError;
use crate::ports::TaskPool;

#[derive(Debug, thiserror::Error)]
pub enum DictionaryError {
    #[error("Cannot read moderation dictionary {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Moderation dictionary {0} has no words")]
    Empty(PathBuf),
}

/// Immutable set of banned words, loaded once at startup.
#[derive(Debug, Clone)]
pub struct ModerationDictionary {
    words: HashSet<String>,
}

impl ModerationDictionary {
    /// Load one word per line. Blank lines are ignored.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DictionaryError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| DictionaryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dictionary = Self::from_words(raw.lines());
        if dictionary.is_empty() {
            return Err(DictionaryError::Empty(path.to_path_buf()));
        }
        tracing::info!(path = %path.display(), words = dictionary.len(), "Moderation dictionary loaded");
        Ok(dictionary)
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Exact token match after lowercasing and stripping everything but
    /// Latin and Cyrillic letters, digits and whitespace.
    pub fn contains_profanity(&self, content: &str) -> bool {
        let cleaned: String = content
            .to_lowercase()
            .chars()
            .filter(|c| is_allowed(*c))
            .collect();
        cleaned.split_whitespace().any(|token| self.words.contains(token))
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c.is_whitespace() || matches!(c, 'а'..='я' | 'ё')
}

type SaveFuture = Pin<Box<dyn Future<Output = Result<(), RepoError>> + Send>>;

/// Persists one moderated sublist.
pub type SaveBatch<T> = Arc<dyn Fn(Vec<T>) -> SaveFuture + Send + Sync>;

/// Wrap an async batch writer as a [`SaveBatch`].
pub fn save_batch<T, F, Fut>(save: F) -> SaveBatch<T>
where
    F: Fn(Vec<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), RepoError>> + Send + 'static,
{
    Arc::new(move |batch: Vec<T>| -> SaveFuture { Box::pin(save(batch)) })
}

/// Splits unverified items into sublists and moderates each on the pool.
pub struct ModerationSweep {
    dictionary: Arc<ModerationDictionary>,
    pool: Arc<dyn TaskPool>,
    sublist_size: usize,
}

impl ModerationSweep {
    pub fn new(dictionary: Arc<ModerationDictionary>, pool: Arc<dyn TaskPool>, sublist_size: usize) -> Self {
        Self {
            dictionary,
            pool,
            sublist_size: sublist_size.max(1),
        }
    }

    /// Queue `items` for moderation. Failures are logged, never returned.
    pub async fn submit<T>(&self, kind: &'static str, items: Vec<T>, save: SaveBatch<T>)
    where
        T: Moderatable + Send + 'static,
    {
        if items.is_empty() {
            tracing::debug!(kind, "Nothing to moderate");
            return;
        }
        tracing::info!(kind, items = items.len(), sublist_size = self.sublist_size, "Starting moderation");

        let mut items = items.into_iter().peekable();
        while items.peek().is_some() {
            let mut batch: Vec<T> = items.by_ref().take(self.sublist_size).collect();
            let dictionary = self.dictionary.clone();
            let save = save.clone();

            let task = Box::pin(async move {
                let now = Utc::now();
                let mut rejected = 0usize;
                for item in batch.iter_mut() {
                    let passed = !dictionary.contains_profanity(item.content());
                    if !passed {
                        rejected += 1;
                    }
                    item.apply_moderation(passed, now);
                }
                let size = batch.len();
                match save(batch).await {
                    Ok(()) => tracing::debug!(kind, size, rejected, "Moderated batch saved"),
                    Err(e) => tracing::error!(kind, size, error = %e, "Failed to save moderated batch"),
                }
            });

            if let Err(e) = self.pool.submit(task).await {
                tracing::error!(kind, pool = self.pool.name(), error = %e, "Moderation batch not queued");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Comment, Post, PostOwner};
    use crate::services::testing::InlinePool;
    use std::sync::Mutex;
    use uuid::Uuid;

    fn dictionary() -> ModerationDictionary {
        ModerationDictionary::from_words(["shit", "fuck", " Блин "])
    }

    #[test]
    fn test_clean_content_passes() {
        assert!(!dictionary().contains_profanity("this is fine"));
    }

    #[test]
    fn test_banned_token_fails() {
        assert!(dictionary().contains_profanity("you are shit"));
        assert!(dictionary().contains_profanity("You are SHIT!"));
        assert!(dictionary().contains_profanity("ну блин"));
    }

    #[test]
    fn test_only_exact_tokens_match() {
        assert!(!dictionary().contains_profanity("shitake mushrooms"));
        assert!(!dictionary().contains_profanity("bullshit"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = ModerationDictionary::load("/definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, DictionaryError::Io { .. }));
    }

    #[tokio::test]
    async fn test_sweep_marks_items_and_saves_per_sublist() {
        let sweep = ModerationSweep::new(Arc::new(dictionary()), Arc::new(InlinePool::default()), 2);
        let saved: Arc<Mutex<Vec<Vec<Post>>>> = Arc::new(Mutex::new(Vec::new()));

        let posts = vec![
            Post::draft(PostOwner::Author(1), "this is fine".into(), vec![], None),
            Post::draft(PostOwner::Author(1), "you are shit".into(), vec![], None),
            Post::draft(PostOwner::Author(2), "hello".into(), vec![], None),
        ];

        let sink = saved.clone();
        let save = save_batch(move |batch: Vec<Post>| {
            let sink = sink.clone();
            async move {
                sink.lock().unwrap().push(batch);
                Ok(())
            }
        });
        sweep.submit("post", posts, save).await;

        let saved = saved.lock().unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].len(), 2);
        assert_eq!(saved[1].len(), 1);
        let flags: Vec<bool> = saved.iter().flatten().map(|p| p.verified).collect();
        assert_eq!(flags, vec![true, false, true]);
        assert!(saved.iter().flatten().all(|p| p.verified_date.is_some()));
    }

    #[tokio::test]
    async fn test_sweep_handles_comments() {
        let sweep = ModerationSweep::new(Arc::new(dictionary()), Arc::new(InlinePool::default()), 10);
        let saved: Arc<Mutex<Vec<Comment>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = saved.clone();
        let save = save_batch(move |batch: Vec<Comment>| {
            let sink = sink.clone();
            async move {
                sink.lock().unwrap().extend(batch);
                Ok(())
            }
        });

        let comment = Comment::new(Uuid::new_v4(), 5, "fuck this".into());
        sweep.submit("comment", vec![comment], save).await;

        let saved = saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert!(!saved[0].verified);
    }
}
