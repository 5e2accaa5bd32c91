//! Follower fan-out batching.

use crate::domain::{EventAction, Post, PostEvent};

/// Split follower ids into contiguous chunks of at most `batch_size`.
pub fn follower_batches(follower_ids: &[i64], batch_size: usize) -> Vec<Vec<i64>> {
    follower_ids
        .chunks(batch_size.max(1))
        .map(<[i64]>::to_vec)
        .collect()
}

/// Build the events announcing `action` on `post` to `follower_ids`.
///
/// CREATE and DELETE produce one event per batch. DELETE still produces a
/// single event with an empty follower list when there are no followers.
/// UPDATE is a single broadcast event with no follower list.
pub fn post_events(action: EventAction, post: &Post, follower_ids: &[i64], batch_size: usize) -> Vec<PostEvent> {
    match action {
        EventAction::Update => vec![PostEvent::new(action, post, Vec::new())],
        EventAction::Delete if follower_ids.is_empty() => {
            vec![PostEvent::new(action, post, Vec::new())]
        }
        EventAction::Create | EventAction::Delete => follower_batches(follower_ids, batch_size)
            .into_iter()
            .map(|batch| PostEvent::new(action, post, batch))
            .collect(),
    }
}
