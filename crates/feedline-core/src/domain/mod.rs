//! Domain entities - the core business objects.

mod comment;
mod event;
mod moderation;
mod page;
mod post;
mod projection;
mod user;

pub use comment::{Comment, NewComment};
pub use event::{
    CommentEvent, EventAction, HeatFeedEvent, PostCacheEvent, PostEvent, PostViewEvent, channels,
};
pub use moderation::Moderatable;
pub use page::{Page, PageRequest};
pub use post::{
    MAX_CONTENT_LEN, NewPost, Post, PostOwner, PostRevision, PostState, normalize_hashtags,
    validate_content,
};
pub use projection::{CachedFeed, CachedPost, CachedUser, FeedEntry, Projection};
pub use user::{DirectoryUser, Project};
