//! Domain to wire conversions.

use serde::Deserialize;

use feedline_core::domain::{CachedPost, Comment, Page, PageRequest, Post};
use feedline_shared::dto::{CommentResponse, FeedPostResponse, PageResponse, PostResponse};

use crate::middleware::error::{AppError, AppResult};

/// `?page=&size=` query parameters, zero-based.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub size: Option<u64>,
}

/// Largest page a client may ask for.
pub const MAX_PAGE_SIZE: u64 = 1_000;

/// Offsets must fit a Postgres bigint.
const MAX_OFFSET: u64 = i64::MAX as u64;

impl PageQuery {
    /// Validated page request. Sizes above [`MAX_PAGE_SIZE`] and pages whose
    /// offset would not fit a bigint are rejected.
    pub fn request(&self) -> AppResult<PageRequest> {
        let defaults = PageRequest::default();
        let page = self.page.unwrap_or(defaults.page);
        let size = self.size.unwrap_or(defaults.size);

        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(AppError::BadRequest(format!(
                "size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        match page.checked_mul(size) {
            Some(offset) if offset <= MAX_OFFSET => Ok(PageRequest::new(page, size)),
            _ => Err(AppError::BadRequest(format!("page {} is out of range", page))),
        }
    }
}

pub fn post(post: Post) -> PostResponse {
    PostResponse {
        id: post.id,
        author_id: post.author_id(),
        project_id: post.project_id(),
        content: post.content,
        hashtags: post.hashtags,
        views: post.views,
        published: post.published,
        deleted: post.deleted,
        created_at: post.created_at,
        updated_at: post.updated_at,
        published_at: post.published_at,
        scheduled_at: post.scheduled_at,
    }
}

pub fn posts(posts: Vec<Post>) -> Vec<PostResponse> {
    posts.into_iter().map(post).collect()
}

pub fn comment(comment: Comment) -> CommentResponse {
    CommentResponse {
        id: comment.id,
        post_id: comment.post_id,
        author_id: comment.author_id,
        content: comment.content,
        created_at: comment.created_at,
        updated_at: comment.updated_at,
    }
}

pub fn feed_post(post: CachedPost) -> FeedPostResponse {
    FeedPostResponse {
        id: post.id,
        content: post.content,
        author_id: post.author_id,
        project_id: post.project_id,
        hashtags: post.hashtags,
        views: post.views,
        published_at: post.published_at,
    }
}

pub fn page<T, U>(page: Page<T>, f: impl FnMut(T) -> U) -> PageResponse<U> {
    PageResponse::new(
        page.content.into_iter().map(f).collect(),
        page.page,
        page.size,
        page.total_elements,
    )
}
