//! Feed handlers.

use actix_web::{HttpResponse, web};
use serde::Deserialize;

use feedline_shared::dto::FeedResponse;

use super::mapping;
use crate::middleware::caller::Caller;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const DEFAULT_FEED_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<usize>,
}

/// GET /api/v1/feed?limit=..
pub async fn get_feed(
    state: web::Data<AppState>,
    caller: Caller,
    query: web::Query<FeedQuery>,
) -> AppResult<HttpResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_FEED_LIMIT);
    let posts = state.feed.get_feed(caller.user_id, limit).await?;
    Ok(HttpResponse::Ok().json(FeedResponse {
        user_id: caller.user_id,
        posts: posts.into_iter().map(mapping::feed_post).collect(),
    }))
}

/// POST /api/v1/heat-feed
pub async fn heat_feed(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    state
        .heater
        .trigger()
        .await
        .map_err(|e| AppError::Unavailable(e.to_string()))?;
    tracing::info!("Feed heating queued");
    Ok(HttpResponse::Accepted().finish())
}
