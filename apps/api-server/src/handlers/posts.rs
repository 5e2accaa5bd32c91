//! Post pipeline handlers.

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use uuid::Uuid;

use feedline_core::domain::{NewPost, PostRevision};
use feedline_shared::dto::{CreatePostRequest, UpdatePostRequest};

use super::mapping::{self, PageQuery};
use crate::middleware::caller::Caller;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /api/v1/posts/drafts
pub async fn create_draft(
    state: web::Data<AppState>,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let post = state
        .pipeline
        .create_draft(NewPost {
            content: req.content,
            author_id: req.author_id,
            project_id: req.project_id,
            scheduled_at: req.scheduled_at,
            hashtags: req.hashtags,
        })
        .await?;
    Ok(HttpResponse::Ok().json(mapping::post(post)))
}

/// POST /api/v1/posts/{id}/publish
pub async fn publish(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let post = state.pipeline.publish(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(mapping::post(post)))
}

/// PUT /api/v1/posts/change
pub async fn update(
    state: web::Data<AppState>,
    caller: Caller,
    body: web::Json<UpdatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let post = state
        .pipeline
        .update(
            caller.user_id,
            PostRevision {
                post_id: req.id,
                content: req.content,
                scheduled_at: req.scheduled_at,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(mapping::post(post)))
}

/// DELETE /api/v1/posts/{id}/soft-delete
pub async fn soft_delete(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let post = state.pipeline.soft_delete(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(mapping::post(post)))
}

/// GET /api/v1/posts/{id}
pub async fn get_by_id(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let post = state.pipeline.get_by_id(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(mapping::post(post)))
}

/// GET /api/v1/posts/drafts/users/{id}
pub async fn drafts_by_author(state: web::Data<AppState>, path: web::Path<i64>) -> AppResult<HttpResponse> {
    let posts = state.pipeline.list_drafts_by_author(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(mapping::posts(posts)))
}

/// GET /api/v1/posts/drafts/projects/{id}
pub async fn drafts_by_project(state: web::Data<AppState>, path: web::Path<i64>) -> AppResult<HttpResponse> {
    let posts = state.pipeline.list_drafts_by_project(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(mapping::posts(posts)))
}

/// GET /api/v1/posts/author/{id}/all
pub async fn all_by_author(state: web::Data<AppState>, path: web::Path<i64>) -> AppResult<HttpResponse> {
    let posts = state.pipeline.list_all_by_author(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(mapping::posts(posts)))
}

/// GET /api/v1/posts/project/{id}/all
pub async fn all_by_project(state: web::Data<AppState>, path: web::Path<i64>) -> AppResult<HttpResponse> {
    let posts = state.pipeline.list_all_by_project(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(mapping::posts(posts)))
}

/// GET /api/v1/posts/all/author/{id}/published
pub async fn published_by_author(state: web::Data<AppState>, path: web::Path<i64>) -> AppResult<HttpResponse> {
    let posts = state.pipeline.list_published_by_author(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(mapping::posts(posts)))
}

/// GET /api/v1/posts/all/project/{id}/published
pub async fn published_by_project(state: web::Data<AppState>, path: web::Path<i64>) -> AppResult<HttpResponse> {
    let posts = state.pipeline.list_published_by_project(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(mapping::posts(posts)))
}

#[derive(Debug, Deserialize)]
pub struct HashtagQuery {
    pub hashtag: String,
    pub page: Option<u64>,
    pub size: Option<u64>,
}

/// GET /api/v1/posts/all/hashtag?hashtag=..&page=..&size=..
pub async fn by_hashtag(state: web::Data<AppState>, query: web::Query<HashtagQuery>) -> AppResult<HttpResponse> {
    let request = PageQuery {
        page: query.page,
        size: query.size,
    }
    .request()?;
    let page = state.pipeline.list_by_hashtag(&query.hashtag, request).await?;
    Ok(HttpResponse::Ok().json(mapping::page(page, mapping::post)))
}
