//! Comment handlers.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use feedline_core::domain::NewComment;
use feedline_shared::dto::{CommentRequest, EditCommentRequest};

use super::mapping::{self, PageQuery};
use crate::middleware::caller::Caller;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /api/v1/comments/new
pub async fn create(
    state: web::Data<AppState>,
    caller: Caller,
    body: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let comment = state
        .comments
        .create(
            caller.user_id,
            NewComment {
                post_id: req.post_id,
                author_id: req.author_id,
                content: req.content,
            },
        )
        .await?;
    Ok(HttpResponse::Created().json(mapping::comment(comment)))
}

/// PUT /api/v1/comments/edit
pub async fn edit(
    state: web::Data<AppState>,
    caller: Caller,
    body: web::Json<EditCommentRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let comment = state.comments.update(caller.user_id, req.id, req.content).await?;
    Ok(HttpResponse::Ok().json(mapping::comment(comment)))
}

/// DELETE /api/v1/comments/{id}
pub async fn delete(state: web::Data<AppState>, caller: Caller, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    state.comments.delete(caller.user_id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/v1/comments/{postId}
pub async fn by_post(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = state.comments.list_by_post(path.into_inner(), query.request()?).await?;
    Ok(HttpResponse::Ok().json(mapping::page(page, mapping::comment)))
}
