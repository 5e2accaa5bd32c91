//! PostgreSQL repository implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use feedline_core::domain::{Comment, Page, PageRequest, Post};
use feedline_core::error::{DomainError, RepoError};
use feedline_core::ports::{CommentRepository, PostMutation, PostRepository};

use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::postgres_base::{PostgresBaseRepository, query_error, write_error};

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// PostgreSQL comment repository.
pub type PostgresCommentRepository = PostgresBaseRepository<CommentEntity>;

fn timestamp(at: DateTime<Utc>) -> DateTimeWithTimeZone {
    at.into()
}

/// Postgres `OFFSET` is a signed bigint.
fn sql_offset(page: PageRequest) -> u64 {
    page.offset().min(i64::MAX as u64)
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_by_author(&self, author_id: i64) -> Result<Vec<Post>, RepoError> {
        let result = PostEntity::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .all(self.conn())
            .await
            .map_err(query_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn find_by_project(&self, project_id: i64) -> Result<Vec<Post>, RepoError> {
        let result = PostEntity::find()
            .filter(post::Column::ProjectId.eq(project_id))
            .all(self.conn())
            .await
            .map_err(query_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn find_by_hashtag(&self, hashtag: &str, page: PageRequest) -> Result<Page<Post>, RepoError> {
        tracing::debug!(hashtag, page = page.page, size = page.size, "Finding posts by hashtag");

        let query = PostEntity::find()
            .filter(post::Column::Published.eq(true))
            .filter(post::Column::Deleted.eq(false))
            .filter(Expr::cust_with_values("? = ANY(hashtags)", [hashtag]))
            .order_by_desc(post::Column::CreatedAt);

        let total = query.clone().count(self.conn()).await.map_err(query_error)?;
        let models = query
            .offset(sql_offset(page))
            .limit(page.size)
            .all(self.conn())
            .await
            .map_err(query_error)?;

        Ok(Page {
            content: models.into_iter().map(Into::into).collect(),
            page: page.page,
            size: page.size,
            total_elements: total,
        })
    }

    async fn find_not_verified(&self) -> Result<Vec<Post>, RepoError> {
        let result = PostEntity::find()
            .filter(
                Condition::any()
                    .add(post::Column::Verified.eq(false))
                    .add(post::Column::VerifiedDate.is_null())
                    .add(Expr::col(post::Column::UpdatedAt).gte(Expr::col(post::Column::VerifiedDate))),
            )
            .all(self.conn())
            .await
            .map_err(query_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn find_published_by_authors(&self, author_ids: &[i64], limit: u64) -> Result<Vec<Post>, RepoError> {
        if author_ids.is_empty() {
            return Ok(Vec::new());
        }
        let result = PostEntity::find()
            .filter(post::Column::AuthorId.is_in(author_ids.iter().copied()))
            .filter(post::Column::Published.eq(true))
            .filter(post::Column::Deleted.eq(false))
            .order_by_desc(post::Column::PublishedAt)
            .limit(limit)
            .all(self.conn())
            .await
            .map_err(query_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn find_ready_to_publish(&self, now: DateTime<Utc>) -> Result<Vec<Post>, RepoError> {
        let result = PostEntity::find()
            .filter(post::Column::Published.eq(false))
            .filter(post::Column::Deleted.eq(false))
            .filter(post::Column::ScheduledAt.lte(timestamp(now)))
            .order_by_asc(post::Column::ScheduledAt)
            .all(self.conn())
            .await
            .map_err(query_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn increment_views(&self, post_id: Uuid) -> Result<(), RepoError> {
        let result = PostEntity::update_many()
            .col_expr(post::Column::Views, Expr::col(post::Column::Views).add(1))
            .filter(post::Column::Id.eq(post_id))
            .exec(self.conn())
            .await
            .map_err(write_error)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn save_verifications(&self, posts: Vec<Post>) -> Result<(), RepoError> {
        let txn = self.conn().begin().await.map_err(query_error)?;
        let mut stale = 0u64;

        for item in &posts {
            let result = PostEntity::update_many()
                .col_expr(post::Column::Verified, Expr::value(item.verified))
                .col_expr(
                    post::Column::VerifiedDate,
                    Expr::value(item.verified_date.map(timestamp)),
                )
                .filter(post::Column::Id.eq(item.id))
                .filter(post::Column::UpdatedAt.eq(timestamp(item.updated_at)))
                .exec(&txn)
                .await
                .map_err(write_error)?;
            if result.rows_affected == 0 {
                stale += 1;
            }
        }

        txn.commit().await.map_err(query_error)?;
        tracing::debug!(saved = posts.len() as u64 - stale, stale, "Post verifications saved");
        Ok(())
    }

    async fn with_transaction(&self, post_id: Uuid, mutation: PostMutation) -> Result<Post, DomainError> {
        let txn = self.conn().begin().await.map_err(query_error)?;

        let model = PostEntity::find_by_id(post_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(query_error)?
            .ok_or_else(|| DomainError::not_found("Post", post_id))?;

        let mut current: Post = model.into();
        // Dropping `txn` on error rolls the transaction back.
        mutation(&mut current)?;

        let active: post::ActiveModel = current.into();
        let saved = active.update(&txn).await.map_err(write_error)?;
        txn.commit().await.map_err(query_error)?;

        Ok(saved.into())
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn find_by_post(&self, post_id: Uuid, page: PageRequest) -> Result<Page<Comment>, RepoError> {
        let query = CommentEntity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_desc(comment::Column::CreatedAt);

        let total = query.clone().count(self.conn()).await.map_err(query_error)?;
        let models = query
            .offset(sql_offset(page))
            .limit(page.size)
            .all(self.conn())
            .await
            .map_err(query_error)?;

        Ok(Page {
            content: models.into_iter().map(Into::into).collect(),
            page: page.page,
            size: page.size,
            total_elements: total,
        })
    }

    async fn find_not_verified(&self) -> Result<Vec<Comment>, RepoError> {
        let result = CommentEntity::find()
            .filter(
                Condition::any()
                    .add(comment::Column::Verified.eq(false))
                    .add(comment::Column::VerifiedDate.is_null())
                    .add(
                        Expr::col(comment::Column::UpdatedAt)
                            .gte(Expr::col(comment::Column::VerifiedDate)),
                    ),
            )
            .all(self.conn())
            .await
            .map_err(query_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn save_verifications(&self, comments: Vec<Comment>) -> Result<(), RepoError> {
        let txn = self.conn().begin().await.map_err(query_error)?;

        for item in &comments {
            CommentEntity::update_many()
                .col_expr(comment::Column::Verified, Expr::value(item.verified))
                .col_expr(
                    comment::Column::VerifiedDate,
                    Expr::value(item.verified_date.map(timestamp)),
                )
                .filter(comment::Column::Id.eq(item.id))
                .filter(comment::Column::UpdatedAt.eq(timestamp(item.updated_at)))
                .exec(&txn)
                .await
                .map_err(write_error)?;
        }

        txn.commit().await.map_err(query_error)?;
        tracing::debug!(count = comments.len(), "Comment verifications saved");
        Ok(())
    }
}
