#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use crate::database::entity::post;
    use crate::database::postgres_repo::PostgresPostRepository;
    use chrono::Utc;
    use feedline_core::DomainError;
    use feedline_core::domain::{PageRequest, Post, PostOwner};
    use feedline_core::error::RepoError;
    use feedline_core::ports::{BaseRepository, PostRepository};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};

    fn model(id: uuid::Uuid, published: bool) -> post::Model {
        let now = Utc::now();
        post::Model {
            id,
            content: "Content".to_owned(),
            author_id: Some(7),
            project_id: None,
            hashtags: vec!["rust".to_owned()],
            views: 3,
            published,
            deleted: false,
            verified: false,
            created_at: now.into(),
            updated_at: now.into(),
            published_at: published.then(|| now.into()),
            scheduled_at: None,
            verified_date: None,
        }
    }

    #[tokio::test]
    async fn test_find_post_by_id() {
        let post_id = uuid::Uuid::new_v4();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model(post_id, false)]])
            .into_connection();

        let repo = PostgresPostRepository::new(Arc::new(db));

        let result: Option<Post> = repo.find_by_id(post_id).await.unwrap();

        let post = result.unwrap();
        assert_eq!(post.id, post_id);
        assert_eq!(post.owner, PostOwner::Author(7));
        assert_eq!(post.hashtags, vec!["rust".to_owned()]);
        assert_eq!(post.views, 3);
    }

    #[tokio::test]
    async fn test_project_owner_mapping() {
        let post_id = uuid::Uuid::new_v4();
        let mut row = model(post_id, false);
        row.author_id = None;
        row.project_id = Some(42);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row]])
            .into_connection();

        let repo = PostgresPostRepository::new(Arc::new(db));
        let post: Post = repo.find_by_id(post_id).await.unwrap().unwrap();

        assert_eq!(post.owner, PostOwner::Project(42));
    }

    #[tokio::test]
    async fn test_transaction_applies_mutation() {
        let post_id = uuid::Uuid::new_v4();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model(post_id, false)], vec![model(post_id, true)]])
            .into_connection();

        let repo = PostgresPostRepository::new(Arc::new(db));
        let saved = repo
            .with_transaction(
                post_id,
                Box::new(|p: &mut Post| p.publish(Utc::now())),
            )
            .await
            .unwrap();

        assert!(saved.published);
        assert!(saved.published_at.is_some());
    }

    #[tokio::test]
    async fn test_transaction_propagates_domain_error() {
        let post_id = uuid::Uuid::new_v4();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model(post_id, true)]])
            .into_connection();

        let repo = PostgresPostRepository::new(Arc::new(db));
        let result = repo
            .with_transaction(
                post_id,
                Box::new(|p: &mut Post| p.publish(Utc::now())),
            )
            .await;

        assert!(matches!(result, Err(DomainError::AlreadyPublished(_))));
    }

    #[tokio::test]
    async fn test_find_by_hashtag_paginates() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[BTreeMap::from([(
                "num_items",
                Value::BigInt(Some(21)),
            )])]])
            .append_query_results([vec![model(uuid::Uuid::new_v4(), true)]])
            .into_connection();

        let repo = PostgresPostRepository::new(Arc::new(db));
        let page = repo
            .find_by_hashtag("rust", PageRequest::new(1, 20))
            .await
            .unwrap();

        assert_eq!(page.total_elements, 21);
        assert_eq!(page.page, 1);
        assert_eq!(page.content.len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_hashtag_far_page_is_empty() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[BTreeMap::from([(
                "num_items",
                Value::BigInt(Some(3)),
            )])]])
            .append_query_results([Vec::<post::Model>::new()])
            .into_connection();

        let repo = PostgresPostRepository::new(Arc::new(db));
        let page = repo
            .find_by_hashtag("rust", PageRequest::new(u64::MAX / 2, 20))
            .await
            .unwrap();

        assert!(page.is_empty());
        assert_eq!(page.total_elements, 3);
    }

    #[tokio::test]
    async fn test_increment_views_on_missing_post() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let repo = PostgresPostRepository::new(Arc::new(db));
        let result = repo.increment_views(uuid::Uuid::new_v4()).await;

        assert!(matches!(result, Err(RepoError::NotFound)));
    }
}
