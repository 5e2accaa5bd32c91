mod common;

use common::Harness;
use feedline_core::DomainError;
use feedline_core::domain::{NewComment, PageRequest, channels};
use feedline_core::ports::BaseRepository;

fn comment(post_id: uuid::Uuid, author_id: i64, content: &str) -> NewComment {
    NewComment {
        post_id,
        author_id,
        content: content.to_string(),
    }
}

#[tokio::test]
async fn test_comment_lifecycle() {
    let h = Harness::new();
    h.author(1, []).await;
    h.author(2, []).await;
    let post = h.published(1, "discuss").await;

    let created = h
        .comment_service
        .create(2, comment(post.id, 2, "first!"))
        .await
        .unwrap();
    assert_eq!(created.post_id, post.id);
    assert!(h.cache.find_user(2).await.is_some());

    let updated = h
        .comment_service
        .update(2, created.id, "edited".into())
        .await
        .unwrap();
    assert_eq!(updated.content, "edited");
    assert!(updated.updated_at >= created.updated_at);

    h.comment_service.delete(2, created.id).await.unwrap();
    assert!(h.comments.find_by_id(created.id).await.unwrap().is_none());

    let actions: Vec<String> = h
        .bus
        .messages(channels::COMMENT_EVENTS)
        .iter()
        .map(|e| e["action"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(actions, vec!["CREATE", "UPDATE", "DELETE"]);
}

#[tokio::test]
async fn test_comment_rules() {
    let h = Harness::new();
    h.author(1, []).await;
    h.author(2, []).await;
    let post = h.published(1, "discuss").await;
    let draft = h.draft(1, "hidden").await;

    assert!(matches!(
        h.comment_service.create(1, comment(post.id, 2, "impostor")).await,
        Err(DomainError::Forbidden(_))
    ));
    assert!(matches!(
        h.comment_service.create(2, comment(post.id, 2, "")).await,
        Err(DomainError::Validation(_))
    ));
    assert!(matches!(
        h.comment_service.create(404, comment(post.id, 404, "ghost")).await,
        Err(DomainError::NotFound { .. })
    ));
    assert!(matches!(
        h.comment_service.create(2, comment(draft.id, 2, "too early")).await,
        Err(DomainError::NotFound { .. })
    ));

    let created = h
        .comment_service
        .create(2, comment(post.id, 2, "mine"))
        .await
        .unwrap();
    assert!(matches!(
        h.comment_service.update(1, created.id, "hijack".into()).await,
        Err(DomainError::Forbidden(_))
    ));
    assert!(matches!(
        h.comment_service.delete(1, created.id).await,
        Err(DomainError::Forbidden(_))
    ));
    assert!(matches!(
        h.comment_service.delete(2, uuid::Uuid::new_v4()).await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_comments_page_newest_first() {
    let h = Harness::new();
    h.author(1, []).await;
    let post = h.published(1, "busy thread").await;

    let mut ids = Vec::new();
    for i in 0..3 {
        let c = h
            .comment_service
            .create(1, comment(post.id, 1, &format!("comment {i}")))
            .await
            .unwrap();
        ids.push(c.id);
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let page = h
        .comment_service
        .list_by_post(post.id, PageRequest::new(0, 2))
        .await
        .unwrap();
    assert_eq!(page.total_elements, 3);
    assert_eq!(
        page.content.iter().map(|c| c.id).collect::<Vec<_>>(),
        vec![ids[2], ids[1]]
    );
}

#[tokio::test]
async fn test_comment_moderation() {
    let h = Harness::new();
    h.author(1, []).await;
    let post = h.published(1, "thread").await;
    let clean = h
        .comment_service
        .create(1, comment(post.id, 1, "this is fine"))
        .await
        .unwrap();
    let dirty = h
        .comment_service
        .create(1, comment(post.id, 1, "you are SHIT!"))
        .await
        .unwrap();

    h.comment_service.do_moderation().await;

    assert!(h.comments.find_by_id(clean.id).await.unwrap().unwrap().verified);
    let dirty = h.comments.find_by_id(dirty.id).await.unwrap().unwrap();
    assert!(!dirty.verified);
    assert!(dirty.verified_date.is_some());
}
