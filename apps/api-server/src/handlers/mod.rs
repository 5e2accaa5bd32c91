//! HTTP handlers and route configuration.

mod comments;
mod feed;
mod health;
mod mapping;
mod posts;

use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            .service(
                web::scope("/v1")
                    .service(
                        web::scope("/posts")
                            .route("/drafts", web::post().to(posts::create_draft))
                            .route("/change", web::put().to(posts::update))
                            .route("/drafts/users/{id}", web::get().to(posts::drafts_by_author))
                            .route("/drafts/projects/{id}", web::get().to(posts::drafts_by_project))
                            .route("/author/{id}/all", web::get().to(posts::all_by_author))
                            .route("/project/{id}/all", web::get().to(posts::all_by_project))
                            .route("/all/author/{id}/published", web::get().to(posts::published_by_author))
                            .route("/all/project/{id}/published", web::get().to(posts::published_by_project))
                            .route("/all/hashtag", web::get().to(posts::by_hashtag))
                            .route("/{id}/publish", web::post().to(posts::publish))
                            .route("/{id}/soft-delete", web::delete().to(posts::soft_delete))
                            .route("/{id}", web::get().to(posts::get_by_id)),
                    )
                    .service(
                        web::scope("/comments")
                            .route("/new", web::post().to(comments::create))
                            .route("/edit", web::put().to(comments::edit))
                            .route("/{id}", web::delete().to(comments::delete))
                            .route("/{id}", web::get().to(comments::by_post)),
                    )
                    .route("/feed", web::get().to(feed::get_feed))
                    .route("/heat-feed", web::post().to(feed::heat_feed)),
            ),
    );
}

#[cfg(test)]
mod tests {
    use actix_web::{App, http::StatusCode, test, web};
    use serde_json::{Value, json};

    use crate::config::AppConfig;
    use crate::state::AppState;

    async fn state() -> AppState {
        let config = AppConfig {
            dictionary_path: concat!(env!("CARGO_MANIFEST_DIR"), "/resources/profanity-words.txt").into(),
            ..AppConfig::from_env()
        };
        AppState::new(&config).await.unwrap()
    }

    #[actix_web::test]
    async fn test_health_lists_pools() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state().await))
                .configure(super::configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["pools"].as_array().unwrap().len(), 5);
    }

    #[actix_web::test]
    async fn test_domain_errors_become_problem_details() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state().await))
                .configure(super::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/posts/drafts")
            .set_json(json!({ "content": "hello", "authorId": 1 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], "ValidationError");

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/posts/{}", uuid::Uuid::new_v4()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_hashtag_listing_rejects_huge_page() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state().await))
                .configure(super::configure_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/posts/all/hashtag?hashtag=rust&page={}&size=20", u64::MAX / 2))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/api/v1/posts/all/hashtag?hashtag=rust&page=0&size=20")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["totalElements"], 0);
    }

    #[actix_web::test]
    async fn test_feed_requires_caller_header() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state().await))
                .configure(super::configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/feed").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/api/v1/feed?limit=5")
            .insert_header(("x-user-id", "7"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["userId"], 7);
        assert!(body["posts"].as_array().unwrap().is_empty());
    }
}
