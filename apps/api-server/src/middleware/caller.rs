//! Caller identity extractor.

use actix_web::{FromRequest, HttpRequest, dev::Payload};
use std::future::{Ready, ready};

use super::error::AppError;

/// Header carrying the id of the user making the request.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user making the request, read from the `x-user-id` header.
///
/// ```ignore
/// async fn handler(caller: Caller) -> impl Responder {
///     format!("Hello, user {}!", caller.user_id)
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
}

impl Caller {
    fn parse(req: &HttpRequest) -> Result<Self, AppError> {
        let raw = req
            .headers()
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::BadRequest(format!("Missing {} header", USER_ID_HEADER)))?;
        let user_id = raw
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .ok_or_else(|| AppError::BadRequest(format!("Malformed {} header", USER_ID_HEADER)))?;
        Ok(Self { user_id })
    }
}

impl FromRequest for Caller {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Caller::parse(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[actix_web::test]
    async fn test_caller_from_header() {
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "42"))
            .to_http_request();
        let caller = Caller::extract(&req).await.unwrap();
        assert_eq!(caller.user_id, 42);
    }

    #[actix_web::test]
    async fn test_missing_or_malformed_header() {
        let req = TestRequest::default().to_http_request();
        assert!(matches!(Caller::extract(&req).await, Err(AppError::BadRequest(_))));

        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "abc"))
            .to_http_request();
        assert!(matches!(Caller::extract(&req).await, Err(AppError::BadRequest(_))));
    }
}
