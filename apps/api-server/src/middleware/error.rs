//! Error handling middleware - RFC 7807 compliant responses.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use feedline_core::DomainError;
use feedline_shared::ErrorResponse;
use std::fmt;

/// Application-level error type that converts to RFC 7807 responses.
#[derive(Debug)]
pub enum AppError {
    /// Domain failure from a service call.
    Domain(DomainError),
    /// Malformed request outside the domain (bad header, bad query).
    BadRequest(String),
    /// Background work could not be queued.
    Unavailable(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Domain(err) => write!(f, "{}", err),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Unavailable(msg) => write!(f, "Unavailable: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(err) => match err {
                DomainError::Validation(_) => StatusCode::BAD_REQUEST,
                DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
                DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
                DomainError::AlreadyPublished(_)
                | DomainError::AlreadyDeleted(_)
                | DomainError::NotPublished(_) => StatusCode::METHOD_NOT_ALLOWED,
                DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            AppError::Domain(err) => {
                let body = match err {
                    DomainError::NotFound { entity_type, id } => {
                        ErrorResponse::not_found(format!("{} with id {} not found", entity_type, id))
                    }
                    DomainError::Validation(msg) => ErrorResponse::bad_request(msg),
                    DomainError::Forbidden(msg) => ErrorResponse::forbidden(msg),
                    DomainError::AlreadyPublished(msg)
                    | DomainError::AlreadyDeleted(msg)
                    | DomainError::NotPublished(msg) => ErrorResponse::method_not_allowed(msg),
                    DomainError::Internal(detail) => {
                        tracing::error!("Internal error: {}", detail);
                        ErrorResponse::internal_error()
                    }
                };
                body.with_kind(err.kind())
            }
            AppError::BadRequest(detail) => ErrorResponse::bad_request(detail).with_kind("BadRequest"),
            AppError::Unavailable(detail) => {
                tracing::warn!("Request rejected: {}", detail);
                ErrorResponse::new(503, "Service Unavailable")
                    .with_detail(detail)
                    .with_kind("Unavailable")
            }
        };

        HttpResponse::build(self.status_code()).json(error)
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        AppError::Domain(err)
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_status_mapping() {
        let cases = [
            (DomainError::Validation("x".into()), 400),
            (DomainError::Forbidden("x".into()), 403),
            (DomainError::not_found("Post", 1), 404),
            (DomainError::AlreadyPublished("x".into()), 405),
            (DomainError::AlreadyDeleted("x".into()), 405),
            (DomainError::NotPublished("x".into()), 405),
            (DomainError::Internal("x".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code().as_u16(), status);
        }
    }

    #[actix_web::test]
    async fn test_error_body_carries_kind() {
        let response = AppError::from(DomainError::AlreadyPublished("post 1".into())).error_response();
        let bytes = actix_web::body::to_bytes(response.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], 405);
        assert_eq!(body["kind"], "AlreadyPublishedError");
        assert_eq!(body["detail"], "post 1");
    }
}
