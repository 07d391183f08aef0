use axum::{http::StatusCode, response::IntoResponse};
use serde_json::json;
use thiserror::Error;

use super::problem::ProblemDetails;
use crate::repository::RepositoryError;
use crate::services::activity_cache::CacheError;
use crate::services::feed_service::FeedServiceError;
use crate::services::thread_service::ThreadError;
use crate::store::StoreError;

pub type AppResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "service_unavailable",
            message,
        )
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let details = self.details;

        let mut problem = ProblemDetails::new(self.status, self.code, self.message);
        if let Some(details) = details {
            problem = problem.with_details(details);
        }

        problem.into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::internal_server_error(value.to_string())
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match &err {
            RepositoryError::Database(db_err) => Self::internal_server_error("database error")
                .with_details(json!({ "message": db_err.to_string() })),
        }
    }
}

impl From<FeedServiceError> for ApiError {
    fn from(err: FeedServiceError) -> Self {
        match err {
            FeedServiceError::Validation(message) => {
                Self::new(StatusCode::BAD_REQUEST, "validation_failed", message)
            }
            FeedServiceError::Repository(err) => Self::from(err),
        }
    }
}

impl From<ThreadError> for ApiError {
    fn from(err: ThreadError) -> Self {
        match err {
            ThreadError::NotFound(id) => Self::not_found(format!("message {id} not found")),
            ThreadError::Integrity => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "thread_integrity",
                "thread ancestry is inconsistent",
            ),
            ThreadError::Repository(err) => Self::from(err),
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        Self::service_unavailable(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::service_unavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use http::header::CONTENT_TYPE;
    use serde_json::Value;

    #[test]
    fn new_sets_fields_and_allows_details() {
        let error =
            ApiError::unauthorized("sign in first").with_details(json!({ "reason": "anonymous" }));
        assert_eq!(error.status, StatusCode::UNAUTHORIZED);
        assert_eq!(error.code, "unauthorized");
        assert!(
            error
                .details
                .as_ref()
                .is_some_and(|details| details["reason"] == Value::from("anonymous"))
        );
    }

    #[tokio::test]
    async fn into_response_serializes_problem_details() {
        let response = ApiError::not_found("missing message")
            .with_details(json!({ "id": 9 }))
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/problem+json"
        );

        let bytes = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .expect("body to bytes");
        let json: Value =
            serde_json::from_slice(&bytes).expect("problem details deserializes to json");
        assert_eq!(json["code"], "not_found");
        assert_eq!(json["message"], "missing message");
        assert_eq!(json["details"]["id"], 9);
    }

    #[test]
    fn feed_service_errors_map_to_matching_status_codes() {
        let validation = ApiError::from(FeedServiceError::Validation("too long".into()));
        assert_eq!(validation.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn thread_errors_map_to_matching_status_codes() {
        let not_found = ApiError::from(ThreadError::NotFound(3));
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);

        let integrity = ApiError::from(ThreadError::Integrity);
        assert_eq!(integrity.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(integrity.code, "thread_integrity");
    }

    #[test]
    fn store_errors_surface_as_service_unavailable() {
        let error = ApiError::from(StoreError::Backend("connection refused".into()));
        assert_eq!(error.status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
