//! Failures reported by the API outside of authorization

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::repository::RepositoryError;

/// An error raised while serving a request
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body was malformed or incomplete
    #[error("malformed request body")]
    BadRequest(#[source] JsonRejection),

    /// The addressed resource does not exist
    #[error("resource not found")]
    NotFound,

    /// A request field carried an unusable value
    #[error("field `{0}` must not be blank")]
    Unprocessable(&'static str),

    /// The repository failed
    #[error("repository failure")]
    Repository(#[from] RepositoryError),
}

impl ApiError {
    /// The status code the error renders with
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "Bad Request. Please verify the information you submitted is correct and try again.",
            Self::NotFound => "This resource has not been found.",
            Self::Unprocessable(_) => "This is an unprocessable entity.",
            Self::Repository(_) => "Internal server error. Please try again.",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection)
    }
}

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        Self::NotFound
    }
}

/// The JSON body of an error response
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// The status code
    pub error: u16,
    /// A human-readable message
    pub message: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Repository(err) => tracing::error!(error = %err, "repository failure"),
            Self::BadRequest(rejection) => {
                tracing::debug!(reason = %rejection.body_text(), "rejecting request body")
            }
            Self::NotFound | Self::Unprocessable(_) => tracing::debug!(error = %self, "request failed"),
        }

        let body = ErrorResponse {
            success: false,
            error: status.as_u16(),
            message: self.message(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_failures() {
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Unprocessable("name").status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(RepositoryError::unavailable("connection reset")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_carries_status_and_message() {
        let response = ApiError::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
