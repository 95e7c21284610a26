use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::content::ContentStoreError;
use crate::error::Error;

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    #[must_use]
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }
}

/// API error that converts to a proper HTTP response
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

/// The one message used for every 404. "No such project" and "revision not
/// visible to you" are deliberately indistinguishable so that guessing slugs
/// or revision numbers leaks nothing about private drafts.
pub const NOT_FOUND_MESSAGE: &str = "Project or revision not found";

impl ApiError {
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "data": null, "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound => ApiError::not_found(NOT_FOUND_MESSAGE),
            Error::AlreadyExists => ApiError::conflict("Project already exists"),
            Error::BadRequest(message) => ApiError::bad_request(message),
            Error::Conflict(message) => ApiError::conflict(message),
            Error::Database(_) | Error::Io(_) | Error::Metadata(_) => {
                tracing::error!("storage failure: {err}");
                ApiError::internal("Internal storage error")
            }
        }
    }
}

impl From<ContentStoreError> for ApiError {
    fn from(err: ContentStoreError) -> Self {
        match err {
            ContentStoreError::NotFound => ApiError::not_found(NOT_FOUND_MESSAGE),
            ContentStoreError::InvalidDigest | ContentStoreError::Io(_) => {
                tracing::error!("content store failure: {err}");
                ApiError::internal("Internal storage error")
            }
        }
    }
}

/// Extension for Option types from store operations.
pub trait StoreOptionExt<T> {
    fn or_not_found(self, message: &'static str) -> Result<T, ApiError>;
}

impl<T> StoreOptionExt<T> for Option<T> {
    fn or_not_found(self, message: &'static str) -> Result<T, ApiError> {
        self.ok_or_else(|| ApiError::not_found(message))
    }
}
