//! Identity extraction for creator endpoints.
//!
//! Credential verification is not this server's job: a fronting proxy
//! (Keycloak + oauth2-proxy or similar) authenticates the request and forwards
//! the verified subject in `X-Forwarded-User`. This module only lifts that
//! header into typed extractors; ownership checks against it happen per route.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

pub const USER_HEADER: &str = "x-forwarded-user";

/// Extractor that requires an authenticated identity.
pub struct RequireUser {
    pub idp_user_id: String,
}

/// Extractor that picks up the identity when present. Used by routes that are
/// public except for draft access.
pub struct OptionalUser(pub Option<String>);

#[derive(Debug)]
pub enum AuthError {
    MissingIdentity,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingIdentity => "Authentication required",
        };
        let body = json!({ "data": null, "error": message });
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

fn forwarded_user(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(USER_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

impl<S: Send + Sync> FromRequestParts<S> for RequireUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let idp_user_id = forwarded_user(parts).ok_or(AuthError::MissingIdentity)?;
        Ok(RequireUser { idp_user_id })
    }
}

impl<S: Send + Sync> FromRequestParts<S> for OptionalUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalUser(forwarded_user(parts)))
    }
}
