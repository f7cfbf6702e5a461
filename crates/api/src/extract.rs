//! Caller identity extraction.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the authenticated user id, set by the upstream gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user a request is made on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthenticated(format!("missing {USER_ID_HEADER} header")))?;

        value
            .to_str()
            .ok()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .map(|uuid| Caller(UserId::from_uuid(uuid)))
            .ok_or_else(|| ApiError::Unauthenticated(format!("invalid {USER_ID_HEADER} header")))
    }
}
