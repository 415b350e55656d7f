//! Authentication middleware

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

use crate::{
    constants::BEARER_PREFIX, error::AppError, services::AuthClaims, state::AppState,
};

/// Token carried by an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
}

/// Caller verified to hold the admin role
///
/// Extraction runs before the body is read, so unauthenticated requests are
/// rejected without parsing their payload.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthClaims);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let path = parts.uri.path().to_string();
        let token = bearer_token(&parts.headers);

        match state.jwt().verify_admin(token) {
            Ok(claims) => {
                debug!(path = %path, sub = %claims.subject, "Admin authenticated");
                Ok(AdminUser(claims))
            }
            Err(e) => {
                debug!(path = %path, error = %e, "Admin authentication failed");
                Err(e.into())
            }
        }
    }
}
