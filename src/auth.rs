//! Bearer token extraction and the auth guard
//!
//! Provides helpers for:
//! - Extracting the bearer token from the `Authorization` header
//! - Reading it back from the GraphQL context
//! - Verifying it before any protected resolver touches storage

use async_graphql::Context;
use axum::http::HeaderMap;
use secrecy::SecretString;

use crate::token::{Claims, TokenCodec, REMEMBER_ME_TTL, TOKEN_TTL};
use crate::ApiError;

pub const INVALID_TOKEN_MESSAGE: &str = "Invalid or missing authentication token.";

/// Raw token presented by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken(pub String);

/// Extract the token from the `Authorization` header
///
/// Accepts `Bearer <token>` as well as a bare token.
pub fn extract_token(headers: &HeaderMap) -> Option<AuthToken> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .map(|auth| auth.strip_prefix("Bearer ").unwrap_or(auth).trim())
        .filter(|token| !token.is_empty())
        .map(|token| AuthToken(token.to_string()))
}

/// Get the caller's token from GraphQL context
pub fn get_token<'a>(ctx: &'a Context<'_>) -> Option<&'a str> {
    ctx.data_opt::<AuthToken>().map(|t| t.0.as_str())
}

/// Verifies and issues bearer tokens
#[derive(Clone)]
pub struct AuthGuard {
    codec: TokenCodec,
}

impl AuthGuard {
    pub fn new(secret: &SecretString) -> Self {
        Self {
            codec: TokenCodec::new(secret),
        }
    }

    /// Check a caller-supplied token; stateless
    pub fn check(&self, token: Option<&str>) -> crate::Result<Claims> {
        let Some(token) = token else {
            tracing::warn!("rejected request without token");
            return Err(ApiError::Auth(INVALID_TOKEN_MESSAGE.to_string()));
        };

        self.codec.decode(token).map_err(|e| {
            tracing::warn!(error = %e, "rejected token");
            ApiError::Auth(INVALID_TOKEN_MESSAGE.to_string())
        })
    }

    /// Issue a token for a freshly authenticated user
    pub fn issue(&self, user_id: i32, remember_me: bool) -> crate::Result<String> {
        let ttl = if remember_me { REMEMBER_ME_TTL } else { TOKEN_TTL };
        self.codec
            .encode(user_id, ttl)
            .map_err(|e| ApiError::internal(format!("token signing failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn guard() -> AuthGuard {
        AuthGuard::new(&SecretString::from("test-secret-with-enough-entropy-0123".to_string()))
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_bearer_and_bare_tokens() {
        assert_eq!(extract_token(&headers("Bearer abc.def")), Some(AuthToken("abc.def".to_string())));
        assert_eq!(extract_token(&headers("abc.def")), Some(AuthToken("abc.def".to_string())));
        assert_eq!(extract_token(&headers("Bearer ")), None);
        assert_eq!(extract_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_check_accepts_issued_token() {
        let guard = guard();
        let token = guard.issue(3, false).unwrap();

        let claims = guard.check(Some(&token)).unwrap();
        assert_eq!(claims.id, 3);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL);
    }

    #[test]
    fn test_remember_me_extends_lifetime() {
        let guard = guard();
        let token = guard.issue(3, true).unwrap();

        let claims = guard.check(Some(&token)).unwrap();
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
    }

    #[test]
    fn test_check_rejects_missing_and_foreign_tokens() {
        let guard = guard();
        let expected = ApiError::Auth(INVALID_TOKEN_MESSAGE.to_string());

        assert_eq!(guard.check(None).unwrap_err(), expected);

        let foreign = AuthGuard::new(&SecretString::from("abc".to_string())).issue(3, false).unwrap();
        assert_eq!(guard.check(Some(&foreign)).unwrap_err(), expected);
        assert_eq!(guard.check(Some("garbage")).unwrap_err(), expected);
    }
}
