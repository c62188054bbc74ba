//! Signed, time-limited bearer tokens (HS256)

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default token lifetime
pub const TOKEN_TTL: i64 = 3600; // 1 hour
/// Lifetime when the caller asked to be remembered
pub const REMEMBER_ME_TTL: i64 = 7 * 24 * 3600; // 7 days

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i32,   // user id
    pub iat: i64,  // issued at
    pub exp: i64,  // expiration time
    pub jti: String,
}

/// Token encoding/decoding with a shared secret
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenCodec {
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
        }
    }

    /// Sign a token for `user_id` expiring `ttl_seconds` from now
    pub fn encode(&self, user_id: i32, ttl_seconds: i64) -> jsonwebtoken::errors::Result<String> {
        let now = Utc::now();
        let claims = Claims {
            id: user_id,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ttl_seconds)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Verify signature and expiry, returning the claims
    pub fn decode(&self, token: &str) -> jsonwebtoken::errors::Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation).map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(secret: &str) -> TokenCodec {
        TokenCodec::new(&SecretString::from(secret.to_string()))
    }

    #[test]
    fn test_roundtrip_claims() {
        let codec = codec("test-secret-with-enough-entropy-0123");
        let token = codec.encode(42, TOKEN_TTL).unwrap();

        let claims = codec.decode(&token).unwrap();
        assert_eq!(claims.id, 42);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL);
    }

    #[test]
    fn test_foreign_secret_is_rejected() {
        let token = codec("abc").encode(42, TOKEN_TTL).unwrap();
        assert!(codec("test-secret-with-enough-entropy-0123").decode(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let codec = codec("test-secret-with-enough-entropy-0123");
        // well past the default validation leeway
        let token = codec.encode(42, -3600).unwrap();
        assert!(codec.decode(&token).is_err());
    }

    #[test]
    fn test_garbage_is_rejected() {
        let codec = codec("test-secret-with-enough-entropy-0123");
        assert!(codec.decode("not.a.token").is_err());
        assert!(codec.decode("").is_err());
    }
}
