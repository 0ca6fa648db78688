use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEV_JWT_SECRET: &str = "dev-only-secret";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing_bearer_token")]
    MissingToken,
    #[error("invalid_token")]
    InvalidToken,
    #[error("jwt_encode_failed")]
    EncodeFailed,
}

impl AuthError {
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_bearer_token",
            AuthError::InvalidToken => "invalid_token",
            AuthError::EncodeFailed => "jwt_encode_failed",
        }
    }
}

/// Issues and verifies HS256 bearer tokens for the admin endpoints
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthManager {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue_jwt(&self, subject: &str, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = AuthClaims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key).map_err(|_| AuthError::EncodeFailed)
    }

    pub fn validate_jwt(&self, token: &str) -> Result<AuthClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        decode::<AuthClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}
