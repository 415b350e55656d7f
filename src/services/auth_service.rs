//! Authentication service
//!
//! Bearer tokens are HS256 JWTs signed with the shared `JWT_SECRET`. Tokens are
//! minted by the wallet signature-verification endpoint; this service only
//! needs to verify them and check the role claim.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::constants::roles;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    /// Wallet sessions carry no role at all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Informational only; tokens without it are still accepted
    #[serde(default)]
    pub iat: i64,
    pub exp: i64,
}

/// Verified identity of the caller
#[derive(Debug, Clone, PartialEq)]
pub struct AuthClaims {
    pub subject: String,
    pub role: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<Claims> for AuthClaims {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.sub,
            role: claims.role.unwrap_or_default(),
            issued_at: DateTime::from_timestamp(claims.iat, 0).unwrap_or_default(),
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or_default(),
        }
    }
}

/// Token verification failures
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No token provided")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    #[error("Forbidden")]
    Forbidden,

    #[error("Failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Issues and verifies bearer tokens
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry: Duration,
}

impl JwtManager {
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
            expiry: Duration::hours(expiry_hours),
        }
    }

    /// Sign a token for `subject`, optionally carrying a role claim
    pub fn issue(&self, subject: &str, role: Option<&str>) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            role: role.map(str::to_string),
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(AuthError::Signing)
    }

    /// Verify signature and expiry, returning the decoded claims
    pub fn verify(&self, token: &str) -> Result<AuthClaims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(AuthError::InvalidToken)?;

        Ok(data.claims.into())
    }

    /// Verify a token and require the admin role
    pub fn verify_admin(&self, token: Option<&str>) -> Result<AuthClaims, AuthError> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = self.verify(token)?;
        if claims.role != roles::ADMIN {
            return Err(AuthError::Forbidden);
        }

        Ok(claims)
    }
}
