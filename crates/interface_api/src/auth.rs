//! Authentication and authorization
//!
//! Tokens are issued elsewhere; this module only validates them and turns
//! the claims into the domain [`Actor`]. [`create_token`] exists for tooling
//! and tests.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::UserId;
use domain_cases::{Actor, Role};

use crate::error::ApiError;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Display name, stamped into audit fields
    pub name: String,
    /// `admin` or `employee`
    pub role: String,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

impl Claims {
    /// The caller these claims describe
    pub fn actor(&self) -> Result<Actor, AuthError> {
        let id: UserId = self
            .sub
            .parse()
            .map_err(|_| AuthError::InvalidClaims("sub".to_string()))?;
        let role: Role = self
            .role
            .parse()
            .map_err(|_| AuthError::InvalidClaims("role".to_string()))?;
        Ok(Actor::new(id, self.name.clone(), role))
    }
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid claim: {0}")]
    InvalidClaims(String),
}

/// Creates a signed HS256 token for `actor`
pub fn create_token(actor: &Actor, secret: &str, expiration_secs: u64) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expiration_secs as i64);

    let claims = Claims {
        sub: actor.id.as_uuid().to_string(),
        name: actor.name.clone(),
        role: actor.role.as_str().to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validates a JWT token
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Rejects non-admin callers with 403
pub fn require_admin(actor: &Actor, action: &str) -> Result<(), ApiError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!("Only admins can {}", action)))
    }
}
