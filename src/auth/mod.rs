pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::{self, SecurityConfig};

/// Length of the opaque refresh token handed to clients
pub const REFRESH_TOKEN_LENGTH: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub username: String,
    /// Role codes at issue time. Informational only; permission checks reload from the database.
    pub roles: Vec<String>,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

impl Claims {
    pub fn new(user_id: Uuid, username: String, roles: Vec<String>, security: &SecurityConfig) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::minutes(security.access_token_minutes)).timestamp();

        Self {
            sub: user_id,
            username,
            roles,
            iss: security.jwt_issuer.clone(),
            aud: security.jwt_audience.clone(),
            iat: now.timestamp(),
            exp,
            jti: Uuid::new_v4(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT secret")]
    InvalidSecret,
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// Signed access token plus its lifetime in seconds
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_in: i64,
}

pub fn issue_access_token(user_id: Uuid, username: &str, roles: Vec<String>) -> Result<AccessToken, AuthError> {
    issue_access_token_with(&config::config().security, user_id, username, roles)
}

pub fn issue_access_token_with(
    security: &SecurityConfig,
    user_id: Uuid,
    username: &str,
    roles: Vec<String>,
) -> Result<AccessToken, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let claims = Claims::new(user_id, username.to_string(), roles, security);
    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());

    let token = encode(&Header::default(), &claims, &encoding_key)
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))?;

    Ok(AccessToken {
        token,
        expires_in: security.access_token_minutes * 60,
    })
}

pub fn decode_access_token(token: &str) -> Result<Claims, AuthError> {
    decode_access_token_with(&config::config().security, token)
}

pub fn decode_access_token_with(security: &SecurityConfig, token: &str) -> Result<Claims, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.set_issuer(&[security.jwt_issuer.as_str()]);
    validation.set_audience(&[security.jwt_audience.as_str()]);
    validation.leeway = 0;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::InvalidToken(e.to_string()),
        })
}

/// Random opaque refresh token; only its digest is persisted
pub fn generate_refresh_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFRESH_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
