use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque session credential supplied by the calling context
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

/// Identity behind a valid session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Session JWT claims as issued by the auth provider.
/// `role` is the provider's session role ("authenticated"); it is never used
/// for authorization.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub aud: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: Uuid, email: Option<String>, audience: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub,
            email,
            aud: audience.into(),
            role: Some("authenticated".to_string()),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT secret")]
    InvalidSecret,
}

/// Sign claims with a shared HS256 secret
pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Resolves a session credential to the identity behind it
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// `None` when the credential is not a valid session
    async fn resolve(&self, token: &SessionToken) -> Option<Identity>;
}

/// Verifies provider-issued HS256 session tokens locally
pub struct JwtSessionResolver {
    decoding_key: DecodingKey,
    validation: Validation,
    configured: bool,
}

impl JwtSessionResolver {
    pub fn new(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::default();
        validation.set_audience(&[audience]);

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            configured: !secret.is_empty(),
        }
    }
}

#[async_trait]
impl SessionResolver for JwtSessionResolver {
    async fn resolve(&self, token: &SessionToken) -> Option<Identity> {
        if !self.configured {
            tracing::error!("JWT secret not configured; rejecting session");
            return None;
        }

        match decode::<Claims>(token.as_str(), &self.decoding_key, &self.validation) {
            Ok(data) => Some(Identity {
                id: data.claims.sub,
                email: data.claims.email,
            }),
            Err(e) => {
                tracing::debug!("Invalid session token: {}", e);
                None
            }
        }
    }
}
