use crate::{
    config::AuthConfig,
    error::{LedgerError, Result},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (actor / user id as known to the identity store)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

pub struct JWTService {
    config: Arc<AuthConfig>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JWTService {
    pub fn new(config: Arc<AuthConfig>) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Issue an access token for an actor
    pub fn generate_token(&self, actor_id: &str) -> Result<String> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let exp = now + (self.config.access_token_expiration_minutes as i64 * 60);

        let claims = Claims {
            sub: actor_id.to_string(),
            iat: now,
            exp,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| LedgerError::Internal(e.into()))
    }

    /// Validate a token and return the actor id it was issued for
    pub fn validate_token(&self, token: &str) -> Result<String> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    LedgerError::Unauthorized("Access token expired".to_string())
                }
                _ => LedgerError::Unauthorized(format!("Invalid access token: {}", e)),
            })?;

        if token_data.claims.sub.is_empty() {
            return Err(LedgerError::Unauthorized(
                "Access token has no subject".to_string(),
            ));
        }

        Ok(token_data.claims.sub)
    }
}
