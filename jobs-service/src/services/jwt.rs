use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

use crate::config::JwtConfig;

/// Issues and verifies HS256 access tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_minutes: i64,
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Display name
    pub name: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            expiry_minutes: config.expiry_minutes,
        }
    }

    /// Sign a token for `user_id` valid for the configured lifetime.
    pub fn issue(&self, user_id: &str, name: &str) -> Result<String, AppError> {
        self.issue_with_lifetime(user_id, name, Duration::minutes(self.expiry_minutes))
    }

    fn issue_with_lifetime(
        &self,
        user_id: &str,
        name: &str,
        lifetime: Duration,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            name: name.to_string(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to sign token: {}", e)))
    }

    /// Verify signature and expiry. Expired tokens map to `ExpiredToken`.
    pub fn verify(&self, token: &str) -> Result<AccessTokenClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)?;
        Ok(token_data.claims)
    }
}
