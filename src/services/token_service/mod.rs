pub mod error;
pub mod settings;

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use derive_more::Constructor;
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use sha2::Sha256;

use self::{settings::TokenSettings, error::{Result, TokenError}};

///
/// Access tokens are issued by the external auth system; this service only
/// checks them against the shared secret.
///
pub trait TokenService: Send + Sync {
    ///
    /// Signs a JWT for `user_id`, valid for the configured lifetime
    ///
    fn generate_access_token(&self, user_id: i64) -> Result<String>;

    ///
    /// Verifies a JWT `token`, and returns the user ID from its claims on successful verification.
    /// Returns `Error` if the signature is invalid or the token is stale
    ///
    fn verify_access_token(&self, access_token: &str) -> Result<i64>;
}

#[derive(Clone, Constructor)]
pub struct CoreTokenService {
    secret: String,
    settings: TokenSettings,
}

impl CoreTokenService {
    fn key(&self) -> Result<Hmac<Sha256>> {
        Hmac::new_from_slice(self.secret.as_bytes()).map_err(|_| TokenError::InvalidKey)
    }
}

impl TokenService for CoreTokenService {
    fn generate_access_token(&self, user_id: i64) -> Result<String> {
        let mut claims = BTreeMap::new();
        claims.insert("user_id", user_id.to_string());

        let expires = (Utc::now() + Duration::seconds(self.settings.jwt_lifetime_s)).to_rfc3339();
        claims.insert("expires", expires);

        claims.sign_with_key(&self.key()?).map_err(TokenError::JwtError)
    }

    fn verify_access_token(&self, token: &str) -> Result<i64> {
        // Verify the JWT using the hash key
        let claims: BTreeMap<String, String> = token.verify_with_key(&self.key()?).map_err(TokenError::JwtError)?;

        // Check the expires parameter, and return error if the token is stale
        let expires = claims.get("expires")
            .and_then(|exp| DateTime::parse_from_rfc3339(exp).ok())
            .ok_or(TokenError::MalformedClaims)?;
        if Utc::now() > expires {
            return Err(TokenError::TokenStale);
        }

        // Otherwise, return the user ID from the token
        claims.get("user_id")
            .and_then(|id| id.parse::<i64>().ok())
            .ok_or(TokenError::MalformedClaims)
    }
}
