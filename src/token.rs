//! Bearer token signing and verification

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Claims carried by an access token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // account email
    pub exp: usize,
    pub iat: usize,
}

/// Signing configuration, fixed for the process lifetime
#[derive(Clone)]
pub struct JwtConfig {
    secret: String,
    expiration_hours: u64,
}

impl JwtConfig {
    pub fn new(secret: String, expiration_hours: u64) -> Self {
        Self {
            secret,
            expiration_hours,
        }
    }
}

/// Issues and verifies HS256 bearer tokens
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
}

impl JwtManager {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    /// Access-token lifetime in seconds, as reported in sign-in responses
    pub fn expires_in_secs(&self) -> u64 {
        self.config.expiration_hours * 3600
    }

    /// Create a signed token for a subject
    pub fn issue(&self, subject: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_secs() as usize;

        let claims = Claims {
            sub: subject.to_string(),
            exp: now + (self.config.expiration_hours as usize * 3600),
            iat: now,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.secret.as_bytes()),
        )
    }

    /// Verify signature and expiry, returning the subject if valid.
    /// Any failure (bad signature, expired, missing/empty subject) is `None`.
    pub fn verify(&self, token: &str) -> Option<String> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.secret.as_bytes()),
            &Validation::default(),
        )
        .ok()?;

        if data.claims.sub.is_empty() {
            return None;
        }
        Some(data.claims.sub)
    }

    /// Extract claims without checking the signature or expiry.
    ///
    /// Debug-only: never use this on an authentication decision path.
    pub fn decode_unverified(&self, token: &str) -> Option<Claims> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.secret.as_bytes()),
            &validation,
        )
        .ok()
        .map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(secret: &str) -> JwtManager {
        JwtManager::new(JwtConfig::new(secret.to_string(), 24))
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let jwt = manager("test-secret");
        let token = jwt.issue("a@x.com").unwrap();
        assert_eq!(jwt.verify(&token).as_deref(), Some("a@x.com"));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        let jwt = manager("test-secret");
        assert!(jwt.verify("invalid.token.here").is_none());
    }

    #[test]
    fn test_token_does_not_verify_under_other_key() {
        let token = manager("key-one").issue("a@x.com").unwrap();
        assert!(manager("key-two").verify(&token).is_none());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as usize;
        let claims = Claims {
            sub: "a@x.com".to_string(),
            exp: now - 3600,
            iat: now - 7200,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(manager("test-secret").verify(&token).is_none());
    }

    #[test]
    fn test_decode_unverified_ignores_signature() {
        let token = manager("key-one").issue("a@x.com").unwrap();
        let claims = manager("key-two").decode_unverified(&token).unwrap();
        assert_eq!(claims.sub, "a@x.com");
    }

    #[test]
    fn test_expires_in_secs() {
        assert_eq!(manager("s").expires_in_secs(), 86400);
    }
}
