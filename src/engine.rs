//! Authentication state machine
//!
//! Orchestrates registration, email verification, sign-in, token validation
//! and the password-reset flow. Holds no mutable in-process state: every
//! account transition goes through the [`AccountStore`].

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::config::Settings;
use crate::models::{Account, Profile};
use crate::password;
use crate::secrets;
use crate::store::{self, AccountStore};
use crate::token::JwtManager;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User already exists")]
    AlreadyExists,
    #[error("User not found")]
    NotFound,
    #[error("User already verified")]
    AlreadyVerified,
    #[error("Invalid verification code")]
    InvalidCode,
    #[error("Verification code expired")]
    CodeExpired,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Email not verified")]
    NotVerified,
    #[error("Invalid reset token")]
    InvalidToken,
    #[error("Reset token expired")]
    TokenExpired,
    #[error("Password hashing failed: {0}")]
    Hash(String),
    #[error("Token issuance failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),
}

/// Outcome of a successful registration. The verification code is handed to
/// the notifier by the caller; it never appears in an API response.
#[derive(Debug)]
pub struct Registration {
    pub email: String,
    pub verification_code: String,
    pub code_ttl_minutes: i64,
}

/// Outcome of a successful sign-in
#[derive(Debug)]
pub struct SignInGrant {
    pub access_token: String,
    pub expires_in: u64,
    pub email: String,
}

/// Outcome of initiating a password reset for an existing account
pub struct ResetGrant {
    pub reset_token: String,
    pub token_ttl_hours: i64,
}

/// Result of token validation; never an error
pub struct TokenStatus {
    pub is_valid: bool,
    pub email: Option<String>,
}

pub struct AuthEngine {
    store: AccountStore,
    jwt: JwtManager,
    settings: Settings,
}

impl AuthEngine {
    pub fn new(store: AccountStore, jwt: JwtManager, settings: Settings) -> Self {
        Self {
            store,
            jwt,
            settings,
        }
    }

    /// Create an unverified account with a pending verification code.
    ///
    /// The existence pre-check is a fast path; the store's uniqueness
    /// constraint is what decides concurrent registrations for one email.
    pub fn register(
        &self,
        email: &str,
        plain_password: &str,
        profile: Profile,
    ) -> Result<Registration, AuthError> {
        if self.store.find_by_email(email)?.is_some() {
            return Err(AuthError::AlreadyExists);
        }

        let password_hash =
            password::hash_password(plain_password).map_err(|e| AuthError::Hash(e.to_string()))?;

        let code = secrets::verification_code();
        let ttl_minutes = self.settings.verification_code_expiration_minutes;
        let expires_at = (Utc::now() + Duration::minutes(ttl_minutes)).to_rfc3339();
        let now = Utc::now().to_rfc3339();

        let account = Account {
            email: email.to_string(),
            password_hash,
            fullname: profile.fullname,
            avatar: profile.avatar,
            dob: profile.dob,
            is_verified: false,
            verification_code: Some(code.clone()),
            verification_code_expires_at: Some(expires_at),
            password_reset_token: None,
            password_reset_token_expires_at: None,
            created_at: now.clone(),
            updated_at: now,
        };

        match self.store.insert(&account) {
            Ok(()) => {}
            Err(e) if store::is_unique_violation(&e) => return Err(AuthError::AlreadyExists),
            Err(e) => return Err(AuthError::Store(e)),
        }

        Ok(Registration {
            email: email.to_string(),
            verification_code: code,
            code_ttl_minutes: ttl_minutes,
        })
    }

    /// Consume a pending verification code, flipping the account to verified
    pub fn verify_email(&self, email: &str, code: &str) -> Result<(), AuthError> {
        let account = self.store.find_by_email(email)?.ok_or(AuthError::NotFound)?;

        if account.is_verified {
            return Err(AuthError::AlreadyVerified);
        }

        match &account.verification_code {
            Some(pending) if secrets::constant_time_eq(pending, code) => {}
            _ => return Err(AuthError::InvalidCode),
        }

        if is_past(&account.verification_code_expires_at) {
            return Err(AuthError::CodeExpired);
        }

        self.store.mark_verified(email)?;
        Ok(())
    }

    /// Authenticate and issue a bearer token.
    ///
    /// Unknown email and wrong password both map to `InvalidCredentials` so
    /// the response does not reveal which accounts exist.
    pub fn sign_in(&self, email: &str, plain_password: &str) -> Result<SignInGrant, AuthError> {
        let account = self
            .store
            .find_by_email(email)?
            .ok_or(AuthError::InvalidCredentials)?;

        if !account.is_verified {
            return Err(AuthError::NotVerified);
        }

        if !password::verify_password(plain_password, &account.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = self.jwt.issue(&account.email)?;

        Ok(SignInGrant {
            access_token,
            expires_in: self.jwt.expires_in_secs(),
            email: account.email,
        })
    }

    /// Check a bearer token; reports validity rather than failing
    pub fn validate_token(&self, token: &str) -> TokenStatus {
        match self.jwt.verify(token) {
            Some(email) => TokenStatus {
                is_valid: true,
                email: Some(email),
            },
            None => TokenStatus {
                is_valid: false,
                email: None,
            },
        }
    }

    /// Start a password reset. Returns `None` for unknown emails; the caller
    /// must answer identically in both cases to prevent account enumeration.
    pub fn initiate_password_reset(&self, email: &str) -> Result<Option<ResetGrant>, AuthError> {
        if self.store.find_by_email(email)?.is_none() {
            return Ok(None);
        }

        let token = secrets::reset_token();
        let ttl_hours = self.settings.password_reset_expiration_hours;
        let expires_at = (Utc::now() + Duration::hours(ttl_hours)).to_rfc3339();

        self.store.set_reset_token(email, &token, &expires_at)?;

        Ok(Some(ResetGrant {
            reset_token: token,
            token_ttl_hours: ttl_hours,
        }))
    }

    /// Consume a reset token and install the new password
    pub fn confirm_password_reset(
        &self,
        email: &str,
        reset_token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let account = self.store.find_by_email(email)?.ok_or(AuthError::NotFound)?;

        match &account.password_reset_token {
            Some(pending) if secrets::constant_time_eq(pending, reset_token) => {}
            _ => return Err(AuthError::InvalidToken),
        }

        if is_past(&account.password_reset_token_expires_at) {
            return Err(AuthError::TokenExpired);
        }

        let password_hash =
            password::hash_password(new_password).map_err(|e| AuthError::Hash(e.to_string()))?;
        self.store.update_password(email, &password_hash)?;
        Ok(())
    }

    /// Account lookup for the `/me` endpoint
    pub fn account(&self, email: &str) -> Result<Option<Account>, AuthError> {
        Ok(self.store.find_by_email(email)?)
    }
}

/// True when an expiry timestamp exists and lies strictly in the past.
/// An unparseable timestamp counts as expired.
fn is_past(expires_at: &Option<String>) -> bool {
    match expires_at {
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(expiry) => Utc::now() > expiry,
            Err(_) => true,
        },
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::JwtConfig;
    use assert_matches::assert_matches;

    fn engine() -> AuthEngine {
        let settings = Settings::default();
        let jwt = JwtManager::new(JwtConfig::new(
            "test-secret".to_string(),
            settings.jwt_expiration_hours,
        ));
        AuthEngine::new(AccountStore::in_memory().unwrap(), jwt, settings)
    }

    fn register(engine: &AuthEngine, email: &str) -> Registration {
        engine
            .register(email, "password123", Profile::default())
            .unwrap()
    }

    #[test]
    fn test_register_issues_six_digit_code() {
        let engine = engine();
        let reg = register(&engine, "a@x.com");
        assert_eq!(reg.email, "a@x.com");
        assert_eq!(reg.verification_code.len(), 6);
        assert!(reg.verification_code.chars().all(|c| c.is_ascii_digit()));

        let stored = engine.account("a@x.com").unwrap().unwrap();
        assert!(!stored.is_verified);
        assert_eq!(
            stored.verification_code.as_deref(),
            Some(reg.verification_code.as_str())
        );
        assert_ne!(stored.password_hash, "password123");
    }

    #[test]
    fn test_duplicate_registration_conflicts() {
        let engine = engine();
        register(&engine, "dup@x.com");
        let err = engine
            .register("dup@x.com", "password123", Profile::default())
            .unwrap_err();
        assert_matches!(err, AuthError::AlreadyExists);
    }

    #[test]
    fn test_verify_email_happy_path_and_replay() {
        let engine = engine();
        let reg = register(&engine, "a@x.com");

        engine.verify_email("a@x.com", &reg.verification_code).unwrap();
        let stored = engine.account("a@x.com").unwrap().unwrap();
        assert!(stored.is_verified);
        assert!(stored.verification_code.is_none());

        // A consumed code is never reusable.
        let err = engine
            .verify_email("a@x.com", &reg.verification_code)
            .unwrap_err();
        assert_matches!(err, AuthError::AlreadyVerified);
    }

    #[test]
    fn test_verify_email_failures() {
        let engine = engine();
        register(&engine, "a@x.com");

        assert_matches!(
            engine.verify_email("missing@x.com", "000000").unwrap_err(),
            AuthError::NotFound
        );
        assert_matches!(
            engine.verify_email("a@x.com", "000000").unwrap_err(),
            AuthError::InvalidCode
        );
    }

    #[test]
    fn test_verify_email_expired_code() {
        let engine = engine();
        let reg = register(&engine, "a@x.com");

        // Backdate the pending expiry.
        engine
            .store
            .set_verification_expiry("a@x.com", "2000-01-01T00:00:00+00:00")
            .unwrap();

        assert_matches!(
            engine
                .verify_email("a@x.com", &reg.verification_code)
                .unwrap_err(),
            AuthError::CodeExpired
        );
    }

    #[test]
    fn test_sign_in_requires_verification() {
        let engine = engine();
        register(&engine, "a@x.com");

        assert_matches!(
            engine.sign_in("a@x.com", "password123").unwrap_err(),
            AuthError::NotVerified
        );
    }

    #[test]
    fn test_sign_in_does_not_reveal_existence() {
        let engine = engine();
        let reg = register(&engine, "a@x.com");
        engine.verify_email("a@x.com", &reg.verification_code).unwrap();

        assert_matches!(
            engine.sign_in("a@x.com", "wrongpassword").unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert_matches!(
            engine.sign_in("nobody@x.com", "password123").unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[test]
    fn test_sign_in_token_round_trips() {
        let engine = engine();
        let reg = register(&engine, "a@x.com");
        engine.verify_email("a@x.com", &reg.verification_code).unwrap();

        let grant = engine.sign_in("a@x.com", "password123").unwrap();
        assert_eq!(grant.expires_in, 86400);
        assert_eq!(grant.email, "a@x.com");

        let status = engine.validate_token(&grant.access_token);
        assert!(status.is_valid);
        assert_eq!(status.email.as_deref(), Some("a@x.com"));

        let status = engine.validate_token("not.a.token");
        assert!(!status.is_valid);
        assert!(status.email.is_none());
    }

    #[test]
    fn test_initiate_reset_silent_for_unknown_email() {
        let engine = engine();
        assert!(engine.initiate_password_reset("nobody@x.com").unwrap().is_none());
    }

    #[test]
    fn test_full_password_reset_flow() {
        let engine = engine();
        let reg = register(&engine, "a@x.com");
        engine.verify_email("a@x.com", &reg.verification_code).unwrap();

        let grant = engine.initiate_password_reset("a@x.com").unwrap().unwrap();
        assert_eq!(grant.reset_token.len(), 32);

        engine
            .confirm_password_reset("a@x.com", &grant.reset_token, "newpassword456")
            .unwrap();

        // Old password no longer authenticates, new one does.
        assert_matches!(
            engine.sign_in("a@x.com", "password123").unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert!(engine.sign_in("a@x.com", "newpassword456").is_ok());

        // Token is cleared after use.
        assert_matches!(
            engine
                .confirm_password_reset("a@x.com", &grant.reset_token, "another789")
                .unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[test]
    fn test_confirm_reset_failures() {
        let engine = engine();
        register(&engine, "a@x.com");

        assert_matches!(
            engine
                .confirm_password_reset("nobody@x.com", "tok", "newpassword456")
                .unwrap_err(),
            AuthError::NotFound
        );

        let grant = engine.initiate_password_reset("a@x.com").unwrap().unwrap();
        assert_matches!(
            engine
                .confirm_password_reset("a@x.com", "mismatched-token", "newpassword456")
                .unwrap_err(),
            AuthError::InvalidToken
        );

        engine
            .store
            .set_reset_token("a@x.com", &grant.reset_token, "2000-01-01T00:00:00+00:00")
            .unwrap();
        assert_matches!(
            engine
                .confirm_password_reset("a@x.com", &grant.reset_token, "newpassword456")
                .unwrap_err(),
            AuthError::TokenExpired
        );
    }
}
