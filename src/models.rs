//! Account data model and API request/response types

use serde::{Deserialize, Serialize};

/// User account, keyed by email
#[derive(Debug, Clone)]
pub struct Account {
    pub email: String,
    pub password_hash: String,
    pub fullname: Option<String>,
    pub avatar: Option<String>,
    pub dob: Option<String>,
    pub is_verified: bool,
    pub verification_code: Option<String>,
    pub verification_code_expires_at: Option<String>,
    pub password_reset_token: Option<String>,
    pub password_reset_token_expires_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Optional profile fields supplied at signup
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub fullname: Option<String>,
    pub avatar: Option<String>,
    pub dob: Option<String>,
}

/// API request/response types
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub fullname: Option<String>,
    pub avatar: Option<String>,
    pub dob: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub email: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub verification_code: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ValidateTokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateTokenResponse {
    pub is_valid: bool,
    pub email: Option<String>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetConfirmRequest {
    pub email: String,
    pub reset_token: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AccountInfoResponse {
    pub email: String,
    pub fullname: Option<String>,
    pub avatar: Option<String>,
    pub dob: Option<String>,
    pub is_verified: bool,
    pub created_at: String,
}

impl From<&Account> for AccountInfoResponse {
    fn from(account: &Account) -> Self {
        Self {
            email: account.email.clone(),
            fullname: account.fullname.clone(),
            avatar: account.avatar.clone(),
            dob: account.dob.clone(),
            is_verified: account.is_verified,
            created_at: account.created_at.clone(),
        }
    }
}
