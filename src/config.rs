//! Service configuration from environment variables

/// Core settings: signing key and secret lifetimes
#[derive(Clone)]
pub struct Settings {
    pub jwt_secret: String,
    pub jwt_expiration_hours: u64,
    pub verification_code_expiration_minutes: i64,
    pub password_reset_expiration_hours: i64,
}

impl Settings {
    pub fn from_env() -> Self {
        let jwt_secret =
            std::env::var("JWT_SECRET").unwrap_or_else(|_| "default-secret-change-me".to_string());
        let jwt_expiration_hours = std::env::var("JWT_EXPIRATION_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(24);
        let verification_code_expiration_minutes =
            std::env::var("VERIFICATION_CODE_EXPIRATION_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15);
        let password_reset_expiration_hours = std::env::var("PASSWORD_RESET_EXPIRATION_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);

        Self {
            jwt_secret,
            jwt_expiration_hours,
            verification_code_expiration_minutes,
            password_reset_expiration_hours,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            jwt_secret: "default-secret-change-me".to_string(),
            jwt_expiration_hours: 24,
            verification_code_expiration_minutes: 15,
            password_reset_expiration_hours: 1,
        }
    }
}
