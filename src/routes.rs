//! REST API routes

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::email::Notifier;
use crate::engine::{AuthEngine, AuthError};
use crate::models::*;
use crate::password::validate_password;

/// Shared application state, constructed once at startup
pub struct AppState {
    pub engine: AuthEngine,
    pub notifier: Notifier,
}

/// Build the full application router
pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/auth", auth_router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(signup))
        .route("/verify-email", post(verify_email))
        .route("/signin", post(sign_in))
        .route("/validate-token", post(validate_token))
        .route("/password-reset", post(password_reset))
        .route("/password-reset-confirm", post(password_reset_confirm))
        .route("/me", get(get_current_account))
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn status_for(err: &AuthError) -> StatusCode {
    match err {
        AuthError::AlreadyExists
        | AuthError::NotFound
        | AuthError::AlreadyVerified
        | AuthError::InvalidCode
        | AuthError::CodeExpired
        | AuthError::InvalidToken
        | AuthError::TokenExpired => StatusCode::BAD_REQUEST,
        AuthError::InvalidCredentials | AuthError::NotVerified => StatusCode::UNAUTHORIZED,
        AuthError::Hash(_) | AuthError::Jwt(_) | AuthError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Map an engine failure to a response, hiding internals behind a 500
fn engine_error(context: &str, err: AuthError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        log::error!("{}: {}", context, err);
        error_response(status, "Internal server error")
    } else {
        error_response(status, &err.to_string())
    }
}

/// POST /auth/signup - Register a new account
async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> impl IntoResponse {
    if !req.email.contains('@') || req.email.len() < 5 {
        return error_response(StatusCode::BAD_REQUEST, "Invalid email format");
    }
    if let Err(e) = validate_password(&req.password) {
        return error_response(StatusCode::BAD_REQUEST, e);
    }

    let profile = Profile {
        fullname: req.fullname,
        avatar: req.avatar,
        dob: req.dob,
    };

    let registration = match state.engine.register(&req.email, &req.password, profile) {
        Ok(registration) => registration,
        Err(e) => return engine_error("Signup failed", e),
    };

    // Deliver the code out-of-band; the account is already committed and a
    // failed send must not fail the request.
    let notify_state = state.clone();
    tokio::spawn(async move {
        let sent = notify_state
            .notifier
            .send_verification_code(
                &registration.email,
                &registration.verification_code,
                registration.code_ttl_minutes,
            )
            .await;
        if !sent {
            log::error!("Failed to send verification email to {}", registration.email);
        }
    });

    (
        StatusCode::CREATED,
        Json(SignupResponse {
            email: req.email,
            message: "User registered successfully. Please verify your email.".to_string(),
        }),
    )
        .into_response()
}

/// POST /auth/verify-email - Consume a verification code
async fn verify_email(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyEmailRequest>,
) -> impl IntoResponse {
    let code = req.verification_code.trim();
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Verification code must be 6 digits",
        );
    }

    match state.engine.verify_email(&req.email, code) {
        Ok(()) => Json(MessageResponse {
            message: "Email verified successfully".to_string(),
        })
        .into_response(),
        Err(e) => engine_error("Email verification failed", e),
    }
}

/// POST /auth/signin - Authenticate and issue a bearer token
async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignInRequest>,
) -> impl IntoResponse {
    match state.engine.sign_in(&req.email, &req.password) {
        Ok(grant) => Json(SignInResponse {
            access_token: grant.access_token,
            token_type: "bearer".to_string(),
            expires_in: grant.expires_in,
            email: grant.email,
        })
        .into_response(),
        Err(e) => engine_error("Sign-in failed", e),
    }
}

/// POST /auth/validate-token - Check a bearer token; always 200
async fn validate_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValidateTokenRequest>,
) -> impl IntoResponse {
    let status = state.engine.validate_token(&req.token);
    let message = if status.is_valid {
        "Token is valid"
    } else {
        "Invalid or expired token"
    };

    Json(ValidateTokenResponse {
        is_valid: status.is_valid,
        email: status.email,
        message: message.to_string(),
    })
}

/// POST /auth/password-reset - Initiate a reset; always reports success
async fn password_reset(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PasswordResetRequest>,
) -> impl IntoResponse {
    match state.engine.initiate_password_reset(&req.email) {
        Ok(Some(grant)) => {
            let notify_state = state.clone();
            let email = req.email.clone();
            tokio::spawn(async move {
                let sent = notify_state
                    .notifier
                    .send_reset_token(&email, &grant.reset_token, grant.token_ttl_hours)
                    .await;
                if !sent {
                    log::error!("Failed to send password reset email to {}", email);
                }
            });
        }
        // Unknown email: same response as the happy path, nothing stored.
        Ok(None) => {}
        Err(e) => return engine_error("Password reset initiation failed", e),
    }

    Json(MessageResponse {
        message: "Password reset email sent successfully".to_string(),
    })
    .into_response()
}

/// POST /auth/password-reset-confirm - Consume a reset token
async fn password_reset_confirm(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PasswordResetConfirmRequest>,
) -> impl IntoResponse {
    if let Err(e) = validate_password(&req.new_password) {
        return error_response(StatusCode::BAD_REQUEST, e);
    }

    match state
        .engine
        .confirm_password_reset(&req.email, &req.reset_token, &req.new_password)
    {
        Ok(()) => Json(MessageResponse {
            message: "Password reset successfully".to_string(),
        })
        .into_response(),
        Err(e) => engine_error("Password reset confirmation failed", e),
    }
}

/// GET /auth/me - Current account from the bearer token
async fn get_current_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let token = match bearer_token(&headers) {
        Some(token) => token,
        None => {
            return error_response(StatusCode::UNAUTHORIZED, "Missing or invalid authorization header")
        }
    };

    let status = state.engine.validate_token(token);
    let email = match status.email {
        Some(email) if status.is_valid => email,
        _ => return error_response(StatusCode::UNAUTHORIZED, "Invalid or expired token"),
    };

    match state.engine.account(&email) {
        Ok(Some(account)) => Json(AccountInfoResponse::from(&account)).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "User not found"),
        Err(e) => engine_error("Account lookup failed", e),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Welcome to the authd API",
        "version": crate::VERSION,
    }))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": crate::NAME,
    }))
}
