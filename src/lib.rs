//! # Authd
//!
//! User-account authentication service:
//! - Registration with email verification (6-digit codes)
//! - Credential sign-in issuing JWT bearer tokens
//! - Token validation
//! - Self-service password reset
//!
//! All account state lives in the [`store::AccountStore`]; the
//! [`engine::AuthEngine`] is the state machine driving transitions between
//! unverified and verified accounts and the lifecycle of short-lived
//! secrets. HTTP handlers in [`routes`] are thin adapters over the engine.

pub mod config;
pub mod email;
pub mod engine;
pub mod models;
pub mod password;
pub mod routes;
pub mod secrets;
pub mod store;
pub mod token;

pub use config::Settings;
pub use email::Notifier;
pub use engine::{AuthEngine, AuthError};
pub use routes::{app_router, AppState};
pub use store::AccountStore;
pub use token::{JwtConfig, JwtManager};

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
