//! Email delivery for verification codes and reset tokens
//!
//! Delivery is fire-and-forget from the engine's point of view: a send
//! failure is logged and never rolls back the state change it accompanies.

use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// SMTP configuration
#[derive(Clone)]
pub struct SmtpConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub sender_email: String,
    pub sender_name: String,
}

impl SmtpConfig {
    pub fn from_env() -> Option<Self> {
        Some(Self {
            smtp_host: std::env::var("SMTP_HOST").ok()?,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(587),
            smtp_username: std::env::var("SMTP_USERNAME").ok()?,
            smtp_password: std::env::var("SMTP_PASSWORD").ok()?,
            sender_email: std::env::var("SENDER_EMAIL").ok()?,
            sender_name: std::env::var("SENDER_NAME").unwrap_or_else(|_| "Authd".to_string()),
        })
    }
}

/// SMTP-backed mailer
pub struct SmtpNotifier {
    config: SmtpConfig,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    pub fn new(config: SmtpConfig) -> Result<Self, lettre::transport::smtp::Error> {
        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(creds)
            .build();

        Ok(Self { config, mailer })
    }

    async fn send(&self, recipient: &str, subject: &str, html: &str, text: &str) -> bool {
        let from = match format!("{} <{}>", self.config.sender_name, self.config.sender_email)
            .parse()
        {
            Ok(mailbox) => mailbox,
            Err(e) => {
                log::error!("Invalid sender address: {}", e);
                return false;
            }
        };
        let to = match recipient.parse() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                log::error!("Invalid recipient address {}: {}", recipient, e);
                return false;
            }
        };

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html.to_string()),
                    ),
            );

        let message = match message {
            Ok(m) => m,
            Err(e) => {
                log::error!("Failed to build email to {}: {}", recipient, e);
                return false;
            }
        };

        match self.mailer.send(message).await {
            Ok(_) => {
                log::info!("Email sent to {}", recipient);
                true
            }
            Err(e) => {
                log::error!("Failed to send email to {}: {}", recipient, e);
                false
            }
        }
    }
}

/// Log-only mailer used when SMTP is not configured
pub struct MockNotifier;

impl MockNotifier {
    async fn send(&self, recipient: &str, subject: &str, _html: &str, text: &str) -> bool {
        log::info!("[MOCK EMAIL] to={} subject={:?} body={:?}", recipient, subject, text);
        true
    }
}

/// Out-of-band delivery channel for short-lived secrets
pub enum Notifier {
    Smtp(SmtpNotifier),
    Mock(MockNotifier),
}

impl Notifier {
    pub fn from_env() -> Self {
        match SmtpConfig::from_env() {
            Some(config) => match SmtpNotifier::new(config) {
                Ok(notifier) => {
                    log::info!("SMTP notifier configured");
                    Notifier::Smtp(notifier)
                }
                Err(e) => {
                    log::warn!("Failed to initialize SMTP transport: {}. Using mock.", e);
                    Notifier::Mock(MockNotifier)
                }
            },
            None => {
                log::info!("SMTP not configured. Using mock notifier.");
                Notifier::Mock(MockNotifier)
            }
        }
    }

    /// Deliver a message. Returns false on failure, never panics.
    pub async fn send(&self, recipient: &str, subject: &str, html: &str, text: &str) -> bool {
        match self {
            Notifier::Smtp(smtp) => smtp.send(recipient, subject, html, text).await,
            Notifier::Mock(mock) => mock.send(recipient, subject, html, text).await,
        }
    }

    /// Send the 6-digit email verification code
    pub async fn send_verification_code(
        &self,
        recipient: &str,
        code: &str,
        ttl_minutes: i64,
    ) -> bool {
        let html = format!(
            r#"<html>
    <body style="font-family: Arial, sans-serif;">
        <h2>Email Verification</h2>
        <p>Hello,</p>
        <p>Your verification code is:</p>
        <h1 style="color: #007bff; letter-spacing: 5px;">{code}</h1>
        <p>This code will expire in {ttl_minutes} minutes.</p>
        <p>If you didn't request this, please ignore this email.</p>
    </body>
</html>"#
        );
        let text = format!("Your verification code is: {code}");

        self.send(recipient, "Email Verification", &html, &text).await
    }

    /// Send the password reset token
    pub async fn send_reset_token(&self, recipient: &str, token: &str, ttl_hours: i64) -> bool {
        let html = format!(
            r#"<html>
    <body style="font-family: Arial, sans-serif;">
        <h2>Password Reset Request</h2>
        <p>Hello,</p>
        <p>We received a request to reset your password. Use the token below:</p>
        <code style="background-color: #f5f5f5; padding: 10px; display: block; margin: 10px 0;">{token}</code>
        <p>This token will expire in {ttl_hours} hour(s).</p>
        <p>If you didn't request this, please ignore this email.</p>
    </body>
</html>"#
        );
        let text = format!("Your password reset token is: {token}");

        self.send(recipient, "Password Reset", &html, &text).await
    }
}
