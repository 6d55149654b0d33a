use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::SmtpConfig;
use crate::services::ServiceError;

/// Outbound delivery of one-time codes. Best-effort: the engine surfaces a
/// failure to the caller but never rolls back the already-stored code.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_code(
        &self,
        to_email: &str,
        recipient_name: &str,
        code: &str,
    ) -> Result<(), ServiceError>;
}

#[derive(Clone)]
pub struct EmailService {
    mailer: SmtpTransport,
    from_email: String,
}

impl EmailService {
    pub fn new(config: &SmtpConfig) -> Result<Self, ServiceError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| ServiceError::Email(e.to_string()))?
            .credentials(creds)
            .port(587)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "Email service initialized");

        Ok(Self {
            mailer,
            from_email: config.from.clone(),
        })
    }
}

#[async_trait]
impl EmailProvider for EmailService {
    async fn send_code(
        &self,
        to_email: &str,
        recipient_name: &str,
        code: &str,
    ) -> Result<(), ServiceError> {
        let html_body = format!(
            r###"            <html>
                <body style="font-family: Arial, sans-serif;">
                    <h2>Hi {}, here is your verification code</h2>
                    <p>Use the code below to verify your account:</p>
                    <p style="font-size: 32px; font-weight: bold; letter-spacing: 8px;">{}</p>
                    <p style="color: #666; font-size: 12px;">
                        This code expires in a few minutes. Never share it with anyone.
                        If you didn't request it, please ignore this email.
                    </p>
                </body>
            </html>
            "###,
            recipient_name, code
        );

        let plain_body = format!(
            "Hi {},\n\nUse the following code to verify your account:\n\n{}\n\nThis code expires in a few minutes. Never share it with anyone.",
            recipient_name, code
        );

        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .map_err(|e: lettre::address::AddressError| ServiceError::Email(e.to_string()))?,
            )
            .to(to_email
                .parse()
                .map_err(|e: lettre::address::AddressError| ServiceError::Email(e.to_string()))?)
            .subject("Your verification code")
            .multipart(
                lettre::message::MultiPart::alternative()
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body),
                    )
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )
            .map_err(|e| ServiceError::Email(e.to_string()))?;

        // Send in a blocking thread pool; the SMTP transport is synchronous.
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| ServiceError::Internal(e.into()))?;

        match result {
            Ok(_) => {
                // Never log the code itself.
                tracing::info!(to = %to_email, "Verification code sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e.to_string(), to = %to_email, "Failed to send verification code");
                Err(ServiceError::Email(e.to_string()))
            }
        }
    }
}

/// Records dispatched codes instead of sending them. Used by tests; can be
/// toggled to fail to exercise the delivery-failure path.
#[derive(Default)]
pub struct MockEmailService {
    sent: Mutex<Vec<SentCode>>,
    failing: AtomicBool,
}

#[derive(Debug, Clone)]
pub struct SentCode {
    pub to: String,
    pub recipient_name: String,
    pub code: String,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentCode> {
        self.sent.lock().expect("mock mail lock poisoned").clone()
    }

    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .expect("mock mail lock poisoned")
            .iter()
            .rev()
            .find(|s| s.to == email)
            .map(|s| s.code.clone())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_code(
        &self,
        to_email: &str,
        recipient_name: &str,
        code: &str,
    ) -> Result<(), ServiceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ServiceError::Email("smtp unavailable".to_string()));
        }
        self.sent
            .lock()
            .expect("mock mail lock poisoned")
            .push(SentCode {
                to: to_email.to_string(),
                recipient_name: recipient_name.to_string(),
                code: code.to_string(),
            });
        Ok(())
    }
}
