use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::SmtpConfig;

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_verification_code(&self, to_email: &str, code: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct EmailService {
    mailer: SmtpTransport,
    from_email: String,
}

impl EmailService {
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let from_email = config
            .from
            .clone()
            .ok_or_else(|| AppError::ConfigError(anyhow::anyhow!("SMTP_FROM or SMTP_USER must be set")))?;

        let mut builder = if config.port == 465 {
            SmtpTransport::relay(&config.host)
        } else {
            SmtpTransport::starttls_relay(&config.host)
        }
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e.to_string())))?
        .port(config.port)
        .timeout(Some(Duration::from_secs(10)));

        if let (Some(user), Some(password)) = (&config.user, &config.password) {
            builder = builder.credentials(Credentials::new(
                user.clone(),
                password.expose_secret().clone(),
            ));
        }

        tracing::info!(host = %config.host, port = config.port, "Email service initialized");

        Ok(Self {
            mailer: builder.build(),
            from_email,
        })
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: String,
        html_body: String,
    ) -> Result<(), AppError> {
        let from = format!("Portfolio Admin <{}>", self.from_email);
        let email = Message::builder()
            .from(from.parse().map_err(|e: lettre::address::AddressError| AppError::InternalError(e.into()))?)
            .to(to_email.parse().map_err(|e: lettre::address::AddressError| AppError::InternalError(e.into()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )?;

        // SmtpTransport is blocking
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "Email sent successfully");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, to = %to_email, "Failed to send email");
                Err(AppError::EmailError(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl EmailProvider for EmailService {
    async fn send_verification_code(&self, to_email: &str, code: &str) -> Result<(), AppError> {
        let html_body = format!(
            r###"<div style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2 style="text-align: center;">Access verification</h2>
    <p>Use the code below to sign in to the portfolio admin panel:</p>
    <div style="padding: 20px; text-align: center; font-size: 32px; font-weight: bold; letter-spacing: 5px; color: #CCFF00; background: #0A0A0A; border-radius: 8px;">
        {}
    </div>
    <p style="font-size: 14px; color: #666; text-align: center;">This code expires in 10 minutes.</p>
    <p style="font-size: 12px; color: #999; text-align: center;">If you did not request this code, ignore this email.</p>
</div>"###,
            code
        );

        let plain_body = format!(
            "Your verification code is: {}. It expires in 10 minutes.",
            code
        );

        self.send_email(to_email, "Your portfolio access code", plain_body, html_body)
            .await
    }
}

/// Records codes instead of sending them.
#[derive(Default)]
pub struct MockEmailService {
    sent: Mutex<Vec<(String, String)>>,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent code sent to `to_email`.
    pub fn last_code_for(&self, to_email: &str) -> Option<String> {
        self.sent.lock().ok().and_then(|sent| {
            sent.iter()
                .rev()
                .find(|(to, _)| to == to_email)
                .map(|(_, code)| code.clone())
        })
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_verification_code(&self, to_email: &str, code: &str) -> Result<(), AppError> {
        self.sent
            .lock()
            .map_err(|_| AppError::EmailError("mock mailbox poisoned".into()))?
            .push((to_email.to_string(), code.to_string()));
        Ok(())
    }
}
