use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::debug;

use bazari_core::config::EmailConfig;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("email transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("email gateway rejected the message with status {status}")]
    Gateway { status: u16 },
    #[error("email gateway is not configured: {0}")]
    Misconfigured(String),
}

/// Fire-and-forget transactional email. Implementations must be safe to call
/// from request handlers; callers treat every error as non-fatal.
#[async_trait]
pub trait EmailGateway: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError>;
}

/// Brevo-compatible SMTP API client (`POST /v3/smtp/email`, `api-key` header,
/// 201 on acceptance). Plain-text bodies are converted to HTML by newline
/// substitution, matching what the gateway renders.
pub struct BrevoGateway {
    http: reqwest::Client,
    api_key: SecretString,
    sender_name: String,
    sender_email: String,
    base_url: String,
}

impl BrevoGateway {
    pub fn from_config(config: &EmailConfig) -> Result<Self, EmailError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| EmailError::Misconfigured("email.api_key is not set".to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key,
            sender_name: config.sender_name.clone(),
            sender_email: config.sender_email.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl EmailGateway for BrevoGateway {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        let html_content = body.replace('\n', "<br>");
        let payload = serde_json::json!({
            "sender": { "name": self.sender_name, "email": self.sender_email },
            "to": [{ "email": to }],
            "subject": subject,
            "htmlContent": html_content,
        });

        let response = self
            .http
            .post(format!("{}/v3/smtp/email", self.base_url))
            .header("accept", "application/json")
            .header("api-key", self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 201 {
            return Err(EmailError::Gateway { status });
        }

        Ok(())
    }
}

/// Stands in when email is disabled; records the attempt at debug level and
/// reports success.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopGateway;

#[async_trait]
impl EmailGateway for NoopGateway {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), EmailError> {
        debug!(
            event_name = "notify.email.skipped",
            recipient = to,
            subject = subject,
            "email delivery disabled, skipping send"
        );
        Ok(())
    }
}

/// Pick the gateway the configuration asks for. Falls back to [`NoopGateway`]
/// when email is disabled.
pub fn gateway_from_config(config: &EmailConfig) -> Result<Arc<dyn EmailGateway>, EmailError> {
    if config.enabled {
        Ok(Arc::new(BrevoGateway::from_config(config)?))
    } else {
        Ok(Arc::new(NoopGateway))
    }
}
