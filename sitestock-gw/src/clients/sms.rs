//! Outbound SMS client (Africa's Talking messaging API)

use std::time::Duration;

use thiserror::Error;

const USER_AGENT: &str = "SiteStock/0.1.0";
const SANDBOX_BASE_URL: &str = "https://api.sandbox.africastalking.com";
const LIVE_BASE_URL: &str = "https://api.africastalking.com";

/// SMS client errors
#[derive(Debug, Error)]
pub enum SmsError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Gateway error {0}: {1}")]
    Gateway(u16, String),

    #[error("SMS sending disabled: no API key configured")]
    NotConfigured,
}

/// Capability interface for delivering outbound messages.
///
/// Injected into the notification dispatcher and the free-text reply path;
/// tests substitute deterministic fakes.
#[async_trait::async_trait]
pub trait SmsSender: Send + Sync {
    /// Deliver `message` to every recipient phone number
    async fn send(&self, recipients: &[String], message: &str) -> Result<(), SmsError>;
}

/// Africa's Talking messaging API client
pub struct AtSmsClient {
    http_client: reqwest::Client,
    username: String,
    api_key: Option<String>,
    sender: Option<String>,
    base_url: String,
}

impl AtSmsClient {
    /// Build a client for the configured account.
    ///
    /// The `sandbox` username routes to the sandbox host. A missing API key
    /// leaves the client in a degraded state where every send reports
    /// `SmsError::NotConfigured`; callers already absorb send failures.
    pub fn new(
        username: String,
        api_key: Option<String>,
        sender: Option<String>,
    ) -> Result<Self, SmsError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SmsError::Network(e.to_string()))?;

        let base_url = if username == "sandbox" {
            SANDBOX_BASE_URL.to_string()
        } else {
            LIVE_BASE_URL.to_string()
        };

        Ok(Self {
            http_client,
            username,
            api_key,
            sender,
            base_url,
        })
    }
}

#[async_trait::async_trait]
impl SmsSender for AtSmsClient {
    async fn send(&self, recipients: &[String], message: &str) -> Result<(), SmsError> {
        let api_key = self.api_key.as_deref().ok_or(SmsError::NotConfigured)?;

        let mut params = vec![
            ("username", self.username.clone()),
            ("to", recipients.join(",")),
            ("message", message.to_string()),
        ];
        if let Some(sender) = &self.sender {
            params.push(("from", sender.clone()));
        }

        let url = format!("{}/version1/messaging", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .header("apiKey", api_key)
            .header("Accept", "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| SmsError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SmsError::Gateway(status.as_u16(), body));
        }

        Ok(())
    }
}
