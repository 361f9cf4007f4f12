//! Client for the transactional email API (`POST {base}/emails`).

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Serialize;

use crate::error::ClientError;

#[derive(Debug, Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Sends single-recipient HTML emails from a fixed sender address.
pub struct MailClient {
    client: Client,
    api_key: String,
    from: String,
    emails_url: Url,
}

impl MailClient {
    /// Creates a client for the email API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ClientError::InvalidBaseUrl`] if
    /// `base_url` is not a valid URL.
    pub fn new(
        base_url: &str,
        api_key: &str,
        from: &str,
        timeout_secs: u64,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("storefront/0.1")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let emails_url = Url::parse(&normalised)
            .and_then(|base| base.join("emails"))
            .map_err(|e| ClientError::InvalidBaseUrl {
                url: base_url.to_owned(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            from: from.to_owned(),
            emails_url,
        })
    }

    /// Sends one email. Exactly one HTTP request is made; there is no retry.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Upstream`] if the API answers non-2xx, or
    /// [`ClientError::Http`] on network failure.
    pub async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), ClientError> {
        let payload = OutgoingEmail {
            from: &self.from,
            to: [to],
            subject,
            html,
        };

        let response = self
            .client
            .post(self.emails_url.clone())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Upstream {
                service: "mail API",
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(to, subject, "email accepted by mail API");
        Ok(())
    }
}
