//! Client for the hosted auth provider's user endpoint.
//!
//! The storefront never issues tokens itself. A bearer token from the
//! browser is forwarded to `GET {base}/auth/v1/user` together with the
//! project's anon key; a 2xx answer carries the user's id and email.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ClientError;

/// The identity behind a verified access token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Verifies access tokens against the auth provider.
pub struct AuthClient {
    client: Client,
    anon_key: String,
    user_url: Url,
}

impl AuthClient {
    /// Creates a client for the auth provider rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ClientError::InvalidBaseUrl`] if
    /// `base_url` is not a valid URL.
    pub fn new(base_url: &str, anon_key: &str, timeout_secs: u64) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("storefront/0.1")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let user_url = Url::parse(&normalised)
            .and_then(|base| base.join("auth/v1/user"))
            .map_err(|e| ClientError::InvalidBaseUrl {
                url: base_url.to_owned(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            anon_key: anon_key.to_owned(),
            user_url,
        })
    }

    /// Resolves an access token to the user it was issued for.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Unauthorized`] if the provider answers 401 or 403.
    /// - [`ClientError::Upstream`] for any other non-2xx status.
    /// - [`ClientError::Http`] on network failure.
    /// - [`ClientError::Deserialize`] if the user payload has no usable id.
    pub async fn verify(&self, access_token: &str) -> Result<AuthUser, ClientError> {
        let response = self
            .client
            .get(self.user_url.clone())
            .bearer_auth(access_token)
            .header("apikey", &self.anon_key)
            .send()
            .await?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(ClientError::Unauthorized);
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Upstream {
                service: "auth provider",
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ClientError::Deserialize {
            context: "auth user".to_string(),
            source: e,
        })
    }
}
