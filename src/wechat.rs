//! Minimal WeChat Official Account client (access token + message send).

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::message::Message;
use crate::{Error, Result};

/// Access token issued for the client-credential grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_in: i64,
}

/// The `errcode`/`errmsg` envelope every endpoint answers with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProviderResponse {
    #[serde(rename = "errcode", default)]
    pub code: i64,
    #[serde(rename = "errmsg", default)]
    pub message: String,
}

impl ProviderResponse {
    pub fn into_result(self) -> Result<()> {
        if self.code == 0 {
            Ok(())
        } else {
            Err(Error::Provider {
                code: self.code,
                message: self.message,
            })
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: i64,
    #[serde(flatten)]
    status: ProviderResponse,
}

#[derive(Debug, Clone)]
pub struct WechatClient {
    http: Client,
    app_id: String,
    secret: String,
    base_url: String,
}

impl WechatClient {
    /// Create client from validated configuration.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .user_agent(format!("wechat_notify/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            app_id: config.app_id.clone(),
            secret: config.secret.clone(),
            base_url: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Override the API root (primarily for tests).
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Fetch a fresh access token. Tokens are never cached.
    pub async fn fetch_token(&self) -> Result<AccessToken> {
        debug!(app_id = %self.app_id, "fetching access token");

        let response = self
            .http
            .get(format!("{}/token", self.base_url))
            .query(&[
                ("grant_type", "client_credential"),
                ("appid", self.app_id.as_str()),
                ("secret", self.secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Network(format!("token request failed: {}", e)))?;

        let (status, text) = read_body(response).await?;
        let token: TokenResponse = serde_json::from_str(&text).map_err(|e| {
            Error::Decode(format!(
                "invalid token response (HTTP {}): {} ({})",
                status.as_u16(),
                text,
                e
            ))
        })?;

        token.status.into_result()?;
        let access_token = token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                Error::Decode(format!("token response without access_token: {}", text))
            })?;

        Ok(AccessToken {
            access_token,
            expires_in: token.expires_in,
        })
    }

    /// Fetch a token and deliver one message to its endpoint.
    pub async fn send(&self, message: &Message) -> Result<()> {
        let token = self.fetch_token().await?;

        let response = self
            .http
            .post(format!("{}/message/{}/send", self.base_url, message.kind()))
            .query(&[("access_token", token.access_token.as_str())])
            .json(message)
            .send()
            .await
            .map_err(|e| Error::Network(format!("send request failed: {}", e)))?;

        let (status, text) = read_body(response).await?;
        let envelope: ProviderResponse = serde_json::from_str(&text).map_err(|e| {
            Error::Decode(format!(
                "invalid send response (HTTP {}): {} ({})",
                status.as_u16(),
                text,
                e
            ))
        })?;
        envelope.into_result()?;

        info!(openid = %message.recipient(), kind = message.kind(), "message delivered");
        Ok(())
    }
}

async fn read_body(response: reqwest::Response) -> Result<(StatusCode, String)> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;
    Ok((status, text))
}
