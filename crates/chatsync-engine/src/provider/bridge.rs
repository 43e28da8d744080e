//! Provider backed by an external bridge daemon that owns the actual chat
//! network session. Commands go out as JSON over HTTP; the daemon posts
//! events back to the server's `/events` endpoint.

use std::{future::Future, time::Duration};

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{ChatProvider, ProviderError, Registration, SendReceipt};

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
  pub base_url:     String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 { 30 }

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct BridgeProvider {
  client:   Client,
  base_url: String,
}

#[derive(Serialize)]
struct SendBody<'a> {
  to:                &'a str,
  text:              &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  quoted_message_id: Option<&'a str>,
}

#[derive(Serialize)]
struct CheckBody<'a> {
  phones: &'a [String],
}

#[derive(Deserialize)]
struct CheckReply {
  results: Vec<Registration>,
}

impl BridgeProvider {
  pub fn new(config: &BridgeConfig) -> Result<Self, ProviderError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, base_url: config.base_url.trim_end_matches('/').to_owned() })
  }

  fn url(&self, path: &str) -> String { format!("{}{}", self.base_url, path) }

  /// POST `body` to `path` and hand back the response if it succeeded.
  async fn post<B: Serialize + ?Sized>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<reqwest::Response, ProviderError> {
    let resp = self.client.post(self.url(path)).json(body).send().await?;
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let detail = resp.text().await.unwrap_or_default();
    let detail = if detail.is_empty() { status.to_string() } else { detail };
    match status {
      StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => {
        Err(ProviderError::InvalidRecipient(detail))
      }
      _ => Err(ProviderError::Rejected(format!("POST {path} → {detail}"))),
    }
  }
}

impl ChatProvider for BridgeProvider {
  fn connect(&self) -> impl Future<Output = Result<(), ProviderError>> + Send + '_ {
    async move {
      self.post("/connect", &serde_json::json!({})).await?;
      Ok(())
    }
  }

  fn send_text<'a>(
    &'a self,
    to: &'a str,
    text: &'a str,
    quoted_message_id: Option<&'a str>,
  ) -> impl Future<Output = Result<SendReceipt, ProviderError>> + Send + 'a {
    async move {
      let body = SendBody { to, text, quoted_message_id };
      Ok(self.post("/send", &body).await?.json().await?)
    }
  }

  fn request_history_sync(
    &self,
  ) -> impl Future<Output = Result<(), ProviderError>> + Send + '_ {
    async move {
      self.post("/history-sync", &serde_json::json!({})).await?;
      Ok(())
    }
  }

  fn check_registered<'a>(
    &'a self,
    phones: &'a [String],
  ) -> impl Future<Output = Result<Vec<Registration>, ProviderError>> + Send + 'a {
    async move {
      let reply: CheckReply = self.post("/check", &CheckBody { phones }).await?.json().await?;
      Ok(reply.results)
    }
  }
}
