//! Async HTTP client for the Pitchside backend.

use std::time::Duration;

use pitchside_core::{
  attempt::AttemptRecord,
  gateway::{LinkCheck, LinkValidator, SyncRemote},
};
use reqwest::{Client, RequestBuilder, Response};
use tracing::debug;

use crate::{Error, Result};

/// Connection settings for the backend.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
  pub base_url: String,
  /// Sent as a bearer token when present.
  pub api_key:  Option<String>,
  /// Whole-request timeout for every call.
  pub timeout:  Duration,
}

impl RemoteConfig {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self { base_url: base_url.into(), api_key: None, timeout: Duration::from_secs(10) }
  }
}

/// The link-validation gateway and remote sync target.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct RemoteClient {
  client: Client,
  config: RemoteConfig,
}

impl RemoteClient {
  pub fn new(config: RemoteConfig) -> Result<Self> {
    let base = config.base_url.trim();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
      return Err(Error::Url(config.base_url));
    }
    let client = Client::builder().timeout(config.timeout).build()?;
    Ok(Self { client, config })
  }

  pub fn config(&self) -> &RemoteConfig { &self.config }

  pub(crate) fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim().trim_end_matches('/'), path)
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    match &self.config.api_key {
      Some(key) if !key.is_empty() => req.bearer_auth(key),
      _ => req,
    }
  }

  async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(Error::Status(status.as_u16(), body))
  }

  /// `GET /api/links?a=<id>&b=<id>`
  pub async fn get_link(&self, player_a: &str, player_b: &str) -> Result<LinkCheck> {
    let resp = self
      .auth(self.client.get(self.url("/links")))
      .query(&[("a", player_a), ("b", player_b)])
      .send()
      .await?;
    let check: LinkCheck = Self::check(resp).await?.json().await?;
    debug!(player_a, player_b, linked = check.is_linked, "checked link");
    Ok(check)
  }

  /// `POST /api/attempts`
  pub async fn post_attempt(&self, record: &AttemptRecord) -> Result<()> {
    let resp = self
      .auth(self.client.post(self.url("/attempts")))
      .json(record)
      .send()
      .await?;
    Self::check(resp).await?;
    debug!(attempt_id = %record.id, "pushed attempt");
    Ok(())
  }
}

impl LinkValidator for RemoteClient {
  type Error = Error;

  async fn check_linked(&self, player_a: &str, player_b: &str) -> Result<LinkCheck> {
    self.get_link(player_a, player_b).await
  }
}

impl SyncRemote for RemoteClient {
  type Error = Error;

  async fn push_attempt(&self, record: &AttemptRecord) -> Result<()> { self.post_attempt(record).await }
}
