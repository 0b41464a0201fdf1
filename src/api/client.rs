use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ApiError, ErrorBody};
use crate::session::SessionStore;

use super::api_types::check_envelope;

/// HTTP client for the storefront API.
///
/// Attaches the session's bearer credential to every request when one is
/// present. Non-success statuses become [`ApiError::Http`] with the parsed
/// error body; `ok: false` envelopes become [`ApiError::Rejected`].
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base_url: String,
  session: SessionStore,
}

impl ApiClient {
  pub fn new(base_url: &str, session: SessionStore) -> Result<Self, ApiError> {
    // Validate early so a bad config fails at startup, not on first request
    Url::parse(base_url)?;

    let http = reqwest::Client::builder()
      .user_agent(concat!("oadmin/", env!("CARGO_PKG_VERSION")))
      .build()?;

    Ok(Self {
      http,
      base_url: base_url.trim_end_matches('/').to_string(),
      session,
    })
  }

  /// Build the request URL. `path` is appended to the base URL's path.
  fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ApiError> {
    let mut url = Url::parse(&format!(
      "{}/{}",
      self.base_url,
      path.trim_start_matches('/')
    ))?;

    if !query.is_empty() {
      url
        .query_pairs_mut()
        .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
    }

    Ok(url)
  }

  pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
    self.send(Method::GET, path, query, None::<&()>).await
  }

  pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
    self.send(Method::POST, path, &[], Some(body)).await
  }

  pub async fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
    self.send(Method::PATCH, path, &[], Some(body)).await
  }

  pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
    self.send(Method::DELETE, path, &[], None::<&()>).await
  }

  async fn send<B: Serialize + ?Sized>(
    &self,
    method: Method,
    path: &str,
    query: &[(&str, String)],
    body: Option<&B>,
  ) -> Result<Value, ApiError> {
    let url = self.url(path, query)?;
    debug!(%method, %url, "request");

    let mut request = self
      .http
      .request(method.clone(), url)
      .header(CONTENT_TYPE, "application/json");

    if let Some(token) = self.session.credential() {
      request = request.bearer_auth(token);
    }
    if let Some(body) = body {
      request = request.json(body);
    }

    let response = request.send().await?;
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
      let body = ErrorBody::from_bytes(&bytes);
      warn!(%method, path, %status, error = %body, "request failed");
      return Err(ApiError::Http { status, body });
    }

    if bytes.iter().all(u8::is_ascii_whitespace) {
      return Ok(Value::Null);
    }

    let value: Value = serde_json::from_slice(&bytes)?;
    check_envelope(&value)?;
    Ok(value)
  }
}
