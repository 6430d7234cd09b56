use anyhow::{Context, Result, anyhow};
use image::DynamicImage;
use reqwest::{Client, header::CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;

use crate::error::SearchError;
use crate::model::VideoResult;
use crate::search::SearchTicket;

/// HTTP client for the search proxy.
#[derive(Clone)]
pub struct ProxyClient {
  http: Client,
  endpoint: String,
  /// Public project key some proxy deployments expect in an `apikey` header.
  publishable_key: Option<String>,
  timeout: Duration,
}

impl ProxyClient {
  pub fn new(endpoint: impl Into<String>, publishable_key: Option<String>, timeout: Duration) -> Result<Self> {
    let http = Client::builder().timeout(timeout).build().context("Failed to build HTTP client")?;
    Ok(Self { http, endpoint: endpoint.into(), publishable_key, timeout })
  }

  pub fn http(&self) -> &Client {
    &self.http
  }

  pub fn endpoint(&self) -> &str {
    &self.endpoint
  }

  /// Send the ticket's query to the proxy. One call, no retries.
  pub async fn search(&self, ticket: &SearchTicket) -> Result<Vec<VideoResult>, SearchError> {
    let mut request =
      self.http.post(&self.endpoint).bearer_auth(ticket.credential.as_str()).json(&ticket.query.to_request());
    if let Some(ref key) = self.publishable_key {
      request = request.header("apikey", key);
    }

    let response = request.send().await.map_err(|e| self.transport_error(&e))?;
    let status = response.status().as_u16();
    let content_type = response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(str::to_string);
    let body = response.bytes().await.map_err(|e| self.transport_error(&e))?;

    interpret_response(status, content_type.as_deref(), &body)
  }

  fn transport_error(&self, e: &reqwest::Error) -> SearchError {
    if e.is_timeout() {
      SearchError::Transport(format!("Request timed out after {}s", self.timeout.as_secs()))
    } else {
      SearchError::Transport(e.to_string())
    }
  }
}

/// Map a raw proxy response onto the search outcome.
///
/// - non-2xx: upstream message if the body carries one, otherwise a transport failure
/// - 2xx without a JSON body: transport failure
/// - 2xx with `error`: upstream failure
/// - 2xx without a well-formed `videos` array: unexpected response
pub fn interpret_response(
  status: u16,
  content_type: Option<&str>,
  body: &[u8],
) -> Result<Vec<VideoResult>, SearchError> {
  let is_json = content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"));
  let data: Option<Value> = if is_json { serde_json::from_slice(body).ok() } else { None };
  let error_message = data.as_ref().and_then(|d| d.get("error")).and_then(error_text);

  if !(200..300).contains(&status) {
    return Err(match (error_message, &data) {
      (Some(msg), _) => SearchError::Upstream(msg),
      (None, Some(_)) => SearchError::Upstream(format!("Failed to fetch videos (HTTP {}).", status)),
      (None, None) => SearchError::Transport(format!("Failed to fetch videos or invalid response (HTTP {}).", status)),
    });
  }

  let Some(data) = data else {
    return Err(SearchError::Transport("Proxy returned a non-JSON response.".to_string()));
  };
  if let Some(msg) = error_message {
    return Err(SearchError::Upstream(msg));
  }

  let videos = match data {
    Value::Object(mut map) => map.remove("videos"),
    _ => None,
  };
  let Some(videos @ Value::Array(_)) = videos else {
    return Err(SearchError::UnexpectedResponse("Server did not return a videos array.".to_string()));
  };

  serde_json::from_value(videos).map_err(|e| SearchError::UnexpectedResponse(format!("Malformed video entry: {}", e)))
}

/// `error` may be a plain string or an object with a `message`.
fn error_text(value: &Value) -> Option<String> {
  value
    .as_str()
    .or_else(|| value.get("message").and_then(Value::as_str))
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
}

pub async fn fetch_thumbnail(client: &Client, url: &str) -> Result<DynamicImage> {
  if url.is_empty() {
    return Err(anyhow!("No thumbnail URL"));
  }
  let response = client.get(url).send().await.with_context(|| format!("Failed to request thumbnail {}", url))?;
  if !response.status().is_success() {
    return Err(anyhow!("Thumbnail request failed with HTTP {} ({})", response.status(), url));
  }
  let image_bytes = response.bytes().await.with_context(|| format!("Failed to read image bytes from {}", url))?;
  image::load_from_memory(&image_bytes).with_context(|| format!("Failed to decode image from memory (URL: {})", url))
}
