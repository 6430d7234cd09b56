//! Search proxy: holds the upstream API key and forwards `POST /search`.
//!
//! Stateless apart from configuration. Every failure is answered with a JSON
//! `{ "error": ... }` body and a status that tells the client which side failed.

use anyhow::{Context, Result};
use axum::{
  Json, Router,
  body::Bytes,
  extract::State,
  http::{HeaderMap, Method, StatusCode, header},
  response::{IntoResponse, Response},
  routing::post,
};
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::constants::constants;
use crate::model::{Region, SearchRequest, SearchResponse, SortOrder};
use crate::upstream::{UpstreamError, YouTubeApi};

#[derive(Debug)]
pub struct ApiError {
  status: StatusCode,
  message: String,
}

impl ApiError {
  fn new(status: StatusCode, message: impl Into<String>) -> Self {
    Self { status, message: message.into() }
  }

  pub fn bad_request(message: impl Into<String>) -> Self {
    Self::new(StatusCode::BAD_REQUEST, message)
  }

  pub fn unauthorized(message: impl Into<String>) -> Self {
    Self::new(StatusCode::UNAUTHORIZED, message)
  }

  pub fn internal(message: impl Into<String>) -> Self {
    Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
  }

  pub fn status(&self) -> StatusCode {
    self.status
  }

  pub fn message(&self) -> &str {
    &self.message
  }
}

impl From<UpstreamError> for ApiError {
  fn from(err: UpstreamError) -> Self {
    match err {
      UpstreamError::Transport(_) => Self::new(StatusCode::BAD_GATEWAY, err.to_string()),
      UpstreamError::Api(_) | UpstreamError::Decode(_) => Self::internal(err.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    if self.status().is_server_error() {
      warn!(status = %self.status(), error = self.message(), "proxy: request failed");
    }
    let body = serde_json::json!({ "error": self.message() });
    (self.status(), Json(body)).into_response()
  }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Clone)]
pub struct AppState {
  config: Arc<ServerConfig>,
  youtube: Arc<YouTubeApi>,
}

impl AppState {
  pub fn new(config: ServerConfig) -> Result<Self> {
    let youtube = YouTubeApi::new(&config.upstream_url, constants().max_results, config.upstream_timeout)?;
    Ok(Self { config: Arc::new(config), youtube: Arc::new(youtube) })
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSearchBody {
  term: Option<String>,
  region_code: Option<String>,
  order: Option<String>,
}

/// Parse and validate the request body.
pub fn validate_request(body: &[u8]) -> ApiResult<SearchRequest> {
  let raw: RawSearchBody = serde_json::from_slice(body).map_err(|_| ApiError::bad_request("Invalid JSON body"))?;
  let present = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

  let (Some(term), Some(region_code), Some(order)) = (present(raw.term), present(raw.region_code), present(raw.order))
  else {
    return Err(ApiError::bad_request("Missing parameters"));
  };
  let region_code: Region = region_code.parse().map_err(|e| ApiError::bad_request(format!("{}", e)))?;
  let order: SortOrder = order.parse().map_err(|e| ApiError::bad_request(format!("{}", e)))?;

  Ok(SearchRequest { term, region_code, order })
}

fn authorize(config: &ServerConfig, headers: &HeaderMap) -> ApiResult<()> {
  let token = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or_else(|| ApiError::unauthorized("Missing bearer credential"))?;

  if !config.access_tokens.is_empty() && !config.access_tokens.iter().any(|t| t == token) {
    return Err(ApiError::unauthorized("Invalid credential"));
  }
  Ok(())
}

pub async fn search_handler(
  State(state): State<AppState>,
  headers: HeaderMap,
  body: Bytes,
) -> ApiResult<Json<SearchResponse>> {
  authorize(&state.config, &headers)?;
  let Some(api_key) = state.config.api_key.as_deref() else {
    warn!("proxy: search refused, API key not configured");
    return Err(ApiError::internal("API Key not configured"));
  };
  let request = validate_request(&body)?;

  info!(term = %request.term, region = %request.region_code, order = %request.order, "proxy: search");
  let videos = state.youtube.search(api_key, &request).await.map_err(|e| {
    warn!(err = %e, "proxy: upstream search failed");
    ApiError::from(e)
  })?;
  info!(count = videos.len(), "proxy: search complete");

  Ok(Json(SearchResponse { videos }))
}

async fn method_not_allowed() -> ApiError {
  ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "Only POST allowed")
}

async fn preflight() -> StatusCode {
  StatusCode::NO_CONTENT
}

pub fn router(state: AppState) -> Router {
  let cors = CorsLayer::new()
    .allow_origin(Any)
    .allow_methods([Method::POST, Method::OPTIONS])
    .allow_headers(Any)
    .max_age(Duration::from_secs(constants().cors_max_age_secs));

  Router::new()
    .route("/search", post(search_handler).options(preflight).fallback(method_not_allowed))
    .layer(cors)
    .with_state(state)
}

pub async fn serve(config: ServerConfig) -> Result<()> {
  info!("Initializing proxy state...");
  let address = config.bind.clone();
  if config.access_tokens.is_empty() {
    info!("No access token allow-list configured; accepting any bearer credential");
  }
  let app = router(AppState::new(config)?);

  info!("Binding to {address}");
  let listener = TcpListener::bind(&address).await.with_context(|| format!("Failed to bind {}", address))?;
  info!("Proxy running on {address}");

  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await.context("Proxy server failed")?;

  info!("Proxy shut down");
  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    match signal::ctrl_c().await {
      Ok(()) => info!("Received Ctrl+C, shutting down"),
      Err(e) => {
        warn!(err = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
        info!("Received terminate signal, shutting down");
      }
      Err(e) => {
        warn!(err = %e, "Failed to install terminate handler");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::HeaderValue;

  fn config(api_key: Option<&str>, tokens: &[&str]) -> ServerConfig {
    ServerConfig {
      bind: "127.0.0.1:0".into(),
      api_key: api_key.map(str::to_string),
      access_tokens: tokens.iter().map(|t| t.to_string()).collect(),
      upstream_url: "https://www.googleapis.com/youtube/v3/search".into(),
      upstream_timeout: Duration::from_secs(5),
    }
  }

  fn bearer(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token)).unwrap());
    headers
  }

  async fn call(config: ServerConfig, headers: HeaderMap, body: &str) -> ApiError {
    let state = AppState::new(config).unwrap();
    search_handler(State(state), headers, Bytes::from(body.to_string())).await.unwrap_err()
  }

  const VALID: &str = r#"{"term":"cats","regionCode":"US","order":"relevance"}"#;

  #[test]
  fn validate_accepts_well_formed_body() {
    let req = validate_request(br#"{"term":" cats ","regionCode":"jp","order":"date"}"#).unwrap();
    assert_eq!(req.term, "cats");
    assert_eq!(req.region_code, Region::Japan);
    assert_eq!(req.order, SortOrder::Date);
  }

  #[test]
  fn validate_rejects_missing_and_invalid() {
    assert_eq!(validate_request(br#"{"term":"cats"}"#).unwrap_err().message(), "Missing parameters");
    assert_eq!(
      validate_request(br#"{"term":"  ","regionCode":"US","order":"date"}"#).unwrap_err().message(),
      "Missing parameters"
    );
    let err = validate_request(br#"{"term":"cats","regionCode":"ZZ","order":"date"}"#).unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert!(err.message().contains("ZZ"));
    let err = validate_request(br#"{"term":"cats","regionCode":"US","order":"rating"}"#).unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(validate_request(b"not json").unwrap_err().message(), "Invalid JSON body");
  }

  #[tokio::test]
  async fn missing_credential_is_unauthorized() {
    let err = call(config(Some("key"), &[]), HeaderMap::new(), VALID).await;
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn unknown_credential_is_unauthorized_with_allow_list() {
    let err = call(config(Some("key"), &["good"]), bearer("bad"), VALID).await;
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(err.message(), "Invalid credential");
  }

  #[tokio::test]
  async fn missing_api_key_is_internal_error() {
    let err = call(config(None, &[]), bearer("tok"), VALID).await;
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.message(), "API Key not configured");
  }

  #[tokio::test]
  async fn bad_body_is_bad_request() {
    let err = call(config(Some("key"), &["tok"]), bearer("tok"), r#"{"regionCode":"US"}"#).await;
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn wrong_method_is_405_json() {
    let response = method_not_allowed().await.into_response();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "Only POST allowed");
  }

  #[tokio::test]
  async fn preflight_answers_no_content() {
    assert_eq!(preflight().await, StatusCode::NO_CONTENT);
  }

  #[test]
  fn upstream_errors_map_to_statuses() {
    assert_eq!(ApiError::from(UpstreamError::Api("quota".into())).status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(ApiError::from(UpstreamError::Decode("eof".into())).status(), StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[tokio::test]
  async fn api_error_serializes_json() {
    let response = ApiError::bad_request("Missing parameters").into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], br#"{"error":"Missing parameters"}"#);
  }
}
