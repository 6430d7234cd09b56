//! YouTube Data API v3 search, as called by the proxy.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::model::{SearchRequest, VideoResult};

#[derive(Error, Debug)]
pub enum UpstreamError {
  /// The platform could not be reached or the body could not be read.
  #[error("Upstream request failed: {0}")]
  Transport(#[from] reqwest::Error),

  /// The platform answered with an error payload.
  #[error("{0}")]
  Api(String),

  #[error("Unexpected upstream response: {0}")]
  Decode(String),
}

#[derive(Debug, Deserialize)]
struct ApiSearchResponse {
  #[serde(default)]
  items: Vec<ApiItem>,
  error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
  #[serde(default)]
  message: String,
}

#[derive(Debug, Deserialize)]
struct ApiItem {
  id: ApiItemId,
  snippet: ApiSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiItemId {
  video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSnippet {
  #[serde(default)]
  title: String,
  #[serde(default)]
  channel_title: String,
  #[serde(default)]
  channel_id: String,
  published_at: DateTime<Utc>,
  #[serde(default)]
  thumbnails: ApiThumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct ApiThumbnails {
  medium: Option<ApiThumbnail>,
  high: Option<ApiThumbnail>,
  default: Option<ApiThumbnail>,
}

#[derive(Debug, Deserialize)]
struct ApiThumbnail {
  url: String,
}

impl ApiThumbnails {
  /// Medium is the grid size; fall back to whatever else is present.
  fn best_url(self) -> String {
    self.medium.or(self.high).or(self.default).map(|t| t.url).unwrap_or_default()
  }
}

pub struct YouTubeApi {
  http: Client,
  search_url: Url,
  max_results: u32,
}

impl YouTubeApi {
  pub fn new(search_url: &str, max_results: u32, timeout: Duration) -> Result<Self> {
    let search_url = Url::parse(search_url).with_context(|| format!("Invalid upstream search URL '{}'", search_url))?;
    let http = Client::builder().timeout(timeout).build().context("Failed to build upstream HTTP client")?;
    Ok(Self { http, search_url, max_results })
  }

  /// Full request URL for one search, including the API key.
  pub fn request_url(&self, api_key: &str, request: &SearchRequest) -> Url {
    let mut url = self.search_url.clone();
    url
      .query_pairs_mut()
      .append_pair("part", "snippet")
      .append_pair("type", "video")
      .append_pair("maxResults", &self.max_results.to_string())
      .append_pair("q", &request.term)
      .append_pair("order", request.order.as_str())
      .append_pair("regionCode", request.region_code.code())
      .append_pair("key", api_key);
    url
  }

  pub async fn search(&self, api_key: &str, request: &SearchRequest) -> Result<Vec<VideoResult>, UpstreamError> {
    let response = self.http.get(self.request_url(api_key, request)).send().await?;
    let body = response.bytes().await?;
    map_search_payload(&body)
  }
}

/// Reshape an upstream search payload into proxy results. Items that are not
/// videos (no `id.videoId`) are skipped.
pub fn map_search_payload(body: &[u8]) -> Result<Vec<VideoResult>, UpstreamError> {
  let parsed: ApiSearchResponse = serde_json::from_slice(body).map_err(|e| UpstreamError::Decode(e.to_string()))?;
  if let Some(err) = parsed.error {
    let message = if err.message.is_empty() { "Upstream API error".to_string() } else { err.message };
    return Err(UpstreamError::Api(message));
  }

  Ok(
    parsed
      .items
      .into_iter()
      .filter_map(|item| {
        let video_id = item.id.video_id.filter(|id| !id.is_empty())?;
        Some(VideoResult {
          video_id,
          title: item.snippet.title,
          channel: item.snippet.channel_title,
          channel_id: item.snippet.channel_id,
          thumbnail_url: item.snippet.thumbnails.best_url(),
          published_at: item.snippet.published_at,
        })
      })
      .collect(),
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{Region, SortOrder};

  fn item(id: Option<&str>) -> serde_json::Value {
    serde_json::json!({
      "kind": "youtube#searchResult",
      "id": { "kind": "youtube#video", "videoId": id },
      "snippet": {
        "publishedAt": "2024-02-10T16:00:05Z",
        "channelId": "UCchan",
        "title": "Cat compilation",
        "channelTitle": "Cats Daily",
        "thumbnails": {
          "default": { "url": "https://i.ytimg.com/vi/x/default.jpg" },
          "medium": { "url": "https://i.ytimg.com/vi/x/mqdefault.jpg" }
        }
      }
    })
  }

  #[test]
  fn maps_items_to_results() {
    let body = serde_json::to_vec(&serde_json::json!({ "items": [item(Some("abc")), item(Some("def"))] })).unwrap();
    let videos = map_search_payload(&body).unwrap();
    assert_eq!(videos.len(), 2);
    assert_eq!(videos[0].video_id, "abc");
    assert_eq!(videos[0].channel, "Cats Daily");
    assert_eq!(videos[0].channel_id, "UCchan");
    assert_eq!(videos[0].thumbnail_url, "https://i.ytimg.com/vi/x/mqdefault.jpg");
    assert_eq!(videos[1].video_id, "def");
  }

  #[test]
  fn skips_items_without_video_id() {
    let body = serde_json::to_vec(&serde_json::json!({ "items": [item(None), item(Some("abc"))] })).unwrap();
    let videos = map_search_payload(&body).unwrap();
    assert_eq!(videos.len(), 1);
  }

  #[test]
  fn error_payload_becomes_api_error() {
    let body = serde_json::to_vec(&serde_json::json!({
      "error": { "code": 403, "message": "The request cannot be completed because you have exceeded your quota." }
    }))
    .unwrap();
    match map_search_payload(&body) {
      Err(UpstreamError::Api(msg)) => assert!(msg.contains("exceeded your quota")),
      other => panic!("expected api error, got {:?}", other),
    }
  }

  #[test]
  fn non_json_is_decode_error() {
    assert!(matches!(map_search_payload(b"<html/>"), Err(UpstreamError::Decode(_))));
  }

  #[test]
  fn request_url_carries_all_parameters() {
    let api = YouTubeApi::new("https://www.googleapis.com/youtube/v3/search", 25, Duration::from_secs(5)).unwrap();
    let request = SearchRequest { term: "cats & dogs".into(), region_code: Region::Japan, order: SortOrder::ViewCount };
    let url = api.request_url("KEY", &request);
    let pairs: Vec<(String, String)> = url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
    let get = |k: &str| pairs.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
    assert_eq!(get("q"), Some("cats & dogs"));
    assert_eq!(get("regionCode"), Some("JP"));
    assert_eq!(get("order"), Some("viewCount"));
    assert_eq!(get("maxResults"), Some("25"));
    assert_eq!(get("type"), Some("video"));
    assert_eq!(get("key"), Some("KEY"));
  }
}
