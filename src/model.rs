use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::constants;
use crate::error::ParseFilterError;

/// Regions the search can be scoped to. Serialized as the 2-letter code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Region {
  #[default]
  #[serde(rename = "US")]
  UnitedStates,
  #[serde(rename = "IN")]
  India,
  #[serde(rename = "GB")]
  UnitedKingdom,
  #[serde(rename = "JP")]
  Japan,
  #[serde(rename = "DE")]
  Germany,
  #[serde(rename = "FR")]
  France,
  #[serde(rename = "RU")]
  Russia,
  #[serde(rename = "BR")]
  Brazil,
  #[serde(rename = "KR")]
  SouthKorea,
  #[serde(rename = "CA")]
  Canada,
}

impl Region {
  pub const ALL: [Region; 10] = [
    Region::UnitedStates,
    Region::India,
    Region::UnitedKingdom,
    Region::Japan,
    Region::Germany,
    Region::France,
    Region::Russia,
    Region::Brazil,
    Region::SouthKorea,
    Region::Canada,
  ];

  pub fn code(self) -> &'static str {
    match self {
      Region::UnitedStates => "US",
      Region::India => "IN",
      Region::UnitedKingdom => "GB",
      Region::Japan => "JP",
      Region::Germany => "DE",
      Region::France => "FR",
      Region::Russia => "RU",
      Region::Brazil => "BR",
      Region::SouthKorea => "KR",
      Region::Canada => "CA",
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      Region::UnitedStates => "United States",
      Region::India => "India",
      Region::UnitedKingdom => "United Kingdom",
      Region::Japan => "Japan",
      Region::Germany => "Germany",
      Region::France => "France",
      Region::Russia => "Russia",
      Region::Brazil => "Brazil",
      Region::SouthKorea => "South Korea",
      Region::Canada => "Canada",
    }
  }

  /// Next region in display order, wrapping around. Used by the filter bar.
  pub fn cycle(self, forward: bool) -> Self {
    let idx = Self::ALL.iter().position(|r| *r == self).unwrap_or(0);
    let len = Self::ALL.len();
    let next = if forward { (idx + 1) % len } else { (idx + len - 1) % len };
    Self::ALL[next]
  }
}

impl FromStr for Region {
  type Err = ParseFilterError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let code = s.trim();
    Self::ALL
      .into_iter()
      .find(|r| r.code().eq_ignore_ascii_case(code))
      .ok_or_else(|| ParseFilterError::Region(code.to_string()))
  }
}

impl fmt::Display for Region {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.code())
  }
}

/// Result ordering understood by the upstream search API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
  #[default]
  Relevance,
  Date,
  ViewCount,
}

impl SortOrder {
  pub const ALL: [SortOrder; 3] = [SortOrder::Relevance, SortOrder::Date, SortOrder::ViewCount];

  /// Wire value, as sent to the proxy and the upstream API.
  pub fn as_str(self) -> &'static str {
    match self {
      SortOrder::Relevance => "relevance",
      SortOrder::Date => "date",
      SortOrder::ViewCount => "viewCount",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      SortOrder::Relevance => "Relevance",
      SortOrder::Date => "Upload Date",
      SortOrder::ViewCount => "View Count",
    }
  }

  pub fn cycle(self, forward: bool) -> Self {
    let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
    let len = Self::ALL.len();
    let next = if forward { (idx + 1) % len } else { (idx + len - 1) % len };
    Self::ALL[next]
  }
}

impl FromStr for SortOrder {
  type Err = ParseFilterError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let value = s.trim();
    Self::ALL.into_iter().find(|o| o.as_str() == value).ok_or_else(|| ParseFilterError::SortOrder(value.to_string()))
  }
}

impl fmt::Display for SortOrder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A submitted search. Never mutated after submission; a new search replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
  pub term: String,
  pub region: Region,
  pub sort_order: SortOrder,
}

impl SearchQuery {
  pub fn to_request(&self) -> SearchRequest {
    SearchRequest { term: self.term.clone(), region_code: self.region, order: self.sort_order }
  }
}

/// JSON body of `POST /search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
  pub term: String,
  pub region_code: Region,
  pub order: SortOrder,
}

/// One video in a proxy response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResult {
  pub video_id: String,
  pub title: String,
  pub channel: String,
  pub channel_id: String,
  /// Older proxy deployments emit this as `thumbnail`.
  #[serde(alias = "thumbnail", default)]
  pub thumbnail_url: String,
  pub published_at: DateTime<Utc>,
}

impl VideoResult {
  /// Canonical watch page for this video.
  pub fn watch_url(&self) -> String {
    watch_url(&self.video_id)
  }
}

pub fn watch_url(video_id: &str) -> String {
  format!("{}{}", constants().watch_url_base, video_id)
}

/// JSON body of a successful proxy response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
  pub videos: Vec<VideoResult>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn region_parses_codes_case_insensitively() {
    assert_eq!("JP".parse::<Region>().unwrap(), Region::Japan);
    assert_eq!("kr".parse::<Region>().unwrap(), Region::SouthKorea);
    assert_eq!(" gb ".parse::<Region>().unwrap(), Region::UnitedKingdom);
  }

  #[test]
  fn region_rejects_unknown_code() {
    assert!("XX".parse::<Region>().is_err());
    assert!("".parse::<Region>().is_err());
  }

  #[test]
  fn region_cycle_wraps() {
    assert_eq!(Region::UnitedStates.cycle(false), Region::Canada);
    assert_eq!(Region::Canada.cycle(true), Region::UnitedStates);
    assert_eq!(Region::UnitedStates.cycle(true), Region::India);
  }

  #[test]
  fn sort_order_parses_wire_values() {
    assert_eq!("viewCount".parse::<SortOrder>().unwrap(), SortOrder::ViewCount);
    assert_eq!("date".parse::<SortOrder>().unwrap(), SortOrder::Date);
    assert!("views".parse::<SortOrder>().is_err());
  }

  #[test]
  fn request_serializes_camel_case() {
    let query = SearchQuery { term: "cats".into(), region: Region::Japan, sort_order: SortOrder::ViewCount };
    let json = serde_json::to_value(query.to_request()).unwrap();
    assert_eq!(json, serde_json::json!({ "term": "cats", "regionCode": "JP", "order": "viewCount" }));
  }

  #[test]
  fn video_accepts_legacy_thumbnail_key() {
    let video: VideoResult = serde_json::from_value(serde_json::json!({
      "videoId": "abc",
      "title": "t",
      "channel": "c",
      "channelId": "cid",
      "thumbnail": "https://i.ytimg.com/vi/abc/mqdefault.jpg",
      "publishedAt": "2024-05-01T12:00:00Z",
    }))
    .unwrap();
    assert_eq!(video.thumbnail_url, "https://i.ytimg.com/vi/abc/mqdefault.jpg");
    assert_eq!(video.watch_url(), "https://www.youtube.com/watch?v=abc");
  }
}
