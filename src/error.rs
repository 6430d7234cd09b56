use std::fmt;
use thiserror::Error;

/// A region or sort value outside the supported set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFilterError {
  #[error("Unsupported region code '{0}'")]
  Region(String),

  #[error("Unsupported sort order '{0}'")]
  SortOrder(String),
}

/// Failure of an issued search request. Always terminal for that request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
  /// Proxy unreachable, timed out, or answered with something that is not JSON.
  #[error("{0}")]
  Transport(String),

  /// The proxy (or the platform behind it) reported an error message.
  #[error("{0}")]
  Upstream(String),

  /// 2xx response whose body does not carry a usable `videos` array.
  #[error("{0}")]
  UnexpectedResponse(String),
}

impl SearchError {
  pub fn notice(&self) -> Notice {
    let title = match self {
      SearchError::Transport(_) => "Network Error",
      SearchError::Upstream(_) => "API Error",
      SearchError::UnexpectedResponse(_) => "Unexpected response",
    };
    Notice::error(title, self.to_string())
  }
}

/// A search that was refused before any network call.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
  #[error("Enter a search term.")]
  EmptyTerm,

  #[error("A search is already in progress.")]
  Busy,

  #[error("Search for something before applying filters.")]
  NoQuery,

  #[error("You must be logged in to search videos.")]
  AuthRequired,
}

impl Rejection {
  pub fn notice(self) -> Notice {
    match self {
      Rejection::AuthRequired => Notice::error("Not logged in", self.to_string()),
      _ => Notice::info(self.to_string()),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
  Info,
  Error,
}

/// User-facing notification. Produced by the search layer, rendered by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
  pub title: Option<&'static str>,
  pub message: String,
  pub severity: Severity,
}

impl Notice {
  pub fn error(title: &'static str, message: impl Into<String>) -> Self {
    Self { title: Some(title), message: message.into(), severity: Severity::Error }
  }

  pub fn info(message: impl Into<String>) -> Self {
    Self { title: None, message: message.into(), severity: Severity::Info }
  }
}

impl fmt::Display for Notice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.title {
      Some(title) => write!(f, "{}: {}", title, self.message),
      None => f.write_str(&self.message),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn upstream_notice_carries_message() {
    let notice = SearchError::Upstream("quota exceeded".into()).notice();
    assert_eq!(notice.title, Some("API Error"));
    assert_eq!(notice.severity, Severity::Error);
    assert!(notice.to_string().contains("quota exceeded"));
  }

  #[test]
  fn contract_violation_has_distinct_title() {
    let notice = SearchError::UnexpectedResponse("Server did not return a videos array.".into()).notice();
    assert_eq!(notice.title, Some("Unexpected response"));
  }

  #[test]
  fn rejections_are_lightweight_except_auth() {
    assert_eq!(Rejection::EmptyTerm.notice().severity, Severity::Info);
    assert_eq!(Rejection::Busy.notice().severity, Severity::Info);
    let auth = Rejection::AuthRequired.notice();
    assert_eq!(auth.severity, Severity::Error);
    assert_eq!(auth.to_string(), "Not logged in: You must be logged in to search videos.");
  }
}
