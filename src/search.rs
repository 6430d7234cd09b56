//! Search orchestration: the single authority for when a search request is
//! issued and how its outcome maps to renderable state.
//!
//! The orchestrator never performs I/O. Issuing a search hands back a
//! [`SearchTicket`] that the caller turns into exactly one proxy call; the
//! outcome is fed back through [`Orchestrator::complete`] together with the
//! ticket's sequence number. Region and sort changes are staged and only reach
//! the network through [`Orchestrator::apply_filters`].

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::constants::constants;
use crate::error::{Rejection, SearchError};
use crate::model::{Region, SearchQuery, SortOrder, VideoResult};
use crate::session::{Credential, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
  #[default]
  Idle,
  Loading,
  Ready,
  Error,
}

/// Everything the presentation layer needs to render the current search.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
  pub current_query: Option<SearchQuery>,
  /// Non-empty only while `status` is `Ready`.
  pub results: Vec<VideoResult>,
  pub status: Status,
  /// Region or sort changed since the last issued request.
  pub pending_filter_change: bool,
  pub last_error: Option<String>,
}

/// Which of the mutually exclusive result views to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultView<'a> {
  Loading { placeholders: usize },
  NoQuery,
  NoResults,
  Grid(&'a [VideoResult]),
}

/// A request the caller must send to the proxy, exactly once.
#[derive(Debug, Clone)]
pub struct SearchTicket {
  pub seq: u64,
  pub query: SearchQuery,
  pub credential: Credential,
}

/// What happened when a response was fed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
  /// Results applied; carries the result count.
  Ready(usize),
  Failed(SearchError),
  /// Response belongs to a superseded or unknown request and was dropped.
  Stale,
}

#[derive(Debug)]
pub struct Orchestrator {
  state: SearchState,
  region: Region,
  sort_order: SortOrder,
  latest_seq: u64,
  in_flight: Option<u64>,
}

impl Default for Orchestrator {
  fn default() -> Self {
    Self::new(Region::default(), SortOrder::default())
  }
}

impl Orchestrator {
  pub fn new(region: Region, sort_order: SortOrder) -> Self {
    Self { state: SearchState::default(), region, sort_order, latest_seq: 0, in_flight: None }
  }

  pub fn state(&self) -> &SearchState {
    &self.state
  }

  pub fn region(&self) -> Region {
    self.region
  }

  pub fn sort_order(&self) -> SortOrder {
    self.sort_order
  }

  pub fn is_loading(&self) -> bool {
    self.state.status == Status::Loading
  }

  /// Sequence number of the most recently issued request (0 before the first).
  pub fn latest_seq(&self) -> u64 {
    self.latest_seq
  }

  pub fn view(&self) -> ResultView<'_> {
    match self.state.status {
      Status::Loading => ResultView::Loading { placeholders: constants().skeleton_placeholders },
      Status::Ready if !self.state.results.is_empty() => ResultView::Grid(&self.state.results),
      // Idle with a query means the last attempt was refused before it was sent.
      Status::Ready | Status::Error if self.state.current_query.is_some() => ResultView::NoResults,
      _ => ResultView::NoQuery,
    }
  }

  /// Start a new search for `term` with the current region and sort order.
  pub fn submit_search(&mut self, term: &str, session: &Session) -> Result<SearchTicket, Rejection> {
    let term = term.trim();
    if term.is_empty() {
      return Err(Rejection::EmptyTerm);
    }
    if self.is_loading() {
      debug!(term, "search: rejected, request already in flight");
      return Err(Rejection::Busy);
    }
    let credential = self.require_credential(session)?;
    let query = SearchQuery { term: term.to_string(), region: self.region, sort_order: self.sort_order };
    Ok(self.issue(query, credential))
  }

  /// Re-run the current query's term with the staged region and sort.
  pub fn apply_filters(&mut self, session: &Session) -> Result<SearchTicket, Rejection> {
    if self.is_loading() {
      return Err(Rejection::Busy);
    }
    let Some(term) = self.state.current_query.as_ref().map(|q| q.term.clone()) else {
      return Err(Rejection::NoQuery);
    };
    let credential = self.require_credential(session)?;
    let query = SearchQuery { term, region: self.region, sort_order: self.sort_order };
    Ok(self.issue(query, credential))
  }

  pub fn change_region(&mut self, region: Region) {
    self.region = region;
    self.stage_filter_change();
  }

  pub fn change_sort_order(&mut self, sort_order: SortOrder) {
    self.sort_order = sort_order;
    self.stage_filter_change();
  }

  fn stage_filter_change(&mut self) {
    if self.state.current_query.is_some() {
      self.state.pending_filter_change = true;
    }
  }

  /// Gate in front of every network call. A refused call leaves the view idle,
  /// not in error: a missing session is an expected precondition.
  pub fn require_credential(&mut self, session: &Session) -> Result<Credential, Rejection> {
    match session.valid_credential(Utc::now()) {
      Some(credential) => Ok(credential.clone()),
      None => {
        info!("search: refused, no valid credential");
        self.state.status = Status::Idle;
        self.state.results.clear();
        Err(Rejection::AuthRequired)
      }
    }
  }

  fn issue(&mut self, query: SearchQuery, credential: Credential) -> SearchTicket {
    self.latest_seq += 1;
    let seq = self.latest_seq;
    info!(seq, term = %query.term, region = %query.region, order = %query.sort_order, "search: issued");
    self.state.current_query = Some(query.clone());
    self.state.status = Status::Loading;
    self.state.results.clear();
    self.state.pending_filter_change = false;
    self.state.last_error = None;
    self.in_flight = Some(seq);
    SearchTicket { seq, query, credential }
  }

  /// Apply the outcome of request `seq`. Only the outstanding request may
  /// change state; anything else is discarded.
  pub fn complete(&mut self, seq: u64, result: Result<Vec<VideoResult>, SearchError>) -> Completion {
    if self.in_flight != Some(seq) {
      debug!(seq, latest = self.latest_seq, "search: discarding stale completion");
      return Completion::Stale;
    }
    self.in_flight = None;

    match result {
      Ok(videos) => {
        let count = videos.len();
        info!(seq, count, "search: results ready");
        self.state.results = videos;
        self.state.status = Status::Ready;
        self.state.last_error = None;
        Completion::Ready(count)
      }
      Err(e) => {
        warn!(seq, err = %e, "search: failed");
        self.state.results.clear();
        self.state.status = Status::Error;
        self.state.last_error = Some(e.to_string());
        Completion::Failed(e)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Duration, TimeZone};

  fn session() -> Session {
    Session::with_token("token-123")
  }

  fn video(id: &str) -> VideoResult {
    VideoResult {
      video_id: id.to_string(),
      title: format!("Video {}", id),
      channel: "Channel".to_string(),
      channel_id: "UC123".to_string(),
      thumbnail_url: format!("https://i.ytimg.com/vi/{}/mqdefault.jpg", id),
      published_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
    }
  }

  fn videos(n: usize) -> Vec<VideoResult> {
    (0..n).map(|i| video(&format!("v{}", i))).collect()
  }

  // --- submit_search ---

  #[test]
  fn submit_issues_one_ticket_and_enters_loading() {
    let mut orch = Orchestrator::default();
    let ticket = orch.submit_search("  cats  ", &session()).unwrap();
    assert_eq!(ticket.seq, 1);
    assert_eq!(ticket.query.term, "cats");
    assert_eq!(ticket.query.region, Region::UnitedStates);
    assert_eq!(ticket.query.sort_order, SortOrder::Relevance);
    assert_eq!(ticket.credential.as_str(), "token-123");
    assert_eq!(orch.state().status, Status::Loading);
    assert_eq!(orch.state().current_query.as_ref(), Some(&ticket.query));
  }

  #[test]
  fn empty_term_changes_nothing() {
    let mut orch = Orchestrator::default();
    assert_eq!(orch.submit_search("   ", &session()).unwrap_err(), Rejection::EmptyTerm);
    assert_eq!(orch.submit_search("", &session()).unwrap_err(), Rejection::EmptyTerm);
    assert_eq!(orch.state().status, Status::Idle);
    assert!(orch.state().current_query.is_none());
    assert_eq!(orch.latest_seq(), 0);
  }

  #[test]
  fn submit_while_loading_is_rejected_without_state_change() {
    let mut orch = Orchestrator::default();
    let first = orch.submit_search("cats", &session()).unwrap();
    assert_eq!(orch.submit_search("dogs", &session()).unwrap_err(), Rejection::Busy);
    assert_eq!(orch.apply_filters(&session()).unwrap_err(), Rejection::Busy);
    assert_eq!(orch.latest_seq(), first.seq);
    assert_eq!(orch.state().current_query.as_ref().unwrap().term, "cats");
    assert_eq!(orch.state().status, Status::Loading);
  }

  #[test]
  fn success_preserves_result_order() {
    let mut orch = Orchestrator::default();
    let ticket = orch.submit_search("cats", &session()).unwrap();
    let payload = vec![video("c"), video("a"), video("b")];
    assert_eq!(orch.complete(ticket.seq, Ok(payload.clone())), Completion::Ready(3));
    assert_eq!(orch.state().status, Status::Ready);
    assert_eq!(orch.state().results, payload);
    assert!(orch.state().last_error.is_none());
  }

  #[test]
  fn failure_clears_results_and_records_error() {
    let mut orch = Orchestrator::default();
    let t1 = orch.submit_search("cats", &session()).unwrap();
    orch.complete(t1.seq, Ok(videos(2)));
    let t2 = orch.submit_search("dogs", &session()).unwrap();
    let err = SearchError::Upstream("quota exceeded".into());
    assert_eq!(orch.complete(t2.seq, Err(err.clone())), Completion::Failed(err));
    assert_eq!(orch.state().status, Status::Error);
    assert!(orch.state().results.is_empty());
    assert!(orch.state().last_error.as_deref().unwrap().contains("quota exceeded"));
  }

  #[test]
  fn missing_videos_array_ends_in_error() {
    let mut orch = Orchestrator::default();
    let ticket = orch.submit_search("cats", &session()).unwrap();
    let err = SearchError::UnexpectedResponse("Server did not return a videos array.".into());
    orch.complete(ticket.seq, Err(err));
    assert_eq!(orch.state().status, Status::Error);
    assert!(orch.state().results.is_empty());
  }

  #[test]
  fn ready_and_error_are_reentrant() {
    let mut orch = Orchestrator::default();
    let t1 = orch.submit_search("cats", &session()).unwrap();
    orch.complete(t1.seq, Err(SearchError::Transport("offline".into())));
    let t2 = orch.submit_search("cats", &session()).unwrap();
    assert_eq!(orch.state().status, Status::Loading);
    orch.complete(t2.seq, Ok(videos(1)));
    let t3 = orch.submit_search("dogs", &session()).unwrap();
    assert_eq!(t3.seq, 3);
    assert_eq!(orch.state().status, Status::Loading);
  }

  #[test]
  fn new_search_from_ready_drops_previous_results() {
    let mut orch = Orchestrator::default();
    let t1 = orch.submit_search("cats", &session()).unwrap();
    orch.complete(t1.seq, Ok(videos(2)));
    orch.submit_search("dogs", &session()).unwrap();
    assert_eq!(orch.state().status, Status::Loading);
    assert!(orch.state().results.is_empty());
  }

  // --- credentials ---

  #[test]
  fn unauthenticated_submit_returns_to_idle() {
    let mut orch = Orchestrator::default();
    let t1 = orch.submit_search("cats", &session()).unwrap();
    orch.complete(t1.seq, Ok(videos(3)));
    let err = orch.submit_search("dogs", &Session::signed_out()).unwrap_err();
    assert_eq!(err, Rejection::AuthRequired);
    assert_eq!(orch.state().status, Status::Idle);
    assert!(orch.state().results.is_empty());
    assert_eq!(orch.latest_seq(), 1);
    assert_eq!(orch.state().current_query.as_ref().unwrap().term, "cats");
    assert_eq!(orch.view(), ResultView::NoQuery);
  }

  #[test]
  fn expired_credential_is_refused() {
    let mut orch = Orchestrator::default();
    let mut expired = session();
    expired.expires_at = Some(Utc::now() - Duration::minutes(1));
    assert_eq!(orch.submit_search("cats", &expired).unwrap_err(), Rejection::AuthRequired);
    assert_eq!(orch.state().status, Status::Idle);
  }

  #[test]
  fn sign_out_mid_flight_lets_request_finish_but_blocks_next() {
    let mut orch = Orchestrator::default();
    let ticket = orch.submit_search("cats", &session()).unwrap();
    assert_eq!(orch.complete(ticket.seq, Ok(videos(2))), Completion::Ready(2));
    assert_eq!(orch.apply_filters(&Session::signed_out()).unwrap_err(), Rejection::AuthRequired);
  }

  // --- staged filters ---

  #[test]
  fn filter_change_before_any_search_is_not_pending() {
    let mut orch = Orchestrator::default();
    orch.change_region(Region::Japan);
    orch.change_sort_order(SortOrder::Date);
    assert!(!orch.state().pending_filter_change);
    assert_eq!(orch.state().status, Status::Idle);
    let ticket = orch.submit_search("cats", &session()).unwrap();
    assert_eq!(ticket.query.region, Region::Japan);
    assert_eq!(ticket.query.sort_order, SortOrder::Date);
  }

  #[test]
  fn filter_change_keeps_status_and_results() {
    let mut orch = Orchestrator::default();
    let t = orch.submit_search("cats", &session()).unwrap();
    orch.complete(t.seq, Ok(videos(4)));
    orch.change_sort_order(SortOrder::ViewCount);
    assert!(orch.state().pending_filter_change);
    assert_eq!(orch.state().status, Status::Ready);
    assert_eq!(orch.state().results.len(), 4);
    assert_eq!(orch.latest_seq(), 1);
  }

  #[test]
  fn apply_without_prior_search_is_rejected() {
    let mut orch = Orchestrator::default();
    orch.change_region(Region::Germany);
    assert_eq!(orch.apply_filters(&session()).unwrap_err(), Rejection::NoQuery);
    assert_eq!(orch.latest_seq(), 0);
  }

  #[test]
  fn cats_then_japan_scenario() {
    let mut orch = Orchestrator::default();
    let t1 = orch.submit_search("cats", &session()).unwrap();
    assert_eq!(t1.query.region, Region::UnitedStates);
    assert_eq!(orch.complete(t1.seq, Ok(videos(5))), Completion::Ready(5));
    assert_eq!(orch.view(), ResultView::Grid(&orch.state().results));
    let first_results = orch.state().results.clone();

    orch.change_region("JP".parse().unwrap());
    assert!(orch.state().pending_filter_change);
    assert_eq!(orch.state().results, first_results);

    let t2 = orch.apply_filters(&session()).unwrap();
    assert_eq!(t2.query.term, "cats");
    assert_eq!(t2.query.region, Region::Japan);
    assert!(!orch.state().pending_filter_change);
    assert_eq!(orch.state().status, Status::Loading);
    assert!(orch.state().results.is_empty());

    let replacement = vec![video("jp1"), video("jp2")];
    orch.complete(t2.seq, Ok(replacement.clone()));
    assert_eq!(orch.state().results, replacement);
    assert!(!orch.state().pending_filter_change);
    assert_eq!(orch.state().current_query.as_ref().unwrap().region, Region::Japan);
  }

  // --- stale responses ---

  #[test]
  fn superseded_response_is_discarded() {
    let mut orch = Orchestrator::default();
    let t1 = orch.submit_search("cats", &session()).unwrap();
    orch.complete(t1.seq, Err(SearchError::Transport("request timed out".into())));
    let t2 = orch.submit_search("dogs", &session()).unwrap();

    assert_eq!(orch.complete(t1.seq, Ok(videos(9))), Completion::Stale);
    assert_eq!(orch.state().status, Status::Loading);
    assert!(orch.state().results.is_empty());

    orch.complete(t2.seq, Ok(videos(1)));
    assert_eq!(orch.state().results.len(), 1);
  }

  #[test]
  fn duplicate_completion_is_discarded() {
    let mut orch = Orchestrator::default();
    let t = orch.submit_search("cats", &session()).unwrap();
    orch.complete(t.seq, Ok(videos(2)));
    assert_eq!(orch.complete(t.seq, Err(SearchError::Transport("late".into()))), Completion::Stale);
    assert_eq!(orch.state().status, Status::Ready);
    assert_eq!(orch.state().results.len(), 2);
  }

  #[test]
  fn current_query_is_not_altered_by_response() {
    let mut orch = Orchestrator::default();
    let t = orch.submit_search("cats", &session()).unwrap();
    orch.change_region(Region::Brazil);
    orch.complete(t.seq, Ok(videos(1)));
    assert_eq!(orch.state().current_query.as_ref().unwrap().region, Region::UnitedStates);
    assert!(orch.state().pending_filter_change);
  }

  // --- view ---

  #[test]
  fn view_covers_all_four_states() {
    let mut orch = Orchestrator::default();
    assert_eq!(orch.view(), ResultView::NoQuery);
    let t = orch.submit_search("cats", &session()).unwrap();
    assert_eq!(orch.view(), ResultView::Loading { placeholders: 6 });
    orch.complete(t.seq, Ok(Vec::new()));
    assert_eq!(orch.state().status, Status::Ready);
    assert_eq!(orch.view(), ResultView::NoResults);
    let t = orch.submit_search("cats", &session()).unwrap();
    orch.complete(t.seq, Ok(videos(2)));
    assert!(matches!(orch.view(), ResultView::Grid(items) if items.len() == 2));
  }
}
