use anyhow::Result;
use image::DynamicImage;
use ratatui::widgets::ListState;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::client::{ProxyClient, fetch_thumbnail};
use crate::config::Config;
use crate::display::DisplayMode;
use crate::error::{Notice, Rejection, SearchError, Severity};
use crate::model::VideoResult;
use crate::search::{Completion, Orchestrator, SearchTicket};
use crate::session::{Session, SessionProvider, WatchSession};
use crate::theme::{THEMES, Theme, theme_index};

// --- Types ---

/// A finished proxy call, tagged with the ticket's sequence number.
pub type SearchOutcome = (u64, Result<Vec<VideoResult>, SearchError>);
pub type ThumbnailResult = (String, Result<DynamicImage>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  Input,
  Results,
  Filter,
  SignIn,
}

/// Which control of the filter bar has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
  Sort,
  Region,
}

/// Thumbnail of the selected result, plus the last resize for the preview area.
#[derive(Default)]
pub struct GraphicsCache {
  pub thumbnail: Option<(String, DynamicImage)>,
  pub resized: Option<(String, u16, u16, DynamicImage)>,
}

pub(crate) struct AsyncTasks {
  pub(crate) search_tx: mpsc::UnboundedSender<SearchOutcome>,
  pub(crate) search_rx: mpsc::UnboundedReceiver<SearchOutcome>,
  pub(crate) thumb_rx: Option<oneshot::Receiver<ThumbnailResult>>,
  /// Video id the pending thumbnail fetch belongs to.
  pub(crate) thumb_for: Option<String>,
}

impl AsyncTasks {
  fn new() -> Self {
    let (search_tx, search_rx) = mpsc::unbounded_channel();
    Self { search_tx, search_rx, thumb_rx: None, thumb_for: None }
  }
}

pub struct App {
  pub input: String,
  pub cursor_position: usize,
  pub input_scroll: usize,
  pub token_input: String,
  pub token_cursor: usize,
  pub mode: AppMode,
  pub filter_field: FilterField,
  pub theme_index: usize,
  pub display_mode: DisplayMode,
  pub search: Orchestrator,
  pub list_state: ListState,
  pub notice: Option<Notice>,
  pub should_quit: bool,
  pub gfx: GraphicsCache,
  pub(crate) tasks: AsyncTasks,
  session: Arc<WatchSession>,
  session_rx: watch::Receiver<Session>,
  client: ProxyClient,
  config: Config,
  /// Write preference changes back to disk.
  persist: bool,
  notice_time: Option<Instant>,
}

impl App {
  pub fn new(config: Config, session: Arc<WatchSession>, client: ProxyClient, display_mode: DisplayMode) -> Self {
    let search = Orchestrator::new(config.region.unwrap_or_default(), config.sort_order.unwrap_or_default());
    let mut session_rx = session.on_session_change();
    let authenticated = session_rx.borrow_and_update().is_authenticated();

    Self {
      input: String::new(),
      cursor_position: 0,
      input_scroll: 0,
      token_input: String::new(),
      token_cursor: 0,
      mode: if authenticated { AppMode::Input } else { AppMode::SignIn },
      filter_field: FilterField::Sort,
      theme_index: theme_index(config.theme_name.as_deref()),
      display_mode,
      search,
      list_state: ListState::default(),
      notice: None,
      should_quit: false,
      gfx: GraphicsCache::default(),
      tasks: AsyncTasks::new(),
      session,
      session_rx,
      client,
      config,
      persist: false,
      notice_time: None,
    }
  }

  /// Persist theme and filter changes to `prefs.toml`.
  pub fn with_persistence(mut self) -> Self {
    self.persist = true;
    self
  }

  pub fn theme(&self) -> &'static Theme {
    &THEMES[self.theme_index % THEMES.len()]
  }

  pub fn session(&self) -> Session {
    self.session.session()
  }

  pub fn proxy_endpoint(&self) -> &str {
    self.client.endpoint()
  }

  // --- Notices ---

  pub fn set_notice(&mut self, notice: Notice) {
    self.notice = Some(notice);
    self.notice_time = Some(Instant::now());
  }

  pub fn clear_notice(&mut self) {
    self.notice = None;
    self.notice_time = None;
  }

  /// Info notices fade after 5 seconds, errors after 10.
  pub fn expire_notice(&mut self) {
    if let (Some(notice), Some(t)) = (&self.notice, self.notice_time) {
      let ttl = match notice.severity {
        Severity::Info => Duration::from_secs(5),
        Severity::Error => Duration::from_secs(10),
      };
      if t.elapsed() >= ttl {
        self.clear_notice();
      }
    }
  }

  fn save_config(&mut self) {
    self.config.theme_name = Some(self.theme().name.to_string());
    self.config.region = Some(self.search.region());
    self.config.sort_order = Some(self.search.sort_order());
    if self.persist {
      self.config.save();
    }
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    self.save_config();
  }

  // --- Searching ---

  pub fn trigger_search(&mut self) {
    let term = self.input.trim().to_string();
    let session = self.session();
    match self.search.submit_search(&term, &session) {
      Ok(ticket) => self.dispatch(ticket),
      Err(rejection) => self.reject(rejection),
    }
  }

  pub fn apply_filters(&mut self) {
    let session = self.session();
    match self.search.apply_filters(&session) {
      Ok(ticket) => self.dispatch(ticket),
      Err(rejection) => self.reject(rejection),
    }
  }

  pub fn cycle_filter(&mut self, forward: bool) {
    match self.filter_field {
      FilterField::Sort => {
        let next = self.search.sort_order().cycle(forward);
        self.search.change_sort_order(next);
      }
      FilterField::Region => {
        let next = self.search.region().cycle(forward);
        self.search.change_region(next);
      }
    }
    debug!(region = %self.search.region(), order = %self.search.sort_order(), "filters staged");
    self.save_config();
  }

  fn reject(&mut self, rejection: Rejection) {
    debug!(%rejection, "search rejected");
    if rejection == Rejection::AuthRequired {
      self.mode = AppMode::SignIn;
    }
    self.set_notice(rejection.notice());
  }

  /// Send the ticket to the proxy on a background task. The outcome comes
  /// back through `search_rx` and is applied in `check_pending`.
  fn dispatch(&mut self, ticket: SearchTicket) {
    self.clear_notice();
    self.list_state.select(None);
    self.cancel_thumbnail();

    let client = self.client.clone();
    let tx = self.tasks.search_tx.clone();
    tokio::spawn(async move {
      let outcome = client.search(&ticket).await;
      let _ = tx.send((ticket.seq, outcome));
    });
  }

  pub fn check_pending(&mut self) {
    while let Ok((seq, outcome)) = self.tasks.search_rx.try_recv() {
      self.apply_outcome(seq, outcome);
    }

    if let Some(mut rx) = self.tasks.thumb_rx.take() {
      match rx.try_recv() {
        Ok((video_id, result)) => {
          self.tasks.thumb_for = None;
          match result {
            Ok(image) => {
              self.gfx.thumbnail = Some((video_id, image));
              self.gfx.resized = None;
            }
            // The preview falls back to its "No Thumbnail" placeholder.
            Err(e) => debug!(err = %e, video_id, "thumbnail unavailable"),
          }
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.thumb_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.tasks.thumb_for = None;
        }
      }
    }

    if self.session_rx.has_changed().unwrap_or(false) {
      let authenticated = self.session_rx.borrow_and_update().is_authenticated();
      info!(authenticated, "session changed");
      if !authenticated {
        self.mode = AppMode::SignIn;
      } else if self.mode == AppMode::SignIn {
        self.mode = AppMode::Input;
      }
    }

    self.expire_notice();
  }

  fn apply_outcome(&mut self, seq: u64, outcome: Result<Vec<VideoResult>, SearchError>) {
    match self.search.complete(seq, outcome) {
      Completion::Ready(0) => {
        self.mode = AppMode::Input;
      }
      Completion::Ready(_) => {
        self.list_state.select(Some(0));
        if self.mode == AppMode::Input {
          self.mode = AppMode::Results;
        }
        self.trigger_thumbnail();
      }
      Completion::Failed(e) => {
        self.set_notice(e.notice());
      }
      Completion::Stale => {}
    }
  }

  // --- Results ---

  pub fn selected_video(&self) -> Option<&VideoResult> {
    let idx = self.list_state.selected()?;
    self.search.state().results.get(idx)
  }

  pub fn select_next(&mut self) {
    let count = self.search.state().results.len();
    if count > 0 {
      let i = self.list_state.selected().map_or(0, |i| (i + 1) % count);
      self.list_state.select(Some(i));
      self.trigger_thumbnail();
    }
  }

  pub fn select_previous(&mut self) {
    let count = self.search.state().results.len();
    if count > 0 {
      let i = self.list_state.selected().map_or(0, |i| if i == 0 { count - 1 } else { i - 1 });
      self.list_state.select(Some(i));
      self.trigger_thumbnail();
    }
  }

  fn cancel_thumbnail(&mut self) {
    self.tasks.thumb_rx = None;
    self.tasks.thumb_for = None;
    self.gfx.thumbnail = None;
    self.gfx.resized = None;
  }

  /// Fetch the selected result's thumbnail unless it is shown or already on its way.
  pub fn trigger_thumbnail(&mut self) {
    let Some(video) = self.selected_video() else { return };
    let video_id = video.video_id.clone();
    let url = video.thumbnail_url.clone();
    if self.gfx.thumbnail.as_ref().is_some_and(|(id, _)| *id == video_id)
      || self.tasks.thumb_for.as_deref() == Some(video_id.as_str())
    {
      return;
    }

    let client = self.client.http().clone();
    let (tx, rx) = oneshot::channel();
    let id = video_id.clone();
    tokio::spawn(async move {
      let result = fetch_thumbnail(&client, &url).await;
      let _ = tx.send((id, result));
    });
    self.tasks.thumb_rx = Some(rx);
    self.tasks.thumb_for = Some(video_id);
  }

  /// Open the selected video's watch page in the default browser.
  pub fn open_selected(&mut self) {
    let Some(url) = self.selected_video().map(VideoResult::watch_url) else { return };
    info!(url = %url, "opening watch page");
    #[cfg(target_os = "macos")]
    let cmd = "open";
    #[cfg(not(target_os = "macos"))]
    let cmd = "xdg-open";
    match std::process::Command::new(cmd)
      .arg(&url)
      .stdin(std::process::Stdio::null())
      .stdout(std::process::Stdio::null())
      .stderr(std::process::Stdio::null())
      .spawn()
    {
      Ok(mut child) => {
        // Reap the child in a background thread to avoid zombie processes.
        std::thread::spawn(move || {
          let _ = child.wait();
        });
      }
      Err(e) => {
        warn!(err = %e, "failed to open browser");
        self.set_notice(Notice::error("Browser", format!("Failed to open {}: {}", url, e)));
      }
    }
  }

  // --- Session ---

  pub fn sign_in(&mut self) {
    let session = Session::with_token(&self.token_input);
    if !session.is_authenticated() {
      self.set_notice(Notice::info("Paste an access token to sign in."));
      return;
    }
    self.session.sign_in(session);
    self.token_input.clear();
    self.token_cursor = 0;
    self.clear_notice();
    self.mode = AppMode::Input;
  }

  pub fn sign_out(&mut self) {
    self.session.sign_out();
    self.set_notice(Notice::info("Signed out."));
  }
}
