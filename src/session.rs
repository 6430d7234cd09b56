//! Authentication session as seen by the front-end.
//!
//! The session is owned by a provider; the search layer only reads it. Changes
//! are published over a `watch` channel so the run loop can react to sign-in
//! and sign-out without polling the provider.

use chrono::{DateTime, Utc};
use std::fmt;
use tokio::sync::watch;
use tracing::info;

/// Opaque bearer token. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
  /// Returns `None` for blank tokens.
  pub fn new(token: &str) -> Option<Self> {
    let token = token.trim();
    if token.is_empty() { None } else { Some(Self(token.to_string())) }
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for Credential {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Credential(…{} chars)", self.0.chars().count())
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
  pub credential: Option<Credential>,
  pub identity: Option<String>,
  pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
  pub fn signed_out() -> Self {
    Self::default()
  }

  pub fn with_token(token: &str) -> Self {
    Self { credential: Credential::new(token), identity: None, expires_at: None }
  }

  /// The credential, provided it exists and has not expired at `now`.
  pub fn valid_credential(&self, now: DateTime<Utc>) -> Option<&Credential> {
    if self.expires_at.is_some_and(|exp| exp <= now) {
      return None;
    }
    self.credential.as_ref()
  }

  pub fn is_authenticated(&self) -> bool {
    self.valid_credential(Utc::now()).is_some()
  }
}

/// Source of the current session.
pub trait SessionProvider: Send + Sync {
  /// Snapshot of the current session.
  fn session(&self) -> Session;

  /// Receiver that is marked changed whenever the session changes.
  fn on_session_change(&self) -> watch::Receiver<Session>;

  fn sign_out(&self);
}

/// In-process provider backed by a `watch` channel.
pub struct WatchSession {
  tx: watch::Sender<Session>,
}

impl WatchSession {
  pub fn new(initial: Session) -> Self {
    let (tx, _rx) = watch::channel(initial);
    Self { tx }
  }

  pub fn sign_in(&self, session: Session) {
    info!(identity = ?session.identity, "session: signed in");
    self.tx.send_replace(session);
  }
}

impl SessionProvider for WatchSession {
  fn session(&self) -> Session {
    self.tx.borrow().clone()
  }

  fn on_session_change(&self) -> watch::Receiver<Session> {
    self.tx.subscribe()
  }

  fn sign_out(&self) {
    info!("session: signed out");
    self.tx.send_replace(Session::signed_out());
  }
}
