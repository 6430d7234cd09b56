use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
  env, fs,
  path::{Path, PathBuf},
  time::Duration,
};
use tracing::{debug, info, warn};

use crate::constants::constants;
use crate::model::{Region, SortOrder};

/// Front-end preferences, persisted as `prefs.toml` in the config directory.
#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct Config {
  pub theme_name: Option<String>,
  pub display_mode: Option<String>,
  pub region: Option<Region>,
  pub sort_order: Option<SortOrder>,
  pub proxy_url: Option<String>,
  pub publishable_key: Option<String>,
  pub request_timeout_secs: Option<u64>,
}

fn project_dirs() -> Option<ProjectDirs> {
  ProjectDirs::from("", "", "vidscout")
}

impl Config {
  pub fn load() -> Self {
    if let Some(proj_dirs) = project_dirs() {
      let config_file = proj_dirs.config_dir().join("prefs.toml");
      if let Ok(content) = fs::read_to_string(&config_file) {
        match toml::from_str(&content) {
          Ok(config) => return config,
          Err(e) => warn!(err = %e, path = %config_file.display(), "config: ignoring malformed prefs"),
        }
      }
    }
    Self::default()
  }

  pub fn save(&self) {
    if let Some(proj_dirs) = project_dirs() {
      self.save_to(proj_dirs.config_dir());
    }
  }

  /// Write `prefs.toml` into `config_dir`, creating it if needed. Failures are logged.
  fn save_to(&self, config_dir: &Path) -> bool {
    if let Err(e) = fs::create_dir_all(config_dir) {
      warn!(err = %e, path = %config_dir.display(), "config: failed to create config dir");
      return false;
    }
    let config_file = config_dir.join("prefs.toml");
    let content = match toml::to_string(self) {
      Ok(content) => content,
      Err(e) => {
        warn!(err = %e, "config: failed to serialize prefs");
        return false;
      }
    };
    if let Err(e) = fs::write(&config_file, content) {
      warn!(err = %e, path = %config_file.display(), "config: failed to save prefs");
      return false;
    }
    true
  }

  pub fn proxy_url(&self) -> String {
    self.proxy_url.clone().unwrap_or_else(|| constants().default_proxy_url.clone())
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs.unwrap_or(constants().request_timeout_secs).max(1))
  }
}

/// Directory for log files. Falls back to the system temp dir.
pub fn data_dir() -> PathBuf {
  project_dirs().map(|d| d.data_dir().to_path_buf()).unwrap_or_else(env::temp_dir)
}

/// Proxy settings, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
  pub bind: String,
  /// Upstream platform key. Only the proxy ever holds it.
  pub api_key: Option<String>,
  /// Accepted bearer credentials. Empty means any non-empty credential.
  pub access_tokens: Vec<String>,
  pub upstream_url: String,
  pub upstream_timeout: Duration,
}

impl ServerConfig {
  pub fn from_env() -> Self {
    let c = constants();
    Self {
      bind: env_or("VIDSCOUT_BIND", &c.default_bind),
      api_key: read_secret("YOUTUBE_API_KEY"),
      access_tokens: var("VIDSCOUT_ACCESS_TOKENS").map(|v| parse_token_list(&v)).unwrap_or_default(),
      upstream_url: env_or("VIDSCOUT_UPSTREAM_URL", &c.upstream_search_url),
      upstream_timeout: Duration::from_secs(c.request_timeout_secs),
    }
  }
}

fn var(key: &str) -> Option<String> {
  env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
  var(key).unwrap_or_else(|| {
    info!("{key} not set, using default: {default}");
    default.to_string()
  })
}

/// Environment first, then a mounted secret file (`/run/secrets/<name>`).
fn read_secret(secret_name: &str) -> Option<String> {
  if let Some(value) = var(secret_name) {
    return Some(value);
  }
  let path = format!("/run/secrets/{secret_name}");
  match fs::read_to_string(&path) {
    Ok(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
    Ok(_) => {
      warn!("{secret_name} secret file is empty");
      None
    }
    Err(e) => {
      debug!("{secret_name} not readable from {path}: {e}");
      warn!("{secret_name} not configured; searches will fail with 500");
      None
    }
  }
}

pub fn parse_token_list(raw: &str) -> Vec<String> {
  raw.split(',').map(str::trim).filter(|t| !t.is_empty()).map(str::to_string).collect()
}
