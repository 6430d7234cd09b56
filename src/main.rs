mod app;
mod client;
mod config;
mod constants;
mod display;
mod error;
mod graphics;
mod input;
mod logging;
mod model;
mod search;
mod server;
mod session;
mod theme;
mod ui;
mod upstream;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use app::App;
use client::ProxyClient;
use config::{Config, ServerConfig};
use display::CliDisplayMode;
use session::{Session, WatchSession};

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Thumbnail rendering: 'auto', 'direct' (half-block), or 'ascii' (default: auto-detect)
  #[arg(short, long, default_value = "auto")]
  display_mode: CliDisplayMode,

  /// Search proxy endpoint (overrides prefs.toml)
  #[arg(long)]
  proxy_url: Option<String>,

  /// Access token to start signed in with
  #[arg(long, env = "VIDSCOUT_TOKEN", hide_env_values = true)]
  token: Option<String>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Run the search proxy
  Serve {
    /// Address to listen on (overrides VIDSCOUT_BIND)
    #[arg(long)]
    bind: Option<String>,
  },
  /// Print shell completions
  Completions { shell: clap_complete::Shell },
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  match args.command {
    Some(Command::Serve { bind }) => {
      logging::init_stdout()?;
      let mut config = ServerConfig::from_env();
      if let Some(bind) = bind {
        config.bind = bind;
      }
      server::serve(config).await
    }
    Some(Command::Completions { shell }) => {
      let mut cmd = Args::command();
      let name = cmd.get_name().to_string();
      clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
      Ok(())
    }
    None => {
      let _guard = logging::init_file()?;

      let default_hook = std::panic::take_hook();
      std::panic::set_hook(Box::new(move |info| {
        ratatui::restore();
        default_hook(info);
      }));

      let app = build_app(args)?;
      let mut terminal = ratatui::init();
      let result = run(&mut terminal, app).await;
      ratatui::restore();
      result
    }
  }
}

fn build_app(args: Args) -> Result<App> {
  let mut config = Config::load();
  if let Some(url) = args.proxy_url {
    config.proxy_url = Some(url);
  }
  let display_mode = display::resolve_display_mode(args.display_mode, config.display_mode.as_deref());
  let client = ProxyClient::new(config.proxy_url(), config.publishable_key.clone(), config.request_timeout())?;
  let initial = args.token.as_deref().map(Session::with_token).unwrap_or_default();
  let session = Arc::new(WatchSession::new(initial));

  info!(endpoint = client.endpoint(), display = display_mode.label(), "starting front-end");
  Ok(App::new(config, session, client, display_mode).with_persistence())
}

async fn run(terminal: &mut DefaultTerminal, mut app: App) -> Result<()> {
  loop {
    app.check_pending();

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          input::handle_key_event(&mut app, key);
        }
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }
  info!("front-end exiting");
  Ok(())
}
