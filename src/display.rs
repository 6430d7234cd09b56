use clap::ValueEnum;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliDisplayMode {
  Auto,
  Direct,
  Ascii,
}

/// How thumbnails are drawn into terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
  Ascii,
  Direct,
}

impl DisplayMode {
  pub fn label(self) -> &'static str {
    match self {
      DisplayMode::Ascii => "ASCII",
      DisplayMode::Direct => "Half-block",
    }
  }

  pub fn from_config(s: &str) -> Option<Self> {
    match s.to_lowercase().as_str() {
      "direct" | "half-block" => Some(DisplayMode::Direct),
      "ascii" => Some(DisplayMode::Ascii),
      _ => None,
    }
  }
}

/// Detect the best display mode the terminal supports.
///
/// True-color terminals (`COLORTERM` is `truecolor` or `24bit`) get half-block
/// thumbnails; everything else falls back to ASCII shading.
pub fn detect_display_mode() -> DisplayMode {
  let colorterm = std::env::var("COLORTERM").unwrap_or_default().to_lowercase();
  let term_program = std::env::var("TERM_PROGRAM").unwrap_or_default().to_lowercase();
  if colorterm == "truecolor" || colorterm == "24bit" || matches!(term_program.as_str(), "wezterm" | "ghostty" | "iterm.app") {
    return DisplayMode::Direct;
  }
  DisplayMode::Ascii
}

/// CLI flag wins, then the saved preference, then detection.
pub fn resolve_display_mode(cli: CliDisplayMode, saved: Option<&str>) -> DisplayMode {
  match cli {
    CliDisplayMode::Direct => DisplayMode::Direct,
    CliDisplayMode::Ascii => DisplayMode::Ascii,
    CliDisplayMode::Auto => saved.and_then(DisplayMode::from_config).unwrap_or_else(detect_display_mode),
  }
}
