use ratatui::style::Color;

pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub accent: Color,
  pub muted: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  /// Loading skeleton blocks.
  pub skeleton: Color,
  pub status: Color,
  pub error: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub const THEMES: [Theme; 3] = [
  Theme {
    name: "dusk",
    bg: Color::Rgb(24, 24, 32),
    fg: Color::Rgb(220, 220, 230),
    accent: Color::Rgb(255, 95, 95),
    muted: Color::Rgb(120, 120, 140),
    border: Color::Rgb(70, 70, 90),
    highlight_fg: Color::Rgb(255, 255, 255),
    highlight_bg: Color::Rgb(70, 40, 50),
    stripe_bg: Color::Rgb(30, 30, 40),
    skeleton: Color::Rgb(50, 50, 64),
    status: Color::Rgb(240, 200, 90),
    error: Color::Rgb(255, 110, 110),
    key_fg: Color::Rgb(24, 24, 32),
    key_bg: Color::Rgb(160, 160, 180),
  },
  Theme {
    name: "paper",
    bg: Color::Rgb(250, 248, 242),
    fg: Color::Rgb(40, 40, 40),
    accent: Color::Rgb(200, 30, 30),
    muted: Color::Rgb(130, 130, 120),
    border: Color::Rgb(200, 196, 186),
    highlight_fg: Color::Rgb(20, 20, 20),
    highlight_bg: Color::Rgb(240, 215, 205),
    stripe_bg: Color::Rgb(242, 239, 230),
    skeleton: Color::Rgb(225, 221, 210),
    status: Color::Rgb(160, 110, 0),
    error: Color::Rgb(190, 20, 20),
    key_fg: Color::Rgb(250, 248, 242),
    key_bg: Color::Rgb(110, 110, 100),
  },
  Theme {
    name: "terminal",
    bg: Color::Reset,
    fg: Color::Reset,
    accent: Color::Red,
    muted: Color::DarkGray,
    border: Color::Gray,
    highlight_fg: Color::Black,
    highlight_bg: Color::Red,
    stripe_bg: Color::Reset,
    skeleton: Color::DarkGray,
    status: Color::Yellow,
    error: Color::LightRed,
    key_fg: Color::Black,
    key_bg: Color::Gray,
  },
];

pub fn theme_index(name: Option<&str>) -> usize {
  name.and_then(|n| THEMES.iter().position(|t| t.name == n)).unwrap_or(0)
}
