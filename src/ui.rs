use chrono::Local;
use image::imageops::FilterType;
use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, List, ListItem, Padding, Paragraph},
};

use crate::app::{App, AppMode, FilterField};
use crate::error::Severity;
use crate::graphics::{ThumbnailWidget, target_size};
use crate::model::VideoResult;
use crate::search::{ResultView, Status};
use crate::theme::Theme;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

/// Slice of `text` visible in a box `inner_w` columns wide starting at column `scroll`.
fn visible_slice(text: &str, scroll: usize, inner_w: usize) -> String {
  text
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= scroll)
    .take_while(|(start, _, _)| *start < scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect()
}

/// Keep the cursor column inside the visible window.
fn adjust_scroll(scroll: &mut usize, cursor_col: usize, inner_w: usize) {
  if cursor_col < *scroll {
    *scroll = cursor_col;
  } else if cursor_col >= *scroll + inner_w {
    *scroll = cursor_col.saturating_sub(inner_w) + 1;
  }
}

fn published_label(video: &VideoResult) -> String {
  video.published_at.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

fn rounded(theme: &Theme) -> Block<'static> {
  Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border))
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, filter_area, main_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Min(3),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  render_filters(frame, app, filter_area);
  render_main(frame, app, main_area);
  render_status(frame, app, status_area);
  render_input(frame, app, input_area);
  render_footer(frame, app, footer_area);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let left = Line::from(Span::styled(" ▶ vidscout ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)));
  frame.render_widget(left, area);

  let session = app.session();
  let who = if session.is_authenticated() {
    session.identity.unwrap_or_else(|| "signed in".to_string())
  } else {
    "signed out".to_string()
  };
  let right_text = format!("{} · v{} ", who, env!("CARGO_PKG_VERSION"));
  let width = right_text.chars().count() as u16;
  let right = Line::from(Span::styled(right_text, Style::default().fg(theme.muted)));
  let right_area = Rect { x: area.x + area.width.saturating_sub(width), width: width.min(area.width), ..area };
  frame.render_widget(right, right_area);
}

fn render_filters(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let focused = app.mode == AppMode::Filter;
  let border_color = if focused { theme.accent } else { theme.border };
  let block = Block::bordered()
    .title(" Filters ")
    .title_style(Style::default().fg(border_color))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let value_style = |field: FilterField| {
    if focused && app.filter_field == field {
      Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD)
    } else {
      Style::default().fg(theme.fg)
    }
  };

  let region = app.search.region();
  let mut spans = vec![
    Span::styled("Sort ", Style::default().fg(theme.muted)),
    Span::styled(format!("◀ {} ▶", app.search.sort_order().label()), value_style(FilterField::Sort)),
    Span::raw("   "),
    Span::styled("Region ", Style::default().fg(theme.muted)),
    Span::styled(format!("◀ {} ({}) ▶", region.name(), region.code()), value_style(FilterField::Region)),
    Span::raw("   "),
  ];

  let state = app.search.state();
  if app.search.is_loading() {
    spans.push(Span::styled("⏳ Loading…", Style::default().fg(theme.status)));
  } else if state.pending_filter_change {
    spans.push(Span::styled("● Changed, press Enter here to apply", Style::default().fg(theme.status)));
  }

  frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_main(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  if app.mode == AppMode::SignIn {
    render_sign_in(frame, theme, area);
    return;
  }

  match app.search.view() {
    ResultView::Loading { placeholders } => render_skeleton(frame, theme, placeholders, area),
    ResultView::NoQuery => render_empty(frame, theme, area, "No results yet. Try searching for a topic!"),
    ResultView::NoResults => render_empty(frame, theme, area, "No videos found for your search."),
    ResultView::Grid(_) => {
      let [list_area, preview_area] =
        Layout::horizontal([Constraint::Percentage(58), Constraint::Percentage(42)]).areas(area);
      render_results(frame, app, list_area);
      render_preview(frame, app, preview_area);
    }
  }
}

fn render_empty(frame: &mut Frame, theme: &Theme, area: Rect, message: &str) {
  let top = area.height.saturating_sub(2) / 2;
  let mut lines = vec![Line::from(""); top.saturating_sub(1) as usize];
  lines.push(Line::from(Span::styled(message.to_string(), Style::default().fg(theme.muted))));
  let paragraph = Paragraph::new(lines).alignment(Alignment::Center).block(rounded(theme));
  frame.render_widget(paragraph, area);
}

fn render_sign_in(frame: &mut Frame, theme: &Theme, area: Rect) {
  let text = vec![
    Line::from(""),
    Line::from(Span::styled("▶  Sign in", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(Span::styled("You must be logged in to search videos.", Style::default().fg(theme.fg))),
    Line::from(""),
    Line::from(Span::styled("Paste your access token below and press Enter.", Style::default().fg(theme.muted))),
  ];
  let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(rounded(theme));
  frame.render_widget(paragraph, area);
}

/// Grey placeholder cards, three per row, shown while a request is in flight.
fn render_skeleton(frame: &mut Frame, theme: &Theme, placeholders: usize, area: Rect) {
  const COLUMNS: usize = 3;
  let rows = placeholders.div_ceil(COLUMNS).max(1);
  let row_areas = Layout::vertical(vec![Constraint::Ratio(1, rows as u32); rows]).split(area);
  let bar = Style::default().fg(theme.skeleton);

  for (row, row_area) in row_areas.iter().enumerate() {
    let col_areas = Layout::horizontal(vec![Constraint::Ratio(1, COLUMNS as u32); COLUMNS]).split(*row_area);
    for (col, card) in col_areas.iter().enumerate() {
      if row * COLUMNS + col >= placeholders {
        break;
      }
      let block = Block::bordered().border_type(BorderType::Rounded).border_style(bar);
      let inner = block.inner(*card);
      frame.render_widget(block, *card);
      if inner.is_empty() {
        continue;
      }

      let [thumb, text] = Layout::vertical([Constraint::Min(1), Constraint::Length(2)]).areas(inner);
      frame.render_widget(Block::default().style(Style::default().bg(theme.skeleton)), thumb);
      let w = text.width as usize;
      let lines = vec![
        Line::from(Span::styled("▇".repeat(w.saturating_mul(3) / 4), bar)),
        Line::from(Span::styled("▇".repeat(w / 2), bar)),
      ];
      frame.render_widget(Paragraph::new(lines), text);
    }
  }
}

fn render_results(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let results = &app.search.state().results;

  // Inner width: area minus 2 borders minus 2 chars for highlight symbol ("▶ ")
  let inner_w = area.width.saturating_sub(4) as usize;

  let items: Vec<ListItem> = results
    .iter()
    .enumerate()
    .map(|(i, video)| {
      let is_selected = Some(i) == app.list_state.selected();
      let fg = if is_selected { theme.highlight_fg } else { theme.fg };
      let bg = if is_selected {
        theme.highlight_bg
      } else if i % 2 == 1 {
        theme.stripe_bg
      } else {
        theme.bg
      };

      let date = published_label(video);
      let channel = truncate_str(&video.channel, inner_w / 3);
      let right_w = channel.chars().count() + 2 + date.chars().count();
      let title = truncate_str(&video.title, inner_w.saturating_sub(right_w + 2));
      let gap = inner_w.saturating_sub(title.chars().count() + right_w);

      let line = Line::from(vec![
        Span::styled(title, Style::default().fg(fg)),
        Span::raw(" ".repeat(gap)),
        Span::styled(channel, Style::default().fg(theme.muted)),
        Span::raw("  "),
        Span::styled(date, Style::default().fg(theme.muted)),
      ]);
      ListItem::new(line).bg(bg)
    })
    .collect();

  let title = format!(" Results ({}) ", results.len());
  let list = List::new(items)
    .block(
      rounded(theme).title(title).title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
    )
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));

  frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn render_preview(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let block = rounded(theme)
    .title(Line::from(vec![
      Span::styled(" Preview ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
      Span::styled(format!("[{}] ", app.display_mode.label().to_lowercase()), Style::default().fg(theme.muted)),
    ]))
    .padding(Padding::horizontal(1));
  let inner = block.inner(area);
  frame.render_widget(block, area);

  let Some(video) = app.selected_video().cloned() else { return };
  let [mut thumb_area, info_area] = Layout::vertical([Constraint::Min(3), Constraint::Length(6)]).areas(inner);

  // Keep roughly 16:9 inside the available space.
  let ideal_h = (thumb_area.width as f32 * 9.0 / 32.0).round() as u16;
  if ideal_h < thumb_area.height {
    thumb_area.y += (thumb_area.height - ideal_h) / 2;
    thumb_area.height = ideal_h;
  }

  let shown = app.gfx.thumbnail.as_ref().filter(|(id, _)| *id == video.video_id).map(|(_, image)| image);
  match shown {
    Some(image) => {
      let needs_resize = match &app.gfx.resized {
        Some((id, w, h, _)) => *id != video.video_id || *w != thumb_area.width || *h != thumb_area.height,
        None => true,
      };
      if needs_resize {
        let (w, h) = target_size(app.display_mode, thumb_area);
        let resized = image.resize_to_fill(w, h, FilterType::Triangle);
        app.gfx.resized = Some((video.video_id.clone(), thumb_area.width, thumb_area.height, resized));
      }
      if let Some((_, _, _, ref resized)) = app.gfx.resized {
        frame.render_widget(ThumbnailWidget { image: resized, display_mode: app.display_mode }, thumb_area);
      }
    }
    None => {
      let label =
        if app.tasks.thumb_for.as_deref() == Some(video.video_id.as_str()) { "Loading…" } else { "No Thumbnail" };
      let placeholder = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(label, Style::default().fg(theme.muted))),
      ])
      .alignment(Alignment::Center)
      .style(Style::default().bg(theme.skeleton));
      frame.render_widget(placeholder, thumb_area);
    }
  }

  let inner_w = info_area.width as usize;
  let lines = vec![
    Line::from(""),
    Line::from(Span::styled(
      truncate_str(&video.title, inner_w),
      Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
    )),
    Line::from(vec![
      Span::styled("Channel    ", Style::default().fg(theme.muted)),
      Span::styled(truncate_str(&video.channel, inner_w.saturating_sub(11)), Style::default().fg(theme.fg)),
    ]),
    Line::from(vec![
      Span::styled("Published  ", Style::default().fg(theme.muted)),
      Span::styled(published_label(&video), Style::default().fg(theme.fg)),
    ]),
    Line::from(Span::styled(
      truncate_str(&video.watch_url(), inner_w),
      Style::default().fg(theme.accent).add_modifier(Modifier::UNDERLINED),
    )),
  ];
  frame.render_widget(Paragraph::new(lines), info_area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let state = app.search.state();
  let (text, style) = if let (true, Some(query)) = (app.search.is_loading(), &state.current_query) {
    (
      format!(" ⏳ Searching \"{}\" in {} by {}…", query.term, query.region.name(), query.sort_order.label()),
      Style::default().fg(theme.status),
    )
  } else if let Some(notice) = &app.notice {
    match notice.severity {
      Severity::Error => (format!(" ⚠  {}", notice), Style::default().fg(theme.error)),
      Severity::Info => (format!(" ℹ  {}", notice), Style::default().fg(theme.status)),
    }
  } else if state.status == Status::Ready {
    (format!(" {} videos", state.results.len()), Style::default().fg(theme.muted))
  } else {
    (format!(" Ready · {}", app.proxy_endpoint()), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let inner_w = area.width.saturating_sub(4) as usize;

  if app.mode == AppMode::SignIn {
    let masked: String = "•".repeat(app.token_input.chars().count());
    let cursor_col = app.token_cursor;
    let mut scroll = 0;
    adjust_scroll(&mut scroll, cursor_col, inner_w);
    let block = Block::bordered()
      .title(" Access Token ")
      .title_style(Style::default().fg(theme.accent))
      .border_type(BorderType::Rounded)
      .border_style(Style::default().fg(theme.accent))
      .padding(Padding::horizontal(1));
    let paragraph = Paragraph::new(visible_slice(&masked, scroll, inner_w)).style(Style::default().fg(theme.fg));
    frame.render_widget(paragraph.block(block), area);
    frame.set_cursor_position((area.x + 2 + (cursor_col - scroll) as u16, area.y + 1));
    return;
  }

  let loading = app.search.is_loading();
  let active = app.mode == AppMode::Input && !loading;
  let border_color = if active { theme.accent } else { theme.border };
  let title = if loading { " Searching… " } else { " Search YouTube " };
  let input_block = Block::bordered()
    .title(title)
    .title_style(Style::default().fg(border_color))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let cursor_col = display_width(&app.input, app.cursor_position);
  adjust_scroll(&mut app.input_scroll, cursor_col, inner_w);

  let text_color = if loading { theme.muted } else { theme.fg };
  let paragraph = Paragraph::new(visible_slice(&app.input, app.input_scroll, inner_w))
    .style(Style::default().fg(text_color))
    .block(input_block);
  frame.render_widget(paragraph, area);

  if active {
    let cursor_x = area.x + 2 + (cursor_col - app.input_scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let has_results = !app.search.state().results.is_empty();
  let keys: Vec<(&str, &str)> = match app.mode {
    AppMode::Input => {
      let mut k = vec![("Enter", "Search"), ("Tab", "Filters"), ("^t", "Theme"), ("^l", "Sign out")];
      if has_results {
        k.push(("↓", "Results"));
      }
      let esc = if !app.input.is_empty() {
        "Clear"
      } else if has_results {
        "Results"
      } else {
        "Quit"
      };
      k.push(("Esc", esc));
      k
    }
    AppMode::Results => {
      vec![("Enter", "Open"), ("j/k", "Navigate"), ("Tab", "Filters"), ("^t", "Theme"), ("Esc", "Back")]
    }
    AppMode::Filter => vec![("←/→", "Change"), ("Tab", "Next field"), ("Enter", "Apply"), ("Esc", "Back")],
    AppMode::SignIn => vec![("Enter", "Sign in"), ("^t", "Theme"), ("Esc", "Quit")],
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let theme_label = format!("{} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(theme_label.len() as u16), width: theme_label.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn truncate_appends_ellipsis() {
    assert_eq!(truncate_str("hello", 10), "hello");
    assert_eq!(truncate_str("hello world", 6), "hello…");
  }

  #[test]
  fn display_width_counts_wide_chars() {
    assert_eq!(display_width("日本a", 3), 5);
    assert_eq!(display_width("abc", 2), 2);
  }

  #[test]
  fn visible_slice_scrolls_by_columns() {
    assert_eq!(visible_slice("abcdef", 2, 3), "cde");
    assert_eq!(visible_slice("日本語", 2, 4), "本語");
  }

  #[test]
  fn adjust_scroll_follows_cursor() {
    let mut scroll = 0;
    adjust_scroll(&mut scroll, 12, 10);
    assert_eq!(scroll, 3);
    adjust_scroll(&mut scroll, 1, 10);
    assert_eq!(scroll, 1);
  }
}
