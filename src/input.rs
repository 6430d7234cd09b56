use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};

use crate::app::{App, AppMode, FilterField};

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

/// Apply a line-editing key to `text`. Returns false if the key is not an edit.
fn edit_line(text: &mut String, cursor: &mut usize, code: KeyCode) -> bool {
  match code {
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(text, *cursor);
      text.insert(byte_idx, c);
      *cursor += 1;
    }
    KeyCode::Backspace => {
      if *cursor > 0 {
        *cursor -= 1;
        let byte_idx = char_to_byte_index(text, *cursor);
        text.remove(byte_idx);
      }
    }
    KeyCode::Delete => {
      if *cursor < text.chars().count() {
        let byte_idx = char_to_byte_index(text, *cursor);
        text.remove(byte_idx);
      }
    }
    KeyCode::Left => {
      *cursor = cursor.saturating_sub(1);
    }
    KeyCode::Right => {
      if *cursor < text.chars().count() {
        *cursor += 1;
      }
    }
    KeyCode::Home => {
      *cursor = 0;
    }
    KeyCode::End => {
      *cursor = text.chars().count();
    }
    _ => return false,
  }
  true
}

// --- Event Handling ---

pub fn handle_key_event(app: &mut App, key: event::KeyEvent) {
  let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

  if ctrl && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return;
  }

  if ctrl && key.code == KeyCode::Char('t') {
    app.next_theme();
    return;
  }

  if ctrl && key.code == KeyCode::Char('l') {
    app.sign_out();
    return;
  }

  match app.mode {
    AppMode::Input => handle_input_key(app, key),
    AppMode::Results => handle_results_key(app, key),
    AppMode::Filter => handle_filter_key(app, key),
    AppMode::SignIn => handle_sign_in_key(app, key),
  }
}

fn handle_input_key(app: &mut App, key: event::KeyEvent) {
  // The search box is disabled while a request is in flight.
  if app.search.is_loading() {
    if key.code == KeyCode::Esc {
      app.should_quit = true;
    }
    return;
  }

  match key.code {
    KeyCode::Enter => {
      app.trigger_search();
    }
    KeyCode::Tab => {
      app.mode = AppMode::Filter;
    }
    KeyCode::Esc => {
      if !app.input.is_empty() {
        app.input.clear();
        app.cursor_position = 0;
        app.input_scroll = 0;
      } else if !app.search.state().results.is_empty() {
        app.mode = AppMode::Results;
      } else {
        app.should_quit = true;
      }
    }
    KeyCode::Down => {
      if !app.search.state().results.is_empty() {
        app.mode = AppMode::Results;
      }
    }
    code => {
      if edit_line(&mut app.input, &mut app.cursor_position, code) {
        app.clear_notice();
      }
    }
  }
}

fn handle_results_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter | KeyCode::Char('o') => {
      app.open_selected();
    }
    KeyCode::Down | KeyCode::Char('j') => {
      app.select_next();
    }
    KeyCode::Up | KeyCode::Char('k') => {
      app.select_previous();
    }
    KeyCode::Tab | KeyCode::Char('f') => {
      app.mode = AppMode::Filter;
    }
    KeyCode::Esc | KeyCode::Char('/') => {
      app.mode = AppMode::Input;
    }
    _ => {}
  }
}

fn handle_filter_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
      app.filter_field = match app.filter_field {
        FilterField::Sort => FilterField::Region,
        FilterField::Region => FilterField::Sort,
      };
    }
    KeyCode::Right | KeyCode::Char('l') => app.cycle_filter(true),
    KeyCode::Left | KeyCode::Char('h') => app.cycle_filter(false),
    KeyCode::Enter => {
      app.apply_filters();
    }
    KeyCode::Esc => {
      app.mode = if app.search.state().results.is_empty() { AppMode::Input } else { AppMode::Results };
    }
    _ => {}
  }
}

fn handle_sign_in_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter => {
      app.sign_in();
    }
    KeyCode::Esc => {
      if app.token_input.is_empty() {
        app.should_quit = true;
      } else {
        app.token_input.clear();
        app.token_cursor = 0;
      }
    }
    code => {
      edit_line(&mut app.token_input, &mut app.token_cursor, code);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  // --- char_to_byte_index ---

  #[test]
  fn char_to_byte_ascii() {
    assert_eq!(char_to_byte_index("hello", 0), 0);
    assert_eq!(char_to_byte_index("hello", 3), 3);
    assert_eq!(char_to_byte_index("hello", 5), 5); // past end
  }

  #[test]
  fn char_to_byte_multibyte() {
    let s = "aé日"; // a=1 byte, é=2 bytes, 日=3 bytes
    assert_eq!(char_to_byte_index(s, 0), 0);
    assert_eq!(char_to_byte_index(s, 1), 1);
    assert_eq!(char_to_byte_index(s, 2), 3);
    assert_eq!(char_to_byte_index(s, 3), 6);
  }

  #[test]
  fn char_to_byte_empty() {
    assert_eq!(char_to_byte_index("", 0), 0);
    assert_eq!(char_to_byte_index("", 5), 0);
  }

  // --- edit_line ---

  #[test]
  fn edit_line_inserts_at_cursor() {
    let mut text = String::from("ct");
    let mut cursor = 1;
    assert!(edit_line(&mut text, &mut cursor, KeyCode::Char('a')));
    assert_eq!(text, "cat");
    assert_eq!(cursor, 2);
  }

  #[test]
  fn edit_line_backspace_handles_multibyte() {
    let mut text = String::from("日本");
    let mut cursor = 2;
    edit_line(&mut text, &mut cursor, KeyCode::Backspace);
    assert_eq!(text, "日");
    assert_eq!(cursor, 1);
  }

  #[test]
  fn edit_line_ignores_non_edit_keys() {
    let mut text = String::from("x");
    let mut cursor = 1;
    assert!(!edit_line(&mut text, &mut cursor, KeyCode::Enter));
    assert_eq!(text, "x");
  }
}
