//! # Toolbar Component
//!
//! Navigation indicators plus the address bar for the active tab.
//!
//! ```text
//! ╭ ◀ ▶ ⟳ ⌂ ♪̸ ─────────────────────────────────╮
//! │ https://example.com/                       │
//! ╰────────────────────────────────────────────╯
//! ```
//!
//! Back/forward are dimmed when unavailable; reload turns into a spinner
//! while loading. The address text is a prop from `App` unless the bar is
//! being edited, in which case the local buffer is shown with a cursor.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::core::surface::NavigationState;
use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressEvent {
    Changed(String),
    Submit(String),
    Cancel,
}

/// Editing state for the address bar.
#[derive(Debug, Default)]
pub struct AddressBarState {
    pub buffer: String,
    /// Byte offset of the cursor in `buffer`.
    pub cursor: usize,
}

impl AddressBarState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts editing from `text` with the cursor at the end.
    pub fn begin(&mut self, text: &str) {
        self.buffer = text.to_string();
        self.cursor = self.buffer.len();
    }

    fn prev_boundary(&self) -> usize {
        self.buffer[..self.cursor]
            .char_indices()
            .next_back()
            .map_or(0, |(i, _)| i)
    }

    fn next_boundary(&self) -> usize {
        self.buffer[self.cursor..]
            .chars()
            .next()
            .map_or(self.cursor, |c| self.cursor + c.len_utf8())
    }
}

impl EventHandler for AddressBarState {
    type Event = AddressEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::InputChar(c) => {
                self.buffer.insert(self.cursor, *c);
                self.cursor += c.len_utf8();
                Some(AddressEvent::Changed(self.buffer.clone()))
            }
            TuiEvent::Paste(text) => {
                // Addresses are single-line.
                let text: String = text.chars().filter(|c| !c.is_control()).collect();
                self.buffer.insert_str(self.cursor, &text);
                self.cursor += text.len();
                Some(AddressEvent::Changed(self.buffer.clone()))
            }
            TuiEvent::Backspace => {
                if self.cursor == 0 {
                    return None;
                }
                let prev = self.prev_boundary();
                self.buffer.drain(prev..self.cursor);
                self.cursor = prev;
                Some(AddressEvent::Changed(self.buffer.clone()))
            }
            TuiEvent::Delete => {
                if self.cursor >= self.buffer.len() {
                    return None;
                }
                let next = self.next_boundary();
                self.buffer.drain(self.cursor..next);
                Some(AddressEvent::Changed(self.buffer.clone()))
            }
            TuiEvent::CursorLeft => {
                self.cursor = self.prev_boundary();
                None
            }
            TuiEvent::CursorRight => {
                self.cursor = self.next_boundary();
                None
            }
            TuiEvent::CursorHome => {
                self.cursor = 0;
                None
            }
            TuiEvent::CursorEnd => {
                self.cursor = self.buffer.len();
                None
            }
            TuiEvent::Submit | TuiEvent::SubmitModified => {
                Some(AddressEvent::Submit(self.buffer.clone()))
            }
            TuiEvent::Escape => Some(AddressEvent::Cancel),
            _ => None,
        }
    }
}

pub struct Toolbar<'a> {
    pub address: &'a str,
    pub navigation: NavigationState,
    pub muted: bool,
    /// `Some` while the address bar is being edited.
    pub editing: Option<&'a AddressBarState>,
    pub spinner_frame: usize,
}

fn indicator(symbol: &str, enabled: bool) -> Span<'_> {
    if enabled {
        Span::styled(symbol, Style::default().fg(Color::White))
    } else {
        Span::styled(symbol, Style::default().add_modifier(Modifier::DIM))
    }
}

impl Component for Toolbar<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let reload = if self.navigation.is_loading {
            SPINNER[self.spinner_frame % SPINNER.len()]
        } else {
            "⟳"
        };
        let title = Line::from(vec![
            Span::raw(" "),
            indicator("◀", self.navigation.can_go_back),
            Span::raw(" "),
            indicator("▶", self.navigation.can_go_forward),
            Span::raw(" "),
            indicator(reload, true),
            Span::raw(" "),
            indicator("⌂", true),
            Span::raw(" "),
            indicator(if self.muted { "muted" } else { "sound" }, !self.muted),
            Span::raw(" "),
        ]);

        let border_style = if self.editing.is_some() {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(border_style)
            .title(title);

        let text = self.editing.map_or(self.address, |state| state.buffer.as_str());
        let inner_width = area.width.saturating_sub(2) as usize;

        // Keep the cursor in view by scrolling long addresses horizontally.
        let cursor_col = self
            .editing
            .map(|state| state.buffer[..state.cursor].width())
            .unwrap_or(0);
        let scroll = cursor_col.saturating_sub(inner_width.saturating_sub(1));

        let paragraph = Paragraph::new(text)
            .block(block)
            .scroll((0, scroll.min(u16::MAX as usize) as u16));
        frame.render_widget(paragraph, area);

        if self.editing.is_some() {
            let x = area.x + 1 + (cursor_col - scroll) as u16;
            frame.set_cursor_position((x, area.y + 1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn render(toolbar: &mut Toolbar) -> String {
        let backend = TestBackend::new(50, 3);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| toolbar.render(f, f.area())).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_render_shows_address_and_indicators() {
        let mut toolbar = Toolbar {
            address: "https://example.com/",
            navigation: NavigationState::default(),
            muted: true,
            editing: None,
            spinner_frame: 0,
        };
        let text = render(&mut toolbar);
        assert!(text.contains("https://example.com/"));
        assert!(text.contains("◀"));
        assert!(text.contains("⟳"));
        assert!(text.contains("muted"));
    }

    #[test]
    fn test_loading_shows_spinner() {
        let mut toolbar = Toolbar {
            address: "",
            navigation: NavigationState {
                is_loading: true,
                ..NavigationState::default()
            },
            muted: false,
            editing: None,
            spinner_frame: 1,
        };
        let text = render(&mut toolbar);
        assert!(text.contains("◓"));
        assert!(!text.contains("⟳"));
    }

    #[test]
    fn test_editing_shows_buffer_not_prop() {
        let mut state = AddressBarState::new();
        state.begin("typed.test");
        let mut toolbar = Toolbar {
            address: "https://old.test/",
            navigation: NavigationState::default(),
            muted: false,
            editing: Some(&state),
            spinner_frame: 0,
        };
        let text = render(&mut toolbar);
        assert!(text.contains("typed.test"));
        assert!(!text.contains("old.test"));
    }

    #[test]
    fn test_address_editing_events() {
        let mut state = AddressBarState::new();
        state.begin("exampl");
        assert_eq!(
            state.handle_event(&TuiEvent::InputChar('e')),
            Some(AddressEvent::Changed("example".into()))
        );
        state.handle_event(&TuiEvent::CursorHome);
        state.handle_event(&TuiEvent::Delete);
        assert_eq!(state.buffer, "xample");
        state.handle_event(&TuiEvent::CursorEnd);
        state.handle_event(&TuiEvent::Backspace);
        assert_eq!(state.buffer, "xampl");
        assert_eq!(
            state.handle_event(&TuiEvent::Submit),
            Some(AddressEvent::Submit("xampl".into()))
        );
        assert_eq!(state.handle_event(&TuiEvent::Escape), Some(AddressEvent::Cancel));
    }

    #[test]
    fn test_paste_strips_newlines_and_handles_multibyte() {
        let mut state = AddressBarState::new();
        state.begin("é");
        state.handle_event(&TuiEvent::Paste("a\nb".into()));
        assert_eq!(state.buffer, "éab");
        state.handle_event(&TuiEvent::CursorHome);
        state.handle_event(&TuiEvent::CursorRight);
        assert_eq!(state.cursor, 'é'.len_utf8());
    }
}
