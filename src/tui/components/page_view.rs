//! # PageView Component
//!
//! Scrollable text rendering of the active tab's [`Document`].
//!
//! ## Layout
//!
//! ```text
//! Title
//!
//! paragraph text, wrapped to width
//!
//! ── Links ──
//! [0] link text  https://resolved/url
//! [1] ...
//! ```
//!
//! Links are numbered in document order. Up/Down moves the selection between
//! them and keeps it in view; Enter follows the selected link (Alt/Shift+Enter
//! follows it natively, bypassing the page's link interception).
//!
//! ## Architecture
//!
//! Like the other stateful components, `PageView` is rebuilt every frame
//! around a borrowed `&mut PageViewState`. The render pass records the row
//! each link occupies so key handling can scroll without re-wrapping.

use std::sync::Arc;

use ratatui::Frame;
use ratatui::layout::{Position, Rect, Size};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Paragraph};
use tui_scrollview::{ScrollView, ScrollViewState, ScrollbarVisibility};

use crate::core::document::Document;
use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    FollowLink { index: usize, modified: bool },
}

/// Scroll and link-selection state. Persisted in `TuiState`.
#[derive(Default)]
pub struct PageViewState {
    pub scroll_state: ScrollViewState,
    pub selected_link: Option<usize>,
    /// Content row of each link, filled during render.
    link_rows: Vec<u16>,
    viewport_height: u16,
    /// Identity of the document last rendered; selection resets when it changes.
    shown: Option<(usize, String)>,
}

impl PageViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link_count(&self) -> usize {
        self.link_rows.len()
    }

    /// Forgets selection and scroll if `document` is not the one shown last.
    pub fn track(&mut self, document: Option<&Arc<Document>>) {
        let key = document.map(|d| (Arc::as_ptr(d) as usize, d.url.clone()));
        if key != self.shown {
            self.shown = key;
            self.selected_link = None;
            self.scroll_state = ScrollViewState::default();
            self.link_rows.clear();
        }
    }

    fn scroll_to_selected(&mut self) {
        let Some(row) = self.selected_link.and_then(|i| self.link_rows.get(i)).copied() else {
            return;
        };
        let offset = self.scroll_state.offset().y;
        if row < offset {
            self.scroll_state.set_offset(Position { x: 0, y: row });
        } else if self.viewport_height > 0 && row >= offset + self.viewport_height {
            let y = row + 1 - self.viewport_height;
            self.scroll_state.set_offset(Position { x: 0, y });
        }
    }
}

impl EventHandler for PageViewState {
    type Event = PageEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        let count = self.link_rows.len();
        match event {
            TuiEvent::CursorDown => {
                if count > 0 {
                    self.selected_link = Some(self.selected_link.map_or(0, |i| (i + 1).min(count - 1)));
                    self.scroll_to_selected();
                } else {
                    self.scroll_state.scroll_down();
                }
                None
            }
            TuiEvent::CursorUp => {
                if count > 0 {
                    self.selected_link = Some(self.selected_link.map_or(0, |i| i.saturating_sub(1)));
                    self.scroll_to_selected();
                } else {
                    self.scroll_state.scroll_up();
                }
                None
            }
            TuiEvent::ScrollPageDown => {
                self.scroll_state.scroll_page_down();
                None
            }
            TuiEvent::ScrollPageUp => {
                self.scroll_state.scroll_page_up();
                None
            }
            TuiEvent::CursorHome => {
                self.scroll_state.scroll_to_top();
                None
            }
            TuiEvent::CursorEnd => {
                self.scroll_state.scroll_to_bottom();
                None
            }
            TuiEvent::Submit => self.selected_link.map(|index| PageEvent::FollowLink {
                index,
                modified: false,
            }),
            TuiEvent::SubmitModified => self.selected_link.map(|index| PageEvent::FollowLink {
                index,
                modified: true,
            }),
            _ => None,
        }
    }
}

pub struct PageView<'a> {
    pub document: Option<&'a Document>,
    pub state: &'a mut PageViewState,
    pub focused: bool,
}

fn wrap_into(lines: &mut Vec<Line<'static>>, text: &str, width: usize, style: Style) {
    for piece in textwrap::wrap(text, width.max(1)) {
        lines.push(Line::from(Span::styled(piece.into_owned(), style)));
    }
}

impl PageView<'_> {
    fn build_lines(&mut self, width: usize) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        self.state.link_rows.clear();

        let Some(document) = self.document else {
            lines.push(Line::from(Span::styled(
                "Nothing loaded yet.",
                Style::default().add_modifier(Modifier::DIM),
            )));
            return lines;
        };

        if !document.title.is_empty() {
            wrap_into(
                &mut lines,
                &document.title,
                width,
                Style::default().add_modifier(Modifier::BOLD),
            );
            lines.push(Line::default());
        }
        if let Some(error) = &document.error {
            wrap_into(&mut lines, error, width, Style::default().fg(Color::Red));
            lines.push(Line::default());
        }
        for block in &document.blocks {
            wrap_into(&mut lines, block, width, Style::default());
            lines.push(Line::default());
        }

        if !document.links.is_empty() {
            lines.push(Line::from(Span::styled(
                "── Links ──",
                Style::default().add_modifier(Modifier::DIM),
            )));
        }
        for (index, link) in document.links.iter().enumerate() {
            let selected = self.state.selected_link == Some(index);
            let style = if selected {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default().fg(Color::Blue)
            };
            let text = if link.text.is_empty() { &link.href } else { &link.text };
            let target = link.url.as_deref().unwrap_or(&link.href);

            self.state.link_rows.push(lines.len() as u16);
            lines.push(Line::from(vec![
                Span::styled(format!("[{index}] "), Style::default().add_modifier(Modifier::DIM)),
                Span::styled(text.clone(), style),
                Span::styled(format!("  {target}"), Style::default().add_modifier(Modifier::DIM)),
            ]));
        }
        lines
    }
}

impl Component for PageView<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let border_style = if self.focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(border_style);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        // One column for the scrollbar.
        let content_width = inner.width.saturating_sub(1);
        let lines = self.build_lines(content_width as usize);
        let height = lines.len().min(u16::MAX as usize) as u16;
        self.state.viewport_height = inner.height;

        let mut scroll_view = ScrollView::new(Size::new(content_width, height))
            .vertical_scrollbar_visibility(ScrollbarVisibility::Automatic)
            .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);
        scroll_view.render_widget(
            Paragraph::new(lines),
            Rect::new(0, 0, content_width, height),
        );
        frame.render_stateful_widget(scroll_view, inner, &mut self.state.scroll_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::document::Link;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn document() -> Document {
        Document {
            url: "https://site.test/".into(),
            title: "Site".into(),
            blocks: vec!["Hello world".into()],
            links: vec![
                Link {
                    text: "First".into(),
                    href: "/a".into(),
                    url: Some("https://site.test/a".into()),
                    target: None,
                    rel: None,
                },
                Link {
                    text: String::new(),
                    href: "/b".into(),
                    url: Some("https://site.test/b".into()),
                    target: None,
                    rel: None,
                },
            ],
            error: None,
        }
    }

    fn render(doc: Option<&Document>, state: &mut PageViewState) -> String {
        let backend = TestBackend::new(60, 12);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| {
                PageView {
                    document: doc,
                    state,
                    focused: true,
                }
                .render(f, f.area())
            })
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_render_title_blocks_and_numbered_links() {
        let doc = document();
        let mut state = PageViewState::new();
        let text = render(Some(&doc), &mut state);
        assert!(text.contains("Site"));
        assert!(text.contains("Hello world"));
        assert!(text.contains("[0] First"));
        assert!(text.contains("[1] /b"));
        assert_eq!(state.link_count(), 2);
    }

    #[test]
    fn test_render_empty_state() {
        let mut state = PageViewState::new();
        let text = render(None, &mut state);
        assert!(text.contains("Nothing loaded yet."));
    }

    #[test]
    fn test_link_selection_and_follow() {
        let doc = document();
        let mut state = PageViewState::new();
        render(Some(&doc), &mut state);

        assert_eq!(state.handle_event(&TuiEvent::Submit), None);
        state.handle_event(&TuiEvent::CursorDown);
        assert_eq!(state.selected_link, Some(0));
        state.handle_event(&TuiEvent::CursorDown);
        state.handle_event(&TuiEvent::CursorDown);
        assert_eq!(state.selected_link, Some(1));
        assert_eq!(
            state.handle_event(&TuiEvent::SubmitModified),
            Some(PageEvent::FollowLink {
                index: 1,
                modified: true
            })
        );
        state.handle_event(&TuiEvent::CursorUp);
        assert_eq!(
            state.handle_event(&TuiEvent::Submit),
            Some(PageEvent::FollowLink {
                index: 0,
                modified: false
            })
        );
    }

    #[test]
    fn test_track_resets_selection_on_new_document() {
        let first = Arc::new(document());
        let mut state = PageViewState::new();
        state.track(Some(&first));
        state.selected_link = Some(1);
        state.track(Some(&first));
        assert_eq!(state.selected_link, Some(1));

        let second = Arc::new(first.with_url("https://site.test/#top"));
        state.track(Some(&second));
        assert_eq!(state.selected_link, None);
    }
}
