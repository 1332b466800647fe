//! # TabTree Component
//!
//! Left pane showing the tab forest, one row per visible node.
//!
//! ## Architecture
//!
//! `TabTree` is a transient component (created each frame) that wraps
//! `&'a mut TabTreeState` (persistent selection) and a tree snapshot (props).
//! During render it caches the ids of the visible rows so key handling can
//! map the selection back to a tab without touching the snapshot.
//!
//! ## Keys (when focused)
//!
//! - Up/Down: move selection
//! - Enter: activate selected tab
//! - Space: expand/collapse
//! - `x`: close tab, `X`: close tab and its subtree
//! - `n`: new root tab

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, List, ListItem, ListState};
use unicode_width::UnicodeWidthStr;

use crate::core::tree::{TabId, TreeState};
use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

const INDENT: &str = "  ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    Activate(TabId),
    ToggleExpanded(TabId),
    Close(TabId),
    CloseSubtree(TabId),
    NewRoot,
}

/// Selection state for the tab tree. Persisted in `TuiState`.
#[derive(Debug, Default)]
pub struct TabTreeState {
    pub selected: usize,
    /// Ids of the rows drawn in the last frame, top to bottom.
    rows: Vec<TabId>,
    list_state: ListState,
}

impl TabTreeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_id(&self) -> Option<TabId> {
        self.rows.get(self.selected).copied()
    }

    /// Moves the selection onto `id` if it is visible.
    pub fn select(&mut self, id: TabId) {
        if let Some(index) = self.rows.iter().position(|row| *row == id) {
            self.selected = index;
        }
    }

    /// Refreshes the row cache from a snapshot without rendering.
    pub fn sync_rows(&mut self, tree: &TreeState) {
        self.rows = tree.visible_rows().iter().map(|row| row.node.id).collect();
        if self.selected >= self.rows.len() {
            self.selected = self.rows.len().saturating_sub(1);
        }
    }
}

impl EventHandler for TabTreeState {
    type Event = TreeEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::CursorUp => {
                self.selected = self.selected.saturating_sub(1);
                None
            }
            TuiEvent::CursorDown => {
                if self.selected + 1 < self.rows.len() {
                    self.selected += 1;
                }
                None
            }
            TuiEvent::CursorHome => {
                self.selected = 0;
                None
            }
            TuiEvent::CursorEnd => {
                self.selected = self.rows.len().saturating_sub(1);
                None
            }
            TuiEvent::Submit => self.selected_id().map(TreeEvent::Activate),
            TuiEvent::InputChar(' ') => self.selected_id().map(TreeEvent::ToggleExpanded),
            TuiEvent::InputChar('x') => self.selected_id().map(TreeEvent::Close),
            TuiEvent::InputChar('X') => self.selected_id().map(TreeEvent::CloseSubtree),
            TuiEvent::InputChar('n') => Some(TreeEvent::NewRoot),
            _ => None,
        }
    }
}

pub struct TabTree<'a> {
    pub tree: &'a TreeState,
    pub state: &'a mut TabTreeState,
    pub focused: bool,
}

impl<'a> TabTree<'a> {
    pub fn new(tree: &'a TreeState, state: &'a mut TabTreeState, focused: bool) -> Self {
        Self {
            tree,
            state,
            focused,
        }
    }
}

/// `▾`/`▸` for nodes with children, blank otherwise.
fn expand_marker(has_children: bool, expanded: bool) -> &'static str {
    match (has_children, expanded) {
        (false, _) => " ",
        (true, true) => "▾",
        (true, false) => "▸",
    }
}

/// Truncates `label` to `width` display columns, ending with `…` if cut.
fn fit(label: &str, width: usize) -> String {
    if label.width() <= width {
        return label.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in label.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

impl Component for TabTree<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        self.state.sync_rows(self.tree);
        let rows = self.tree.visible_rows();
        let inner_width = area.width.saturating_sub(2) as usize;

        let items: Vec<ListItem> = rows
            .iter()
            .map(|row| {
                let node = row.node;
                let prefix = format!(
                    "{}{} ",
                    INDENT.repeat(row.depth),
                    expand_marker(!node.children.is_empty(), node.is_expanded)
                );
                let label_width = inner_width.saturating_sub(prefix.width());
                let style = if node.is_active {
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(vec![
                    Span::styled(prefix, Style::default().add_modifier(Modifier::DIM)),
                    Span::styled(fit(node.label(), label_width), style),
                ]))
            })
            .collect();

        let border_style = if self.focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(border_style)
            .title(format!("Tabs ({})", self.tree.len()));

        let highlight = if self.focused {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        let list = List::new(items).block(block).highlight_style(highlight);

        self.state
            .list_state
            .select((!self.state.rows.is_empty()).then_some(self.state.selected));
        frame.render_stateful_widget(list, area, &mut self.state.list_state);
    }
}
