//! # StatusBar Component
//!
//! Bottom line: status message on the left, key hints on the right.
//! Purely presentational; all data arrives as props.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::Span;
use ratatui::widgets::Paragraph;

use crate::tui::component::Component;

const HINTS: &str = "Tab focus · ^L address · Alt←/→ history · ^T new · ^W close · ^Q quit";

pub struct StatusBar<'a> {
    pub status_message: &'a str,
    pub tab_count: usize,
}

impl Component for StatusBar<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let left = format!(" {} · {} tabs", self.status_message, self.tab_count);
        let hints_width = (HINTS.chars().count() as u16 + 1).min(area.width / 2);
        let [left_area, right_area] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(hints_width)]).areas(area);

        frame.render_widget(Span::raw(left), left_area);
        frame.render_widget(
            Paragraph::new(Span::styled(HINTS, Style::default().add_modifier(Modifier::DIM)))
                .right_aligned(),
            right_area,
        );
    }
}
