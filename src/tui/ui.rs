use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};

use crate::core::state::App;
use crate::tui::component::Component;
use crate::tui::components::{PageView, StatusBar, TabTree, Toolbar};
use crate::tui::{Focus, TuiState};

/// Draws the whole screen:
///
/// ```text
/// ┌ Tabs ─────┐┌ toolbar ───────────────┐
/// │           │└────────────────────────┘
/// │  tree     │┌ page ──────────────────┐
/// │           ││                        │
/// └───────────┘└────────────────────────┘
///  status line
/// ```
pub fn draw_ui(frame: &mut Frame, app: &App, tui: &mut TuiState, spinner_frame: usize) {
    use Constraint::{Length, Min};

    let [body_area, status_area] = Layout::vertical([Min(0), Length(1)]).areas(frame.area());
    let tree_width = tui.tree_width.min(body_area.width / 2);
    let [tree_area, main_area] = Layout::horizontal([Length(tree_width), Min(0)]).areas(body_area);
    let [toolbar_area, page_area] = Layout::vertical([Length(3), Min(0)]).areas(main_area);

    let tree = app.store.snapshot();
    TabTree::new(&tree, &mut tui.tree, tui.focus == Focus::Tree).render(frame, tree_area);

    let surface = app.active_tab_id().and_then(|id| app.bridge.surface(id));
    let document = surface.and_then(|s| s.document());
    tui.page.track(document.as_ref());

    Toolbar {
        address: &app.address,
        navigation: app.navigation,
        muted: surface.is_some_and(|s| s.is_muted()),
        editing: (tui.focus == Focus::Address).then_some(&tui.address),
        spinner_frame,
    }
    .render(frame, toolbar_area);

    PageView {
        document: document.as_deref(),
        state: &mut tui.page,
        focused: tui.focus == Focus::Page,
    }
    .render(frame, page_area);

    StatusBar {
        status_message: &app.status_message,
        tab_count: tree.len(),
    }
    .render(frame, status_area);
}
