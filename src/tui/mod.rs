//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the UI,
//! and translates keyboard events into core::Action values.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Event Loop
//!
//! One thread owns `App`. Each turn it draws (if something changed), polls
//! the terminal, then drains the surface event channel into `update()`.
//! Fetch tasks run on the tokio runtime and only ever talk to the loop
//! through that channel.
//!
//! ## Redraw Strategy
//!
//! - **Loading**: the active tab is loading, redraw every ~80ms for the spinner.
//! - **Idle**: sleep up to 250ms, redraw only on input or surface events.

mod component;
pub mod components;
pub mod event;
mod ui;

use log::{debug, info};
use std::io::stdout;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::cursor::{SetCursorStyle, Show};
use crossterm::event::{DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture};
use crossterm::execute;

use crate::core::action::{Action, Effect, update};
use crate::core::config::ResolvedConfig;
use crate::core::state::App;
use crate::surface::HttpSurfaceFactory;
use crate::tui::component::EventHandler;
use crate::tui::components::{
    AddressBarState, AddressEvent, PageEvent, PageViewState, TabTreeState, TreeEvent,
};
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};

/// Which pane receives pane-local keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Tree,
    Address,
    Page,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Tree => Focus::Address,
            Focus::Address => Focus::Page,
            Focus::Page => Focus::Tree,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::Tree => Focus::Page,
            Focus::Address => Focus::Tree,
            Focus::Page => Focus::Address,
        }
    }
}

/// TUI-specific presentation state (not part of core browsing logic)
pub struct TuiState {
    pub focus: Focus,
    pub tree: TabTreeState,
    pub address: AddressBarState,
    pub page: PageViewState,
    pub tree_width: u16,
}

impl TuiState {
    pub fn new(tree_width: u16) -> Self {
        Self {
            focus: Focus::Page,
            tree: TabTreeState::new(),
            address: AddressBarState::new(),
            page: PageViewState::new(),
            tree_width,
        }
    }

    fn set_focus(&mut self, focus: Focus, app: &App) {
        if focus == Focus::Address && self.focus != Focus::Address {
            self.address.begin(&app.address);
        }
        if focus == Focus::Tree
            && let Some(active) = app.active_tab_id()
        {
            self.tree.sync_rows(app.store.state());
            self.tree.select(active);
        }
        self.focus = focus;
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        execute!(
            stdout(),
            EnableMouseCapture,
            EnableBracketedPaste,
            Show,
            SetCursorStyle::SteadyBlock,
        )?;
        info!("Terminal modes enabled (mouse, bracketed paste, steady block cursor)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), DisableMouseCapture, DisableBracketedPaste);
    }
}

/// Routes one terminal event: global shortcuts first, then the focused pane.
pub fn handle_event(app: &mut App, tui: &mut TuiState, event: TuiEvent) -> Effect {
    let action = match event {
        TuiEvent::ForceQuit => Some(Action::Quit),
        TuiEvent::GoBack => Some(Action::GoBack),
        TuiEvent::GoForward => Some(Action::GoForward),
        TuiEvent::Reload => Some(Action::Reload),
        TuiEvent::GoHome => Some(Action::GoHome),
        TuiEvent::ToggleMute => Some(Action::ToggleMute),
        TuiEvent::NewRootTab => Some(Action::NewRootTab),
        TuiEvent::CloseTab => app.active_tab_id().map(Action::CloseTab),
        TuiEvent::FocusNext => {
            tui.set_focus(tui.focus.next(), app);
            None
        }
        TuiEvent::FocusPrev => {
            tui.set_focus(tui.focus.prev(), app);
            None
        }
        TuiEvent::FocusAddress => {
            tui.set_focus(Focus::Address, app);
            None
        }
        TuiEvent::Resize => None,
        event => match tui.focus {
            Focus::Tree => tui.tree.handle_event(&event).map(|e| match e {
                TreeEvent::Activate(id) => Action::ActivateTab(id),
                TreeEvent::ToggleExpanded(id) => Action::ToggleExpanded(id),
                TreeEvent::Close(id) => Action::CloseTab(id),
                TreeEvent::CloseSubtree(id) => Action::CloseSubtree(id),
                TreeEvent::NewRoot => Action::NewRootTab,
            }),
            Focus::Address => match tui.address.handle_event(&event) {
                Some(AddressEvent::Changed(text)) => Some(Action::SetAddress(text)),
                Some(AddressEvent::Submit(text)) => {
                    update(app, Action::SetAddress(text));
                    tui.focus = Focus::Page;
                    Some(Action::SubmitAddress)
                }
                Some(AddressEvent::Cancel) => {
                    tui.focus = Focus::Page;
                    let restored = app.active_tab_id().and_then(|id| {
                        app.store.state().get(id).map(|node| node.url.clone())
                    });
                    restored.map(Action::SetAddress)
                }
                None => None,
            },
            Focus::Page => tui.page.handle_event(&event).map(|e| match e {
                PageEvent::FollowLink { index, modified } => Action::ActivateLink { index, modified },
            }),
        },
    };

    match action {
        Some(action) => {
            debug!("Dispatching {action:?}");
            update(app, action)
        }
        None => Effect::None,
    }
}

pub fn run(config: ResolvedConfig) -> std::io::Result<()> {
    let runtime = tokio::runtime::Handle::try_current().map_err(std::io::Error::other)?;
    let factory = HttpSurfaceFactory::new(&config, runtime).map_err(std::io::Error::other)?;

    // Channel for events from surfaces (fetch tasks post into it)
    let (tx, rx) = mpsc::channel();
    let mut app = App::new(&config, Box::new(factory), tx);
    let mut tui = TuiState::new(config.tree_width);

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new();

    let start_time = Instant::now();
    let mut needs_redraw = true; // Force first frame

    'outer: loop {
        let animating = app.navigation.is_loading;
        if animating {
            needs_redraw = true;
        }

        if needs_redraw {
            let spinner_frame = (start_time.elapsed().as_secs_f32() * 12.0) as usize;
            terminal.draw(|f| ui::draw_ui(f, &app, &mut tui, spinner_frame))?;
            needs_redraw = false;
        }

        let timeout = if animating {
            Duration::from_millis(80)
        } else {
            Duration::from_millis(250)
        };
        let first_event = poll_event_timeout(timeout);
        if first_event.is_some() {
            needs_redraw = true;
        }

        // Process first event + drain ALL pending events before next draw
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            if handle_event(&mut app, &mut tui, event) == Effect::Quit {
                break 'outer;
            }
        }

        // Surface events (loads, navigations, page messages)
        while let Ok(envelope) = rx.try_recv() {
            needs_redraw = true;
            debug!("Event loop received: {:?}", envelope.event);
            if update(&mut app, Action::Surface(envelope)) == Effect::Quit {
                break 'outer;
            }
        }
    }

    info!("Arbor shutting down with {} tabs open", app.store.state().len());
    ratatui::restore();
    Ok(())
}
