//! # Actions
//!
//! Everything that can happen in Arbor becomes an `Action`.
//! User picks a tab in the tree? That's `Action::ActivateTab(id)`.
//! A page finishes loading? That's `Action::Surface(envelope)`.
//!
//! The `update()` function takes the current state and an action, applies
//! it through the tab store or the navigation bridge, then reconciles
//! mounted surfaces against the new tree.
//!
//! ```text
//! State + Action  →  update()  →  New State (+ Effect)
//! ```

use log::debug;

use crate::core::address::ensure_http_url;
use crate::core::bridge::BridgeUpdate;
use crate::core::state::App;
use crate::core::surface::SurfaceEnvelope;
use crate::core::tree::{HOME_TITLE, TabId};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // Tree
    NewRootTab,
    ActivateTab(TabId),
    CloseTab(TabId),
    CloseSubtree(TabId),
    ToggleExpanded(TabId),

    // Toolbar (act on the active tab)
    SetAddress(String),
    SubmitAddress,
    GoBack,
    GoForward,
    Reload,
    GoHome,
    ToggleMute,

    // Page content of the active tab
    ActivateLink { index: usize, modified: bool },

    // Surface host
    Surface(SurfaceEnvelope),

    Quit,
}

/// What the event loop should do after an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    Quit,
}

pub fn update(app: &mut App, action: Action) -> Effect {
    match action {
        Action::NewRootTab => {
            let home = app.home_url.clone();
            app.store.create_tab(None, home, Some(HOME_TITLE.to_string()));
        }
        Action::ActivateTab(id) => app.store.activate_tab(id),
        Action::CloseTab(id) => {
            app.store.close_tab(id);
        }
        Action::CloseSubtree(id) => {
            app.store.close_subtree(id);
        }
        Action::ToggleExpanded(id) => app.store.toggle_expanded(id),

        Action::SetAddress(text) => {
            app.address = text;
            return Effect::None;
        }
        Action::SubmitAddress => {
            let Some(url) = ensure_http_url(&app.address) else {
                debug!("ignoring empty address submission");
                return Effect::None;
            };
            navigate_active(app, url);
        }
        Action::GoHome => {
            let home = app.home_url.clone();
            navigate_active(app, home);
        }
        Action::GoBack => {
            if let Some(id) = app.active_tab_id() {
                app.bridge.go_back(id);
            }
        }
        Action::GoForward => {
            if let Some(id) = app.active_tab_id() {
                app.bridge.go_forward(id);
            }
        }
        Action::Reload => {
            if let Some(id) = app.active_tab_id() {
                app.bridge.reload(id);
            }
        }
        Action::ToggleMute => {
            if let Some(id) = app.active_tab_id() {
                let muted = app.bridge.surface(id).is_some_and(|s| s.is_muted());
                if app.bridge.set_muted(id, !muted) {
                    app.status_message = if muted { "Unmuted" } else { "Muted" }.to_string();
                }
            }
        }

        Action::ActivateLink { index, modified } => {
            if let Some(id) = app.active_tab_id() {
                app.bridge.activate_link(id, index, modified);
            }
        }

        Action::Surface(envelope) => {
            let updates = app.bridge.handle(&mut app.store, envelope);
            apply_bridge_updates(app, updates);
        }

        Action::Quit => return Effect::Quit,
    }

    app.reconcile();
    Effect::None
}

/// Programmatic load in the active tab, then record the URL on the node.
/// Nothing happens when the tab has no surface.
fn navigate_active(app: &mut App, url: String) {
    let Some(id) = app.active_tab_id() else {
        return;
    };
    if !app.bridge.load_url(id, &url) {
        return;
    }
    app.store.update_tab_url(id, url);
}

fn apply_bridge_updates(app: &mut App, updates: Vec<BridgeUpdate>) {
    let active = app.active_tab_id();
    for update in updates {
        match update {
            BridgeUpdate::NavigationState { tab_id, state } if Some(tab_id) == active => {
                app.navigation = state;
            }
            BridgeUpdate::ChildOpened { url, .. } => {
                app.status_message = format!("Opened {url}");
            }
            _ => {}
        }
    }
}
