//! # Application State
//!
//! Core browsing state for Arbor. This module contains domain logic only -
//! no TUI-specific types. Presentation state lives in the `tui` module.
//!
//! ```text
//! App
//! ├── store: TabStore                  // the tab tree (single writer)
//! ├── bridge: NavigationBridge         // one surface per tab + flags
//! ├── factory: Box<dyn SurfaceFactory> // builds surfaces on mount
//! ├── address: String                  // address bar text
//! ├── navigation: NavigationState      // back/forward/loading of active tab
//! ├── status_message: String           // status bar text
//! └── home_url: String                 // target of "home" and new roots
//! ```
//!
//! State changes only happen through `update(state, action)` in action.rs.

use std::sync::mpsc::Sender;

use crate::core::bridge::NavigationBridge;
use crate::core::config::ResolvedConfig;
use crate::core::surface::{NavigationState, SurfaceEnvelope, SurfaceFactory};
use crate::core::tree::{TabId, TabStore};

pub struct App {
    pub store: TabStore,
    pub bridge: NavigationBridge,
    factory: Box<dyn SurfaceFactory>,
    pub address: String,
    pub navigation: NavigationState,
    pub status_message: String,
    pub home_url: String,
    /// The (tab, url) pair the address bar was last synced to.
    shown: Option<(TabId, String)>,
}

impl App {
    pub fn new(
        config: &ResolvedConfig,
        factory: Box<dyn SurfaceFactory>,
        events: Sender<SurfaceEnvelope>,
    ) -> Self {
        let mut store = TabStore::new(config.home_url.clone());
        if let (Some(start), Some(root)) = (&config.start_url, store.active_tab_id()) {
            store.update_tab_url(root, start.clone());
        }

        let mut app = Self {
            store,
            bridge: NavigationBridge::new(events, config.muted_by_default),
            factory,
            address: String::new(),
            navigation: NavigationState::default(),
            status_message: String::from("Welcome to Arbor!"),
            home_url: config.home_url.clone(),
            shown: None,
        };
        app.reconcile();
        app
    }

    pub fn active_tab_id(&self) -> Option<TabId> {
        self.store.active_tab_id()
    }

    /// Mounts and unmounts surfaces to match the current tree, then syncs the
    /// address bar and navigation state with the active tab.
    pub fn reconcile(&mut self) {
        let snapshot = self.store.snapshot();
        self.bridge.reconcile(&snapshot, self.factory.as_ref());

        let Some(active) = snapshot.active() else {
            self.shown = None;
            self.address.clear();
            self.navigation = NavigationState::default();
            return;
        };

        let tab_changed = self.shown.as_ref().is_none_or(|(id, _)| *id != active.id);
        let url_changed = self.shown.as_ref().is_none_or(|(_, url)| *url != active.url);
        if tab_changed {
            self.navigation = self
                .bridge
                .navigation_state(active.id)
                .unwrap_or_default();
        }
        if tab_changed || url_changed {
            self.address = active.url.clone();
            self.shown = Some((active.id, active.url.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::core::config::ResolvedConfig;
    use crate::test_support::{FakeSurfaceFactory, TEST_HOME, test_app};

    #[test]
    fn test_app_new_defaults() {
        let (app, _factory, _rx) = test_app();
        assert_eq!(app.status_message, "Welcome to Arbor!");
        assert_eq!(app.address, TEST_HOME);
        assert_eq!(app.store.state().len(), 1);
        assert!(app.bridge.is_attached(app.active_tab_id().unwrap()));
    }

    #[test]
    fn test_start_url_replaces_home_on_first_root() {
        let (tx, _rx) = std::sync::mpsc::channel();
        let config = ResolvedConfig {
            home_url: TEST_HOME.to_string(),
            start_url: Some("https://start.test/".to_string()),
            ..ResolvedConfig::default()
        };
        let factory = FakeSurfaceFactory::default();
        let app = super::App::new(&config, Box::new(factory.clone()), tx);
        let root = app.active_tab_id().unwrap();
        assert_eq!(app.store.state().get(root).unwrap().url, "https://start.test/");
        assert_eq!(app.address, "https://start.test/");
        assert_eq!(app.home_url, TEST_HOME);
    }
}
