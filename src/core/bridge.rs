//! # Navigation Bridge
//!
//! Owns one surface per mounted tab and is the only code that turns surface
//! events into tree updates.
//!
//! Per-tab flags live in a side-table here, never on the surface:
//!
//! - `ready`: the surface finished its first dom-ready handshake.
//! - `programmatic`: the next `WillNavigate` was caused by us (address bar,
//!   back/forward, reload, home) and must be let through.
//!
//! A `WillNavigate` that arrives after `ready` with no `programmatic` flag is
//! a link the user followed inside the page. It is cancelled and reopened as
//! a child tab instead. Page instrumentation reporting `link-clicked` takes
//! the same path.
//!
//! ```text
//!   WillNavigate(url)
//!        │
//!   ready && !programmatic ?
//!        ├── no  ─▶ clear flag, proceed
//!        └── yes ─▶ cancel, create_tab(parent = tab, url)
//! ```

use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::mpsc::Sender;

use crate::core::address::ensure_http_url;
use crate::core::message::{PAGE_EVENT_CHANNEL, PageMessage};
use crate::core::surface::{
    EventSink, NavigationState, Surface, SurfaceEnvelope, SurfaceEvent, SurfaceFactory,
    Subscription,
};
use crate::core::tree::{LOADING_TITLE, MetadataPatch, TabId, TabStore, TreeState};

/// Bridge-owned flags for one mounted surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeState {
    pub ready: bool,
    pub programmatic: bool,
}

/// What changed as a result of handling one surface event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeUpdate {
    NavigationState {
        tab_id: TabId,
        state: NavigationState,
    },
    UrlChanged {
        tab_id: TabId,
        url: String,
    },
    MetadataChanged {
        tab_id: TabId,
    },
    ChildOpened {
        parent: TabId,
        child: TabId,
        url: String,
    },
}

struct SurfaceSlot {
    surface: Box<dyn Surface>,
    subscription: Subscription,
    state: BridgeState,
}

pub struct NavigationBridge {
    slots: HashMap<TabId, SurfaceSlot>,
    events: Sender<SurfaceEnvelope>,
    next_generation: u64,
    muted_by_default: bool,
}

impl NavigationBridge {
    pub fn new(events: Sender<SurfaceEnvelope>, muted_by_default: bool) -> Self {
        Self {
            slots: HashMap::new(),
            events,
            next_generation: 0,
            muted_by_default,
        }
    }

    pub fn is_attached(&self, tab_id: TabId) -> bool {
        self.slots.contains_key(&tab_id)
    }

    pub fn attached_count(&self) -> usize {
        self.slots.len()
    }

    pub fn state_of(&self, tab_id: TabId) -> Option<BridgeState> {
        self.slots.get(&tab_id).map(|slot| slot.state)
    }

    pub fn surface(&self, tab_id: TabId) -> Option<&dyn Surface> {
        self.slots.get(&tab_id).map(|slot| slot.surface.as_ref())
    }

    /// Navigation state of a ready surface. `None` before the handshake.
    pub fn navigation_state(&self, tab_id: TabId) -> Option<NavigationState> {
        let slot = self.slots.get(&tab_id)?;
        slot.state
            .ready
            .then(|| NavigationState::of(slot.surface.as_ref()))
    }

    // ------------------------------------------------------------------------
    // Mount / unmount
    // ------------------------------------------------------------------------

    /// Mounts surfaces for tabs that lack one and unmounts surfaces whose tab
    /// is gone.
    pub fn reconcile(&mut self, tree: &TreeState, factory: &dyn SurfaceFactory) {
        let stale: Vec<TabId> = self
            .slots
            .keys()
            .filter(|id| !tree.nodes.contains_key(id))
            .copied()
            .collect();
        for id in stale {
            self.detach(id);
        }

        for node in tree.flatten() {
            if !self.slots.contains_key(&node.id) {
                self.attach(node.id, &node.url, factory);
            }
        }
    }

    /// Creates a surface for `tab_id`, subscribes to it and starts loading
    /// `url`. The initial load happens before `ready`, so it is never
    /// mistaken for a user navigation.
    pub fn attach(&mut self, tab_id: TabId, url: &str, factory: &dyn SurfaceFactory) {
        if self.slots.contains_key(&tab_id) {
            return;
        }
        self.next_generation += 1;
        let (sink, subscription) =
            EventSink::pair(tab_id, self.next_generation, self.events.clone());

        let mut surface = factory.create(tab_id);
        surface.subscribe(sink);
        surface.load_url(url);

        debug!("attached surface to {tab_id} (generation {})", subscription.generation());
        self.slots.insert(
            tab_id,
            SurfaceSlot {
                surface,
                subscription,
                state: BridgeState::default(),
            },
        );
    }

    /// Unsubscribes and drops the surface for `tab_id`. Events it already
    /// queued are discarded when they arrive.
    pub fn detach(&mut self, tab_id: TabId) {
        let Some(mut slot) = self.slots.remove(&tab_id) else {
            return;
        };
        slot.state.ready = false;
        slot.subscription.dispose();
        debug!("detached surface from {tab_id}");
    }

    // ------------------------------------------------------------------------
    // Inbound events
    // ------------------------------------------------------------------------

    /// Applies one surface event to the store.
    pub fn handle(&mut self, store: &mut TabStore, envelope: SurfaceEnvelope) -> Vec<BridgeUpdate> {
        let SurfaceEnvelope {
            tab_id,
            generation,
            event,
        } = envelope;

        let Some(slot) = self.slots.get_mut(&tab_id) else {
            debug!("dropping {event:?} for unmounted tab {tab_id}");
            return Vec::new();
        };
        if slot.subscription.generation() != generation {
            debug!("dropping stale {event:?} for {tab_id} (generation {generation})");
            return Vec::new();
        }

        let mut updates = Vec::new();
        match event {
            SurfaceEvent::Ready => {
                slot.state.ready = true;
                slot.surface.send_init(tab_id);
                slot.surface.set_muted(self.muted_by_default);
                if let Some(url) = slot.surface.current_url() {
                    store.update_tab_url(tab_id, url.clone());
                    updates.push(BridgeUpdate::UrlChanged { tab_id, url });
                }
                updates.push(report(tab_id, slot));
            }
            SurfaceEvent::WillNavigate { url } => {
                if url.is_empty() {
                    slot.surface.cancel(&url);
                } else if !slot.state.ready || slot.state.programmatic {
                    slot.state.programmatic = false;
                    slot.surface.proceed(&url);
                } else {
                    debug!("intercepted user navigation in {tab_id} to {url}");
                    slot.surface.cancel(&url);
                    updates.push(open_child(store, tab_id, &url));
                }
            }
            SurfaceEvent::DidNavigate { url } | SurfaceEvent::DidNavigateInPage { url } => {
                if slot.state.ready {
                    let url = slot.surface.current_url().unwrap_or(url);
                    store.update_tab_url(tab_id, url.clone());
                    updates.push(BridgeUpdate::UrlChanged { tab_id, url });
                    updates.push(report(tab_id, slot));
                }
            }
            SurfaceEvent::DidStartLoading | SurfaceEvent::DidStopLoading => {
                if slot.state.ready {
                    updates.push(report(tab_id, slot));
                }
            }
            SurfaceEvent::DidFailLoad { url, reason } => {
                warn!("{tab_id} failed to load {url}: {reason}");
                if slot.state.ready {
                    updates.push(report(tab_id, slot));
                }
            }
            SurfaceEvent::Message { channel, payload } => {
                if channel != PAGE_EVENT_CHANNEL {
                    debug!("ignoring message on channel {channel:?} from {tab_id}");
                    return updates;
                }
                match PageMessage::from_payload(&payload) {
                    Ok(message) => handle_page_message(store, tab_id, slot, message, &mut updates),
                    Err(e) => debug!("malformed page message from {tab_id}: {e}"),
                }
            }
        }
        updates
    }

    // ------------------------------------------------------------------------
    // Outbound commands
    // ------------------------------------------------------------------------

    /// Loads `url` in the tab's surface. Returns false when nothing is mounted.
    pub fn load_url(&mut self, tab_id: TabId, url: &str) -> bool {
        let Some(slot) = self.slots.get_mut(&tab_id) else {
            return false;
        };
        slot.state.programmatic = true;
        slot.surface.load_url(url);
        true
    }

    pub fn go_back(&mut self, tab_id: TabId) -> bool {
        let Some(slot) = self.slots.get_mut(&tab_id) else {
            return false;
        };
        if !slot.surface.can_go_back() {
            return false;
        }
        slot.state.programmatic = true;
        slot.surface.go_back();
        true
    }

    pub fn go_forward(&mut self, tab_id: TabId) -> bool {
        let Some(slot) = self.slots.get_mut(&tab_id) else {
            return false;
        };
        if !slot.surface.can_go_forward() {
            return false;
        }
        slot.state.programmatic = true;
        slot.surface.go_forward();
        true
    }

    pub fn reload(&mut self, tab_id: TabId) -> bool {
        let Some(slot) = self.slots.get_mut(&tab_id) else {
            return false;
        };
        if slot.surface.current_url().is_none() {
            return false;
        }
        slot.state.programmatic = true;
        slot.surface.reload();
        true
    }

    pub fn set_muted(&mut self, tab_id: TabId, muted: bool) -> bool {
        let Some(slot) = self.slots.get_mut(&tab_id) else {
            return false;
        };
        slot.surface.set_muted(muted);
        true
    }

    /// Forwards a user activation of a link inside the rendered page.
    pub fn activate_link(&mut self, tab_id: TabId, index: usize, modified: bool) -> bool {
        let Some(slot) = self.slots.get_mut(&tab_id) else {
            return false;
        };
        slot.surface.activate_link(index, modified);
        true
    }
}

fn report(tab_id: TabId, slot: &SurfaceSlot) -> BridgeUpdate {
    BridgeUpdate::NavigationState {
        tab_id,
        state: NavigationState::of(slot.surface.as_ref()),
    }
}

fn handle_page_message(
    store: &mut TabStore,
    tab_id: TabId,
    slot: &SurfaceSlot,
    message: PageMessage,
    updates: &mut Vec<BridgeUpdate>,
) {
    match message {
        PageMessage::LinkClicked { url, .. } => {
            updates.push(open_child(store, tab_id, &url));
        }
        PageMessage::Metadata { url, title, .. } => {
            store.update_tab_metadata(
                tab_id,
                MetadataPatch {
                    title,
                    url: Some(url),
                },
            );
            updates.push(BridgeUpdate::MetadataChanged { tab_id });
        }
        PageMessage::Navigation { url, .. } => {
            store.update_tab_url(tab_id, url.clone());
            updates.push(BridgeUpdate::UrlChanged { tab_id, url });
            if slot.state.ready {
                updates.push(report(tab_id, slot));
            }
        }
    }
}

/// Opens `url` as a child of `parent`. Both interception paths end here.
fn open_child(store: &mut TabStore, parent: TabId, url: &str) -> BridgeUpdate {
    let url = ensure_http_url(url).unwrap_or_else(|| url.to_string());
    let child = store.create_tab(Some(parent), url.clone(), Some(LOADING_TITLE.to_string()));
    info!("opened {url} as child {child} of {parent}");
    BridgeUpdate::ChildOpened { parent, child, url }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::PageMessage;
    use crate::test_support::{FakeSurfaceFactory, SurfaceCall};
    use serde_json::json;
    use std::sync::mpsc::{self, Receiver};

    const HOME: &str = "https://home.test/";

    struct Harness {
        store: TabStore,
        bridge: NavigationBridge,
        factory: FakeSurfaceFactory,
        rx: Receiver<SurfaceEnvelope>,
        root: TabId,
    }

    impl Harness {
        fn new() -> Self {
            let (tx, rx) = mpsc::channel();
            let store = TabStore::new(HOME);
            let root = store.active_tab_id().unwrap();
            let mut bridge = NavigationBridge::new(tx, true);
            let factory = FakeSurfaceFactory::default();
            bridge.reconcile(&store.snapshot(), &factory);
            Self {
                store,
                bridge,
                factory,
                rx,
                root,
            }
        }

        fn emit(&self, tab: TabId, event: SurfaceEvent) {
            assert!(self.factory.handle(tab).emit(event));
        }

        /// Drains queued events through the bridge.
        fn pump(&mut self) -> Vec<BridgeUpdate> {
            let mut updates = Vec::new();
            while let Ok(envelope) = self.rx.try_recv() {
                updates.extend(self.bridge.handle(&mut self.store, envelope));
            }
            updates
        }

        fn ready(&mut self, tab: TabId) {
            self.emit(tab, SurfaceEvent::Ready);
            self.pump();
        }

        fn children(&self, tab: TabId) -> Vec<TabId> {
            self.store.state().get(tab).unwrap().children.clone()
        }
    }

    #[test]
    fn test_reconcile_mounts_and_loads_initial_url() {
        let h = Harness::new();
        assert!(h.bridge.is_attached(h.root));
        let calls = h.factory.handle(h.root).calls();
        assert_eq!(calls, vec![SurfaceCall::LoadUrl(HOME.to_string())]);
        assert_eq!(h.bridge.state_of(h.root), Some(BridgeState::default()));
    }

    #[test]
    fn test_ready_sends_init_mutes_and_reports() {
        let mut h = Harness::new();
        h.factory.handle(h.root).set_url("https://home.test/landing");
        h.emit(h.root, SurfaceEvent::Ready);
        let updates = h.pump();

        let calls = h.factory.handle(h.root).calls();
        assert!(calls.contains(&SurfaceCall::SendInit(h.root)));
        assert!(calls.contains(&SurfaceCall::SetMuted(true)));
        assert!(h.bridge.state_of(h.root).unwrap().ready);
        assert_eq!(
            h.store.state().get(h.root).unwrap().url,
            "https://home.test/landing"
        );
        assert!(updates
            .iter()
            .any(|u| matches!(u, BridgeUpdate::NavigationState { tab_id, .. } if *tab_id == h.root)));
    }

    #[test]
    fn test_will_navigate_before_ready_is_allowed() {
        let mut h = Harness::new();
        h.emit(h.root, SurfaceEvent::WillNavigate { url: "https://x.test".into() });
        h.pump();
        assert!(h.children(h.root).is_empty());
        assert!(h
            .factory
            .handle(h.root)
            .calls()
            .contains(&SurfaceCall::Proceed("https://x.test".into())));
    }

    #[test]
    fn test_programmatic_load_does_not_spawn_child() {
        let mut h = Harness::new();
        h.ready(h.root);

        assert!(h.bridge.load_url(h.root, "https://next.test"));
        assert!(h.bridge.state_of(h.root).unwrap().programmatic);

        h.emit(h.root, SurfaceEvent::WillNavigate { url: "https://next.test".into() });
        h.factory.handle(h.root).set_url("https://next.test");
        h.emit(h.root, SurfaceEvent::DidNavigate { url: "https://next.test".into() });
        h.pump();

        assert!(h.children(h.root).is_empty());
        assert_eq!(h.store.state().len(), 1);
        assert_eq!(h.store.state().get(h.root).unwrap().url, "https://next.test");
        assert!(!h.bridge.state_of(h.root).unwrap().programmatic);
    }

    #[test]
    fn test_programmatic_flag_is_consumed_once() {
        let mut h = Harness::new();
        h.ready(h.root);
        h.bridge.reload(h.root);

        h.emit(h.root, SurfaceEvent::WillNavigate { url: HOME.into() });
        h.emit(h.root, SurfaceEvent::WillNavigate { url: "https://link.test".into() });
        h.pump();

        // first one consumed the flag, second one is a user navigation
        assert_eq!(h.children(h.root).len(), 1);
    }

    #[test]
    fn test_user_navigation_spawns_exactly_one_child() {
        let mut h = Harness::new();
        h.ready(h.root);

        h.emit(h.root, SurfaceEvent::WillNavigate { url: "https://link.test/a".into() });
        let updates = h.pump();

        let children = h.children(h.root);
        assert_eq!(children.len(), 1);
        let child = h.store.state().get(children[0]).unwrap();
        assert_eq!(child.parent_id, Some(h.root));
        assert_eq!(child.url, "https://link.test/a");
        assert_eq!(child.title, LOADING_TITLE);
        assert_eq!(h.store.active_tab_id(), Some(child.id));
        assert!(h
            .factory
            .handle(h.root)
            .calls()
            .contains(&SurfaceCall::Cancel("https://link.test/a".into())));
        assert!(updates.contains(&BridgeUpdate::ChildOpened {
            parent: h.root,
            child: child.id,
            url: "https://link.test/a".into(),
        }));
    }

    #[test]
    fn test_link_clicked_message_spawns_child() {
        let mut h = Harness::new();
        h.ready(h.root);
        let payload = PageMessage::LinkClicked {
            url: "sub.example.com".into(),
            tab_id: h.root.to_string(),
        }
        .to_payload();
        h.emit(
            h.root,
            SurfaceEvent::Message {
                channel: PAGE_EVENT_CHANNEL.into(),
                payload,
            },
        );
        h.pump();

        let children = h.children(h.root);
        assert_eq!(children.len(), 1);
        assert_eq!(
            h.store.state().get(children[0]).unwrap().url,
            "https://sub.example.com"
        );
    }

    #[test]
    fn test_duplicate_link_clicked_messages_are_not_deduplicated() {
        let mut h = Harness::new();
        h.ready(h.root);
        let payload = json!({"type": "link-clicked", "url": "https://dup.test", "tabId": h.root.to_string()});
        for _ in 0..2 {
            h.emit(
                h.root,
                SurfaceEvent::Message {
                    channel: PAGE_EVENT_CHANNEL.into(),
                    payload: payload.clone(),
                },
            );
        }
        h.pump();

        let children = h.children(h.root);
        assert_eq!(children.len(), 2);
        assert_ne!(children[0], children[1]);
    }

    #[test]
    fn test_native_and_instrumented_paths_both_open_a_child() {
        let mut h = Harness::new();
        h.ready(h.root);
        h.emit(
            h.root,
            SurfaceEvent::Message {
                channel: PAGE_EVENT_CHANNEL.into(),
                payload: json!({"type": "link-clicked", "url": "https://both.test", "tabId": ""}),
            },
        );
        h.emit(h.root, SurfaceEvent::WillNavigate { url: "https://both.test".into() });
        h.pump();

        // Known double-open when both interception paths fire for one click.
        assert_eq!(h.children(h.root).len(), 2);
    }

    #[test]
    fn test_metadata_message_updates_title_and_url() {
        let mut h = Harness::new();
        h.ready(h.root);
        h.emit(
            h.root,
            SurfaceEvent::Message {
                channel: PAGE_EVENT_CHANNEL.into(),
                payload: json!({"type": "metadata", "url": "https://home.test/x", "title": "Welcome", "tabId": ""}),
            },
        );
        h.pump();
        let node = h.store.state().get(h.root).unwrap();
        assert_eq!(node.title, "Welcome");
        assert_eq!(node.url, "https://home.test/x");
    }

    #[test]
    fn test_foreign_channel_and_malformed_payload_are_ignored() {
        let mut h = Harness::new();
        h.ready(h.root);
        let before = h.store.snapshot();
        h.emit(
            h.root,
            SurfaceEvent::Message {
                channel: "other".into(),
                payload: json!({"type": "link-clicked", "url": "https://x.test"}),
            },
        );
        h.emit(
            h.root,
            SurfaceEvent::Message {
                channel: PAGE_EVENT_CHANNEL.into(),
                payload: json!({"type": "link-clicked"}),
            },
        );
        h.pump();
        assert_eq!(*before, *h.store.snapshot());
    }

    #[test]
    fn test_did_navigate_before_ready_is_ignored() {
        let mut h = Harness::new();
        h.emit(h.root, SurfaceEvent::DidNavigate { url: "https://early.test".into() });
        let updates = h.pump();
        assert!(updates.is_empty());
        assert_eq!(h.store.state().get(h.root).unwrap().url, HOME);
    }

    #[test]
    fn test_loading_events_only_report_state() {
        let mut h = Harness::new();
        h.ready(h.root);
        let before = h.store.snapshot();
        h.factory.handle(h.root).set_loading(true);
        h.emit(h.root, SurfaceEvent::DidStartLoading);
        let updates = h.pump();
        assert_eq!(*before, *h.store.snapshot());
        assert_eq!(
            updates,
            vec![BridgeUpdate::NavigationState {
                tab_id: h.root,
                state: NavigationState {
                    can_go_back: false,
                    can_go_forward: false,
                    is_loading: true,
                },
            }]
        );
    }

    #[test]
    fn test_detach_drops_late_events() {
        let mut h = Harness::new();
        h.ready(h.root);
        let child = h.store.create_tab(Some(h.root), "https://c.test", None);
        h.bridge.reconcile(&h.store.snapshot(), &h.factory);
        h.ready(child);

        // queue an event, then close the tab before it is handled
        h.emit(child, SurfaceEvent::WillNavigate { url: "https://late.test".into() });
        let late_sink = h.factory.handle(child);
        h.store.close_tab(child);
        h.bridge.reconcile(&h.store.snapshot(), &h.factory);

        assert!(!h.bridge.is_attached(child));
        assert!(!late_sink.emit(SurfaceEvent::Ready));
        let updates = h.pump();
        assert!(updates.is_empty());
        assert!(h.children(h.root).is_empty());
    }

    #[test]
    fn test_commands_without_surface_are_noops() {
        let mut h = Harness::new();
        let ghost = TabId::new();
        assert!(!h.bridge.load_url(ghost, "https://x.test"));
        assert!(!h.bridge.go_back(ghost));
        assert!(!h.bridge.go_forward(ghost));
        assert!(!h.bridge.reload(ghost));
        assert!(!h.bridge.set_muted(ghost, false));
        assert!(!h.bridge.activate_link(ghost, 0, false));
    }

    #[test]
    fn test_go_back_only_flags_when_possible() {
        let mut h = Harness::new();
        h.ready(h.root);
        assert!(!h.bridge.go_back(h.root));
        assert!(!h.bridge.state_of(h.root).unwrap().programmatic);

        h.factory.handle(h.root).set_history(true, false);
        assert!(h.bridge.go_back(h.root));
        assert!(h.bridge.state_of(h.root).unwrap().programmatic);
        assert!(h.factory.handle(h.root).calls().contains(&SurfaceCall::GoBack));
    }

    #[test]
    fn test_reload_without_page_leaves_next_link_as_child() {
        let mut h = Harness::new();
        h.ready(h.root);
        h.factory.handle(h.root).clear_url();

        assert!(!h.bridge.reload(h.root));
        assert!(!h.bridge.state_of(h.root).unwrap().programmatic);
        assert!(!h.factory.handle(h.root).calls().contains(&SurfaceCall::Reload));

        h.emit(
            h.root,
            SurfaceEvent::WillNavigate {
                url: "https://home.test/next".into(),
            },
        );
        h.pump();
        assert_eq!(h.children(h.root).len(), 1);
    }

    #[test]
    fn test_reload_with_page_is_programmatic() {
        let mut h = Harness::new();
        h.ready(h.root);
        assert!(h.bridge.reload(h.root));
        assert!(h.bridge.state_of(h.root).unwrap().programmatic);
        assert!(h.factory.handle(h.root).calls().contains(&SurfaceCall::Reload));
    }

    #[test]
    fn test_navigation_state_requires_ready() {
        let mut h = Harness::new();
        assert_eq!(h.bridge.navigation_state(h.root), None);
        h.ready(h.root);
        assert_eq!(
            h.bridge.navigation_state(h.root),
            Some(NavigationState::default())
        );
    }
}
