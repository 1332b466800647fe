//! # Surface Contract
//!
//! A surface is the isolated page-rendering handle mirrored onto one tab.
//! The core never reaches inside it: it issues commands through the
//! [`Surface`] trait and hears back through [`SurfaceEvent`]s.
//!
//! Events travel through an [`EventSink`] into a single channel drained by the
//! event loop. Each sink is paired with a [`Subscription`]; disposing the
//! subscription (or dropping it) silences the sink, so a surface that is
//! being torn down cannot reach the tree anymore.
//!
//! ```text
//! Surface ──emit──▶ EventSink ──mpsc──▶ event loop ──▶ NavigationBridge
//!                      ▲
//!          Subscription┘ dispose() cuts the link
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

use crate::core::tree::TabId;
use crate::core::document::Document;

/// Lifecycle signals a surface reports about its content.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// The document finished its initial load handshake (dom-ready).
    Ready,
    /// The surface is about to leave its document. It waits for
    /// [`Surface::proceed`] or [`Surface::cancel`].
    WillNavigate { url: String },
    DidNavigate { url: String },
    DidNavigateInPage { url: String },
    DidStartLoading,
    DidStopLoading,
    DidFailLoad { url: String, reason: String },
    /// Custom message posted by page-level instrumentation.
    Message {
        channel: String,
        payload: serde_json::Value,
    },
}

/// A surface event tagged with the tab and subscription it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceEnvelope {
    pub tab_id: TabId,
    pub generation: u64,
    pub event: SurfaceEvent,
}

/// Back/forward availability and loading flag for one surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigationState {
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub is_loading: bool,
}

impl NavigationState {
    pub fn of(surface: &dyn Surface) -> Self {
        Self {
            can_go_back: surface.can_go_back(),
            can_go_forward: surface.can_go_forward(),
            is_loading: surface.is_loading(),
        }
    }
}

/// The sending half handed to a surface.
#[derive(Debug, Clone)]
pub struct EventSink {
    tab_id: TabId,
    generation: u64,
    live: Arc<AtomicBool>,
    tx: Sender<SurfaceEnvelope>,
}

impl EventSink {
    /// Creates a sink and the subscription that controls it.
    pub fn pair(
        tab_id: TabId,
        generation: u64,
        tx: Sender<SurfaceEnvelope>,
    ) -> (EventSink, Subscription) {
        let live = Arc::new(AtomicBool::new(true));
        let sink = EventSink {
            tab_id,
            generation,
            live: Arc::clone(&live),
            tx,
        };
        (sink, Subscription { live, generation })
    }

    /// Posts an event. Returns false if the subscription was disposed or the
    /// receiving loop is gone.
    pub fn emit(&self, event: SurfaceEvent) -> bool {
        if !self.is_live() {
            return false;
        }
        self.tx
            .send(SurfaceEnvelope {
                tab_id: self.tab_id,
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }
}

/// Disposer for an [`EventSink`]. Dropping it has the same effect as
/// calling [`Subscription::dispose`].
#[derive(Debug)]
pub struct Subscription {
    live: Arc<AtomicBool>,
    generation: u64,
}

impl Subscription {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    pub fn dispose(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.live.store(false, Ordering::Release);
    }
}

/// Commands and queries a surface host must provide.
pub trait Surface {
    /// Registers the sink events are reported through.
    fn subscribe(&mut self, sink: EventSink);

    fn load_url(&mut self, url: &str);
    fn go_back(&mut self);
    fn go_forward(&mut self);
    fn reload(&mut self);
    fn set_muted(&mut self, muted: bool);
    fn is_muted(&self) -> bool;

    fn can_go_back(&self) -> bool;
    fn can_go_forward(&self) -> bool;
    fn is_loading(&self) -> bool;
    fn current_url(&self) -> Option<String>;

    /// Delivers the owning tab's identifier to the hosted content so it can
    /// tag its own outbound messages.
    fn send_init(&mut self, tab_id: TabId);

    /// Lets the navigation announced by `WillNavigate` go ahead.
    fn proceed(&mut self, url: &str);
    /// Drops the navigation announced by `WillNavigate`.
    fn cancel(&mut self, url: &str);

    /// The rendered document, if one has loaded.
    fn document(&self) -> Option<Arc<Document>>;

    /// A user activation of the link at `index` in the current document.
    /// `modified` is set when a modifier key was held.
    fn activate_link(&mut self, index: usize, modified: bool);
}

/// Builds surfaces for newly mounted tabs.
pub trait SurfaceFactory {
    fn create(&self, tab_id: TabId) -> Box<dyn Surface>;
}
