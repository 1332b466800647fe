//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::core::config::ResolvedConfig;
use crate::core::document::Document;
use crate::core::state::App;
use crate::core::surface::{EventSink, Surface, SurfaceEvent, SurfaceFactory};
use crate::core::tree::TabId;

/// A command the bridge issued to a fake surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    LoadUrl(String),
    GoBack,
    GoForward,
    Reload,
    SetMuted(bool),
    SendInit(TabId),
    Proceed(String),
    Cancel(String),
    ActivateLink(usize, bool),
}

#[derive(Default)]
struct FakeState {
    sink: Option<EventSink>,
    calls: Vec<SurfaceCall>,
    url: Option<String>,
    muted: bool,
    loading: bool,
    can_go_back: bool,
    can_go_forward: bool,
    document: Option<Arc<Document>>,
}

/// Shared view of one fake surface, kept by the factory after the bridge
/// takes ownership of the surface itself.
#[derive(Clone, Default)]
pub struct FakeHandle(Rc<RefCell<FakeState>>);

impl FakeHandle {
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.0.borrow().calls.clone()
    }

    pub fn emit(&self, event: SurfaceEvent) -> bool {
        self.0
            .borrow()
            .sink
            .as_ref()
            .is_some_and(|sink| sink.emit(event))
    }

    pub fn set_url(&self, url: &str) {
        self.0.borrow_mut().url = Some(url.to_string());
    }

    pub fn clear_url(&self) {
        self.0.borrow_mut().url = None;
    }

    pub fn set_loading(&self, loading: bool) {
        self.0.borrow_mut().loading = loading;
    }

    pub fn set_history(&self, can_go_back: bool, can_go_forward: bool) {
        let mut state = self.0.borrow_mut();
        state.can_go_back = can_go_back;
        state.can_go_forward = can_go_forward;
    }

    pub fn set_document(&self, document: Document) {
        self.0.borrow_mut().document = Some(Arc::new(document));
    }

    fn record(&self, call: SurfaceCall) {
        self.0.borrow_mut().calls.push(call);
    }
}

/// Records every command; reports whatever the test configured.
pub struct FakeSurface {
    handle: FakeHandle,
}

impl Surface for FakeSurface {
    fn subscribe(&mut self, sink: EventSink) {
        self.handle.0.borrow_mut().sink = Some(sink);
    }

    fn load_url(&mut self, url: &str) {
        self.handle.record(SurfaceCall::LoadUrl(url.to_string()));
        self.handle.set_url(url);
    }

    fn go_back(&mut self) {
        self.handle.record(SurfaceCall::GoBack);
    }

    fn go_forward(&mut self) {
        self.handle.record(SurfaceCall::GoForward);
    }

    fn reload(&mut self) {
        self.handle.record(SurfaceCall::Reload);
    }

    fn set_muted(&mut self, muted: bool) {
        self.handle.record(SurfaceCall::SetMuted(muted));
        self.handle.0.borrow_mut().muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.handle.0.borrow().muted
    }

    fn can_go_back(&self) -> bool {
        self.handle.0.borrow().can_go_back
    }

    fn can_go_forward(&self) -> bool {
        self.handle.0.borrow().can_go_forward
    }

    fn is_loading(&self) -> bool {
        self.handle.0.borrow().loading
    }

    fn current_url(&self) -> Option<String> {
        self.handle.0.borrow().url.clone()
    }

    fn send_init(&mut self, tab_id: TabId) {
        self.handle.record(SurfaceCall::SendInit(tab_id));
    }

    fn proceed(&mut self, url: &str) {
        self.handle.record(SurfaceCall::Proceed(url.to_string()));
    }

    fn cancel(&mut self, url: &str) {
        self.handle.record(SurfaceCall::Cancel(url.to_string()));
    }

    fn document(&self) -> Option<Arc<Document>> {
        self.handle.0.borrow().document.clone()
    }

    fn activate_link(&mut self, index: usize, modified: bool) {
        self.handle.record(SurfaceCall::ActivateLink(index, modified));
    }
}

/// Hands out `FakeSurface`s and remembers a handle to each by tab.
#[derive(Clone, Default)]
pub struct FakeSurfaceFactory {
    handles: Rc<RefCell<HashMap<TabId, FakeHandle>>>,
}

impl FakeSurfaceFactory {
    /// The handle for `tab_id`'s most recent surface. Panics if none exists.
    pub fn handle(&self, tab_id: TabId) -> FakeHandle {
        self.handles
            .borrow()
            .get(&tab_id)
            .cloned()
            .unwrap_or_else(|| panic!("no fake surface for {tab_id}"))
    }
}

impl SurfaceFactory for FakeSurfaceFactory {
    fn create(&self, tab_id: TabId) -> Box<dyn Surface> {
        let handle = FakeHandle::default();
        self.handles.borrow_mut().insert(tab_id, handle.clone());
        Box::new(FakeSurface { handle })
    }
}

pub const TEST_HOME: &str = "https://home.test/";

/// Config with a fixed home URL and no environment lookups.
pub fn test_config() -> ResolvedConfig {
    ResolvedConfig {
        home_url: TEST_HOME.to_string(),
        ..ResolvedConfig::default()
    }
}

/// Creates a test App backed by fake surfaces.
pub fn test_app() -> (
    App,
    FakeSurfaceFactory,
    std::sync::mpsc::Receiver<crate::core::surface::SurfaceEnvelope>,
) {
    let (tx, rx) = std::sync::mpsc::channel();
    let factory = FakeSurfaceFactory::default();
    let app = App::new(&test_config(), Box::new(factory.clone()), tx);
    (app, factory, rx)
}
