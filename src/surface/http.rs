//! # HTTP Surface
//!
//! A [`Surface`] that fetches pages with `reqwest` and renders them into a
//! [`Document`]. Each surface keeps its own history list and runs fetches on
//! the tokio runtime, reporting progress through its [`EventSink`].
//!
//! Every navigation, including ones the host asked for, is announced with
//! `WillNavigate` and held until the host calls `proceed` or `cancel`.
//!
//! ```text
//! load_url / go_back / link ──▶ WillNavigate ──▶ proceed ──▶ fetch task
//!                                                              │
//!   DidStartLoading ◀──────────────────────────────────────────┤
//!   DidNavigate | DidFailLoad, metadata, Ready, DidStopLoading ◀┘
//! ```

use log::{debug, info, warn};
use reqwest::header::CONTENT_TYPE;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;

use crate::core::config::ResolvedConfig;
use crate::core::document::Document;
use crate::core::message::{PAGE_EVENT_CHANNEL, PageMessage};
use crate::core::surface::{EventSink, Surface, SurfaceEvent, SurfaceFactory};
use crate::core::tree::TabId;
use crate::surface::html::{parse_document, plain_document};

/// Errors that can occur while fetching a page.
#[derive(Debug)]
pub enum FetchError {
    /// Connection, DNS, timeout, or an unusable URL.
    Network(String),
    /// The server answered with a non-success status.
    Status(u16),
    /// The response body could not be read.
    Body(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Network(msg) => write!(f, "network error: {msg}"),
            FetchError::Status(status) => write!(f, "server returned HTTP {status}"),
            FetchError::Body(msg) => write!(f, "could not read response: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Fetches `url` and turns the response into a document.
pub async fn fetch_document(client: &reqwest::Client, url: &str) -> Result<Document, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    let final_url = response.url().to_string();
    let is_html = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_none_or(|ct| ct.contains("html"));
    let body = response
        .text()
        .await
        .map_err(|e| FetchError::Body(e.to_string()))?;

    Ok(if is_html {
        parse_document(&body, &final_url)
    } else {
        plain_document(&body, &final_url)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    Load,
    Back,
    Forward,
    Reload,
}

/// A navigation announced with `WillNavigate` and awaiting a decision.
#[derive(Debug, Clone)]
struct Pending {
    url: String,
    kind: PendingKind,
}

#[derive(Default)]
struct Shared {
    sink: Option<EventSink>,
    /// Identifier delivered by the host at init; empty until then.
    tab_id: String,
    history: Vec<String>,
    index: Option<usize>,
    pending: Option<Pending>,
    loading: bool,
    document: Option<Arc<Document>>,
    /// Bumped on every fetch so a superseded fetch can tell it lost.
    load_token: u64,
}

impl Shared {
    fn emit(&self, event: SurfaceEvent) {
        if let Some(sink) = &self.sink {
            sink.emit(event);
        }
    }

    fn emit_page(&self, message: PageMessage) {
        self.emit(SurfaceEvent::Message {
            channel: PAGE_EVENT_CHANNEL.to_string(),
            payload: message.to_payload(),
        });
    }

    fn current_url(&self) -> Option<&str> {
        self.index
            .and_then(|i| self.history.get(i))
            .map(String::as_str)
    }

    fn announce(&mut self, url: String, kind: PendingKind) {
        self.pending = Some(Pending {
            url: url.clone(),
            kind,
        });
        self.emit(SurfaceEvent::WillNavigate { url });
    }

    fn commit(&mut self, pending: &Pending) {
        match pending.kind {
            PendingKind::Load => {
                let keep = self.index.map_or(0, |i| i + 1);
                self.history.truncate(keep);
                self.history.push(pending.url.clone());
                self.index = Some(self.history.len() - 1);
            }
            PendingKind::Back => self.index = self.index.map(|i| i.saturating_sub(1)),
            PendingKind::Forward => {
                if let Some(i) = self.index
                    && i + 1 < self.history.len()
                {
                    self.index = Some(i + 1);
                }
            }
            PendingKind::Reload => {}
        }
    }

    fn metadata(&self) -> Option<PageMessage> {
        let document = self.document.as_ref()?;
        Some(PageMessage::Metadata {
            url: document.url.clone(),
            title: Some(document.title.clone()),
            tab_id: self.tab_id.clone(),
        })
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct HttpSurface {
    shared: Arc<Mutex<Shared>>,
    client: reqwest::Client,
    runtime: Handle,
    muted: bool,
}

impl HttpSurface {
    pub fn new(client: reqwest::Client, runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared::default())),
            client,
            runtime,
            muted: false,
        }
    }

    pub fn history_len(&self) -> usize {
        lock(&self.shared).history.len()
    }

    fn start_fetch(&self, url: String) {
        let token = {
            let mut shared = lock(&self.shared);
            shared.load_token += 1;
            shared.loading = true;
            shared.emit(SurfaceEvent::DidStartLoading);
            shared.load_token
        };

        let shared = Arc::clone(&self.shared);
        let client = self.client.clone();
        self.runtime.spawn(async move {
            debug!("fetching {url}");
            let result = fetch_document(&client, &url).await;

            let mut shared = lock(&shared);
            if shared.load_token != token {
                debug!("discarding superseded fetch of {url}");
                return;
            }
            shared.loading = false;

            match result {
                Ok(document) => {
                    let final_url = document.url.clone();
                    if let Some(i) = shared.index
                        && let Some(entry) = shared.history.get_mut(i)
                    {
                        *entry = final_url.clone();
                    }
                    info!("loaded {final_url}");
                    shared.document = Some(Arc::new(document));
                    shared.emit(SurfaceEvent::DidNavigate { url: final_url });
                }
                Err(e) => {
                    warn!("failed to load {url}: {e}");
                    let reason = e.to_string();
                    shared.document = Some(Arc::new(Document::failed(&url, &reason)));
                    shared.emit(SurfaceEvent::DidFailLoad { url, reason });
                }
            }

            if let Some(message) = shared.metadata() {
                shared.emit_page(message);
            }
            shared.emit(SurfaceEvent::Ready);
            shared.emit(SurfaceEvent::DidStopLoading);
        });
    }
}

impl Surface for HttpSurface {
    fn subscribe(&mut self, sink: EventSink) {
        lock(&self.shared).sink = Some(sink);
    }

    fn load_url(&mut self, url: &str) {
        lock(&self.shared).announce(url.to_string(), PendingKind::Load);
    }

    fn go_back(&mut self) {
        let mut shared = lock(&self.shared);
        let previous = shared
            .index
            .filter(|i| *i > 0)
            .and_then(|i| shared.history.get(i - 1))
            .cloned();
        if let Some(url) = previous {
            shared.announce(url, PendingKind::Back);
        }
    }

    fn go_forward(&mut self) {
        let mut shared = lock(&self.shared);
        let next = shared.index.and_then(|i| shared.history.get(i + 1)).cloned();
        if let Some(url) = next {
            shared.announce(url, PendingKind::Forward);
        }
    }

    fn reload(&mut self) {
        let mut shared = lock(&self.shared);
        let current = shared.current_url().map(str::to_string);
        if let Some(url) = current {
            shared.announce(url, PendingKind::Reload);
        }
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn can_go_back(&self) -> bool {
        lock(&self.shared).index.is_some_and(|i| i > 0)
    }

    fn can_go_forward(&self) -> bool {
        let shared = lock(&self.shared);
        shared.index.is_some_and(|i| i + 1 < shared.history.len())
    }

    fn is_loading(&self) -> bool {
        lock(&self.shared).loading
    }

    fn current_url(&self) -> Option<String> {
        lock(&self.shared).current_url().map(str::to_string)
    }

    fn send_init(&mut self, tab_id: TabId) {
        let mut shared = lock(&self.shared);
        shared.tab_id = tab_id.to_string();
        let Some(url) = shared.current_url().map(str::to_string) else {
            return;
        };
        let message = PageMessage::Navigation {
            url,
            tab_id: shared.tab_id.clone(),
        };
        shared.emit_page(message);
        if let Some(message) = shared.metadata() {
            shared.emit_page(message);
        }
    }

    fn proceed(&mut self, url: &str) {
        let pending = {
            let mut shared = lock(&self.shared);
            let pending = match shared.pending.take() {
                Some(p) if p.url == url => p,
                _ => Pending {
                    url: url.to_string(),
                    kind: PendingKind::Load,
                },
            };
            shared.commit(&pending);
            pending
        };
        self.start_fetch(pending.url);
    }

    fn cancel(&mut self, url: &str) {
        let mut shared = lock(&self.shared);
        if shared.pending.as_ref().is_some_and(|p| p.url == url) {
            shared.pending = None;
        }
        debug!("navigation to {url} cancelled");
    }

    fn document(&self) -> Option<Arc<Document>> {
        lock(&self.shared).document.clone()
    }

    fn activate_link(&mut self, index: usize, modified: bool) {
        let mut shared = lock(&self.shared);
        let Some(link) = shared
            .document
            .as_ref()
            .and_then(|d| d.links.get(index))
            .cloned()
        else {
            return;
        };
        let Some(url) = link.url.clone() else {
            debug!("link {index} has no usable target ({:?})", link.href);
            return;
        };

        if link.is_fragment() {
            // Same document, new history entry.
            let pending = Pending {
                url: url.clone(),
                kind: PendingKind::Load,
            };
            shared.commit(&pending);
            shared.document = shared.document.as_ref().map(|d| Arc::new(d.with_url(&url)));
            shared.emit(SurfaceEvent::DidNavigateInPage { url: url.clone() });
            let message = PageMessage::Navigation {
                url,
                tab_id: shared.tab_id.clone(),
            };
            shared.emit_page(message);
            if let Some(message) = shared.metadata() {
                shared.emit_page(message);
            }
        } else if link.bypasses_interception() || modified {
            if link.href.trim().starts_with("javascript:") {
                return;
            }
            shared.announce(url, PendingKind::Load);
        } else {
            let message = PageMessage::LinkClicked {
                url,
                tab_id: shared.tab_id.clone(),
            };
            shared.emit_page(message);
        }
    }
}

/// Builds [`HttpSurface`]s that share one HTTP client.
pub struct HttpSurfaceFactory {
    client: reqwest::Client,
    runtime: Handle,
}

impl HttpSurfaceFactory {
    pub fn new(config: &ResolvedConfig, runtime: Handle) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self { client, runtime })
    }
}

impl SurfaceFactory for HttpSurfaceFactory {
    fn create(&self, tab_id: TabId) -> Box<dyn Surface> {
        debug!("creating HTTP surface for {tab_id}");
        Box::new(HttpSurface::new(self.client.clone(), self.runtime.clone()))
    }
}
