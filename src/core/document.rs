//! Rendered page content as the presentation layer sees it.
//!
//! A `Document` is produced by a surface host and is read-only afterward.
//! It carries the visible text blocks and every anchor in document order so
//! the page view can number and select them.

/// An anchor found in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Visible anchor text, whitespace-collapsed.
    pub text: String,
    /// The raw `href` attribute as written in the markup.
    pub href: String,
    /// `href` resolved against the document URL, if it resolves.
    pub url: Option<String>,
    pub target: Option<String>,
    pub rel: Option<String>,
}

impl Link {
    /// Links the page instrumentation leaves to the surface's native
    /// handling: blank hrefs, same-page anchors, `javascript:` targets and
    /// external links that ask for a new window.
    pub fn bypasses_interception(&self) -> bool {
        let href = self.href.trim();
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            return true;
        }
        self.target.as_deref() == Some("_blank")
            && self.rel.as_deref().is_some_and(|rel| rel.contains("external"))
    }

    pub fn is_fragment(&self) -> bool {
        self.href.trim().starts_with('#')
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub url: String,
    pub title: String,
    pub blocks: Vec<String>,
    pub links: Vec<Link>,
    /// Set when this document stands in for a page that failed to load.
    pub error: Option<String>,
}

impl Document {
    /// Placeholder document shown when a load fails.
    pub fn failed(url: &str, reason: &str) -> Self {
        Self {
            url: url.to_string(),
            title: "Page failed to load".to_string(),
            blocks: vec![format!("Could not load {url}"), reason.to_string()],
            links: Vec::new(),
            error: Some(reason.to_string()),
        }
    }

    /// Same content under a different URL (in-page navigation).
    pub fn with_url(&self, url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..self.clone()
        }
    }
}
