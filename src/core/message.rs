//! Payloads posted by page-level instrumentation over the page-event channel.
//!
//! Wire shape is a tagged JSON object:
//!
//! ```text
//! {"type": "link-clicked", "url": "...", "tabId": "..."}
//! {"type": "metadata",     "url": "...", "title": "...", "tabId": "..."}
//! {"type": "navigation",   "url": "...", "tabId": "..."}
//! ```
//!
//! `tabId` is whatever the page was told at init time; it is an empty string
//! until the init message arrives. The host routes by the surface that
//! delivered the message, not by this field.

use serde::{Deserialize, Serialize};

/// Channel name instrumentation messages are posted on.
pub const PAGE_EVENT_CHANNEL: &str = "page:event";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PageMessage {
    LinkClicked {
        url: String,
        #[serde(rename = "tabId", default)]
        tab_id: String,
    },
    Metadata {
        url: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(rename = "tabId", default)]
        tab_id: String,
    },
    Navigation {
        url: String,
        #[serde(rename = "tabId", default)]
        tab_id: String,
    },
}

impl PageMessage {
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_payload(payload: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_link_clicked_wire_shape() {
        let msg = PageMessage::LinkClicked {
            url: "https://a.test".into(),
            tab_id: "t1".into(),
        };
        assert_eq!(
            msg.to_payload(),
            json!({"type": "link-clicked", "url": "https://a.test", "tabId": "t1"})
        );
    }

    #[test]
    fn test_metadata_without_title_parses() {
        let msg = PageMessage::from_payload(&json!({
            "type": "metadata",
            "url": "https://a.test",
            "tabId": ""
        }))
        .unwrap();
        assert_eq!(
            msg,
            PageMessage::Metadata {
                url: "https://a.test".into(),
                title: None,
                tab_id: String::new(),
            }
        );
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result = PageMessage::from_payload(&json!({"type": "scroll", "y": 10}));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_url_is_rejected() {
        let result = PageMessage::from_payload(&json!({"type": "navigation", "tabId": "t"}));
        assert!(result.is_err());
    }
}
