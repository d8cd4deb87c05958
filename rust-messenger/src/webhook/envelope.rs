//! Wire types for webhook deliveries.
//!
//! Only the envelope and entry levels are decoded eagerly. Messaging events
//! stay as raw JSON until the classifier decodes them one by one, so a single
//! odd event cannot fail the whole delivery.

use serde::Deserialize;
use serde_json::Value;

use crate::action::{Coordinates, UserId};

/// `object` value of deliveries for page subscriptions.
pub const PAGE_OBJECT: &str = "page";

/// Top-level webhook payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

impl Envelope {
    pub fn is_from_page(&self) -> bool {
        self.object == PAGE_OBJECT
    }

    /// Total messaging events across all entries.
    pub fn event_count(&self) -> usize {
        self.entry.iter().map(|e| e.messaging.len()).sum()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    /// Page id
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub time: Option<Value>,
    #[serde(default)]
    pub messaging: Vec<Value>,
}

/// One element of `entry[].messaging`.
///
/// Only the fields classification reads are declared; `recipient`,
/// `timestamp` and the rest are ignored whatever their shape.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagingEvent {
    #[serde(default)]
    pub sender: Option<Party>,
    #[serde(default)]
    pub message: Option<InboundMessage>,
    #[serde(default)]
    pub postback: Option<Postback>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Party {
    pub id: UserId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub quick_reply: Option<QuickReply>,
    /// `None` when the field is absent; an empty list is kept as such.
    #[serde(default)]
    pub attachments: Option<Vec<Attachment>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuickReply {
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postback {
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub referral: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub payload: Option<AttachmentPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttachmentPayload {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}
