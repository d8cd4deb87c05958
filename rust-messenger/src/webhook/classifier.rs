//! Maps webhook envelopes onto inbound [`Action`]s.
//!
//! Each messaging event yields at most one action. Rules are tried in
//! priority order and the first match wins:
//!
//! 1. message without quick reply and without attachments → `TEXT`
//! 2. message with quick reply and without attachments → `QUICK_REPLY`
//! 3. postback → `POSTBACK`
//! 4. first attachment of type image/audio/video/file → `IMAGE`/`AUDIO`/`VIDEO`/`FILE`
//! 5. first attachment of type location → `LOCATION`
//!
//! Anything else (read receipts, deliveries, optins, account linking,
//! events with no attachments to look at) is [`Classification::Unclassified`]
//! and dropped without failing the rest of the delivery.

use serde_json::Value;
use tracing::{debug, error};

use crate::action::{Action, UserId};
use crate::error::WebhookError;
use crate::webhook::envelope::{Attachment, Envelope, MessagingEvent};

/// Outcome of classifying one messaging event.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Action(Action),
    Unclassified(&'static str),
}

impl Classification {
    pub fn into_action(self) -> Option<Action> {
        match self {
            Classification::Action(action) => Some(action),
            Classification::Unclassified(_) => None,
        }
    }
}

/// Classify every event of an envelope, in entry order then event order.
///
/// # Errors
///
/// [`WebhookError::SourceMismatch`] when the envelope is not a page delivery;
/// no event is looked at in that case.
pub fn classify_envelope(envelope: &Envelope) -> Result<Vec<Action>, WebhookError> {
    if !envelope.is_from_page() {
        error!(object = %envelope.object, "webhook_source_mismatch");
        return Err(WebhookError::SourceMismatch {
            object: envelope.object.clone(),
        });
    }

    let mut actions = Vec::with_capacity(envelope.event_count());

    for (entry_index, entry) in envelope.entry.iter().enumerate() {
        for (event_index, raw) in entry.messaging.iter().enumerate() {
            match classify_raw_event(raw) {
                Classification::Action(action) => actions.push(action),
                Classification::Unclassified(reason) => {
                    debug!(
                        entry_index,
                        event_index,
                        reason,
                        "messaging_event_unclassified"
                    );
                }
            }
        }
    }

    Ok(actions)
}

/// Decode and classify a single raw messaging event.
pub fn classify_raw_event(raw: &Value) -> Classification {
    match serde_json::from_value::<MessagingEvent>(raw.clone()) {
        Ok(event) => classify_event(&event),
        Err(e) => {
            debug!(error = %e, "messaging_event_decode_failed");
            Classification::Unclassified("undecodable event")
        }
    }
}

/// Classify a decoded messaging event.
pub fn classify_event(event: &MessagingEvent) -> Classification {
    let sender = match &event.sender {
        Some(party) => party.id.clone(),
        None => return Classification::Unclassified("no sender"),
    };

    if let Some(message) = event.message.as_ref().filter(|m| m.attachments.is_none()) {
        return Classification::Action(match &message.quick_reply {
            None => Action::Text {
                sender,
                text: message.text.clone(),
            },
            Some(quick_reply) => Action::QuickReply {
                sender,
                payload: quick_reply.payload.clone(),
            },
        });
    }

    if let Some(postback) = &event.postback {
        return Classification::Action(Action::Postback {
            sender,
            payload: postback.payload.clone(),
            referral: postback.referral.clone(),
        });
    }

    let first = match event
        .message
        .as_ref()
        .and_then(|m| m.attachments.as_ref())
        .and_then(|a| a.first())
    {
        Some(attachment) => attachment,
        None => return Classification::Unclassified("no attachment"),
    };

    classify_attachment(sender, first)
}

fn classify_attachment(sender: UserId, attachment: &Attachment) -> Classification {
    let payload = attachment.payload.clone().unwrap_or_default();

    match attachment.kind.as_str() {
        "image" | "audio" | "video" | "file" => {
            let Some(url) = payload.url else {
                return Classification::Unclassified("attachment without url");
            };
            let action = match attachment.kind.as_str() {
                "image" => Action::Image { sender, url },
                "audio" => Action::Audio { sender, url },
                "video" => Action::Video { sender, url },
                _ => Action::File { sender, url },
            };
            Classification::Action(action)
        }
        "location" => match payload.coordinates {
            Some(coordinates) => Classification::Action(Action::Location {
                sender,
                coordinates,
            }),
            None => Classification::Unclassified("location without coordinates"),
        },
        _ => Classification::Unclassified("unsupported attachment type"),
    }
}
