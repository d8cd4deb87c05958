//! Normalized actions flowing in and out of the adapter.
//!
//! Inbound variants are produced by the classifier and handed to
//! subscribers. Outbound variants are built by callers and turned into
//! Graph API requests by the dispatcher. The JSON form uses a `type`
//! discriminant, e.g. `{"type":"TEXT","sender":123,"text":"hi"}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Page-scoped user id.
///
/// Kept in the JSON form it arrived in: a number stays a number and a
/// string stays a string, both on the way in and on the way out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(u64),
    Text(String),
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserId::Number(n) => write!(f, "{}", n),
            UserId::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        UserId::Text(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        UserId::Text(id)
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        UserId::Number(id)
    }
}

/// Location shared by a user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub long: f64,
}

/// Typing indicators and read marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderAction {
    MarkSeen,
    TypingOn,
    TypingOff,
}

impl SenderAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderAction::MarkSeen => "mark_seen",
            SenderAction::TypingOn => "typing_on",
            SenderAction::TypingOff => "typing_off",
        }
    }
}

/// A normalized event (inbound) or command (outbound).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    // ---- inbound ----
    Text {
        sender: UserId,
        /// Absent when the message carried no text.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    QuickReply {
        sender: UserId,
        payload: Value,
    },
    Image {
        sender: UserId,
        url: String,
    },
    Audio {
        sender: UserId,
        url: String,
    },
    Video {
        sender: UserId,
        url: String,
    },
    File {
        sender: UserId,
        url: String,
    },
    Location {
        sender: UserId,
        coordinates: Coordinates,
    },
    Postback {
        sender: UserId,
        payload: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        referral: Option<Value>,
    },

    // ---- outbound ----
    Message {
        id: UserId,
        message: Value,
    },
    SenderAction {
        id: UserId,
        sender_action: SenderAction,
    },
    SetThreadSettings {
        payload: Value,
    },
    RemoveThreadSettings {
        payload: Value,
    },
}

/// Tags the dispatcher knows how to send.
pub const OUTBOUND_TAGS: &[&str] = &[
    "MESSAGE",
    "SENDER_ACTION",
    "SET_THREAD_SETTINGS",
    "REMOVE_THREAD_SETTINGS",
];

impl Action {
    /// The wire discriminant of this action.
    pub fn tag(&self) -> &'static str {
        match self {
            Action::Text { .. } => "TEXT",
            Action::QuickReply { .. } => "QUICK_REPLY",
            Action::Image { .. } => "IMAGE",
            Action::Audio { .. } => "AUDIO",
            Action::Video { .. } => "VIDEO",
            Action::File { .. } => "FILE",
            Action::Location { .. } => "LOCATION",
            Action::Postback { .. } => "POSTBACK",
            Action::Message { .. } => "MESSAGE",
            Action::SenderAction { .. } => "SENDER_ACTION",
            Action::SetThreadSettings { .. } => "SET_THREAD_SETTINGS",
            Action::RemoveThreadSettings { .. } => "REMOVE_THREAD_SETTINGS",
        }
    }

    pub fn is_inbound(&self) -> bool {
        self.sender().is_some()
    }

    /// Sender of an inbound action.
    pub fn sender(&self) -> Option<&UserId> {
        match self {
            Action::Text { sender, .. }
            | Action::QuickReply { sender, .. }
            | Action::Image { sender, .. }
            | Action::Audio { sender, .. }
            | Action::Video { sender, .. }
            | Action::File { sender, .. }
            | Action::Location { sender, .. }
            | Action::Postback { sender, .. } => Some(sender),
            _ => None,
        }
    }

    /// Send a message payload (text, attachment, template...) to `id`.
    pub fn message(id: impl Into<UserId>, message: Value) -> Self {
        Action::Message {
            id: id.into(),
            message,
        }
    }

    /// Shorthand for a plain text [`Action::Message`].
    pub fn text_message(id: impl Into<UserId>, text: impl Into<String>) -> Self {
        Action::message(id, serde_json::json!({ "text": text.into() }))
    }

    pub fn sender_action(id: impl Into<UserId>, sender_action: SenderAction) -> Self {
        Action::SenderAction {
            id: id.into(),
            sender_action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_id_keeps_its_json_form() {
        let number: UserId = serde_json::from_value(json!(123)).unwrap();
        let text: UserId = serde_json::from_value(json!("123")).unwrap();
        assert_eq!(number, UserId::Number(123));
        assert_eq!(text, UserId::Text("123".to_string()));
        assert_eq!(number.to_string(), text.to_string());

        assert_eq!(serde_json::to_value(&number).unwrap(), json!(123));
        assert_eq!(serde_json::to_value(&text).unwrap(), json!("123"));
    }

    #[test]
    fn test_user_id_rejects_objects() {
        assert!(serde_json::from_value::<UserId>(json!({ "id": 1 })).is_err());
    }

    #[test]
    fn test_action_json_shape() {
        let action = Action::Text {
            sender: UserId::from(123u64),
            text: Some("hi".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({ "type": "TEXT", "sender": 123, "text": "hi" })
        );
    }

    #[test]
    fn test_text_without_text_omits_field() {
        let action = Action::Text {
            sender: UserId::from(7u64),
            text: None,
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({ "type": "TEXT", "sender": 7 })
        );
    }

    #[test]
    fn test_sender_action_from_loose_json() {
        let action: Action = serde_json::from_value(json!({
            "type": "SENDER_ACTION",
            "id": 123,
            "sender_action": "typing_on"
        }))
        .unwrap();

        assert_eq!(action, Action::sender_action(123u64, SenderAction::TypingOn));
    }

    #[test]
    fn test_postback_referral_optional() {
        let action: Action = serde_json::from_value(json!({
            "type": "POSTBACK",
            "sender": "9",
            "payload": "GET_STARTED"
        }))
        .unwrap();

        match &action {
            Action::Postback { referral, .. } => assert!(referral.is_none()),
            other => panic!("Expected Postback, got {:?}", other),
        }
        assert!(!serde_json::to_string(&action).unwrap().contains("referral"));
    }

    #[test]
    fn test_tag_matches_serialized_type() {
        let actions = vec![
            Action::text_message("1", "hello"),
            Action::sender_action("1", SenderAction::MarkSeen),
            Action::SetThreadSettings { payload: json!({}) },
            Action::RemoveThreadSettings { payload: json!({}) },
            Action::Location {
                sender: UserId::from("1"),
                coordinates: Coordinates { lat: 1.0, long: 2.0 },
            },
        ];

        for action in actions {
            let value = serde_json::to_value(&action).unwrap();
            assert_eq!(value["type"], action.tag());
        }
    }

    #[test]
    fn test_inbound_outbound_split() {
        assert!(Action::Image {
            sender: UserId::from("1"),
            url: "https://x".to_string()
        }
        .is_inbound());
        assert!(!Action::text_message("1", "x").is_inbound());
        assert!(OUTBOUND_TAGS.contains(&Action::text_message("1", "x").tag()));
        assert!(!OUTBOUND_TAGS.contains(&"TEXT"));
    }
}
