//! Mapping from outbound actions to Graph API requests.
//!
//! | Action                   | Method | Path                 | Body                         |
//! |--------------------------|--------|----------------------|------------------------------|
//! | `MESSAGE`                | POST   | `me/messages`        | `{recipient:{id}, message}`  |
//! | `SENDER_ACTION`          | POST   | `me/messages`        | `{recipient:{id}, sender_action}` |
//! | `SET_THREAD_SETTINGS`    | POST   | `me/thread_settings` | payload verbatim             |
//! | `REMOVE_THREAD_SETTINGS` | DELETE | `me/thread_settings` | payload verbatim             |
//!
//! Every request carries `access_token` in its query string.

use reqwest::Method;
use serde_json::{json, Value};
use url::Url;

use crate::action::{Action, UserId};
use crate::error::DispatchError;

/// Profile fields requested by [`build_profile_request`].
pub const PROFILE_FIELDS: &str =
    "first_name,last_name,profile_pic,locale,timezone,gender,is_payment_enabled";

const MESSAGES: [&str; 2] = ["me", "messages"];
const THREAD_SETTINGS: [&str; 2] = ["me", "thread_settings"];

/// A fully described outbound call, ready for a [`Transport`](super::Transport).
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl OutboundRequest {
    /// Value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Build the request for an outbound action.
///
/// # Errors
///
/// * [`DispatchError::UnknownAction`] for inbound-only tags.
/// * [`DispatchError::Configuration`] when no access token is set or the
///   API base is not a usable URL.
pub fn build_request(
    action: &Action,
    api_base: &str,
    access_token: Option<&str>,
) -> Result<OutboundRequest, DispatchError> {
    let (method, path, body) = match action {
        Action::Message { id, message } => (
            Method::POST,
            MESSAGES,
            json!({ "recipient": { "id": id }, "message": message }),
        ),
        Action::SenderAction { id, sender_action } => (
            Method::POST,
            MESSAGES,
            json!({ "recipient": { "id": id }, "sender_action": sender_action }),
        ),
        Action::SetThreadSettings { payload } => (Method::POST, THREAD_SETTINGS, payload.clone()),
        Action::RemoveThreadSettings { payload } => {
            (Method::DELETE, THREAD_SETTINGS, payload.clone())
        }
        Action::Text { .. }
        | Action::QuickReply { .. }
        | Action::Image { .. }
        | Action::Audio { .. }
        | Action::Video { .. }
        | Action::File { .. }
        | Action::Location { .. }
        | Action::Postback { .. } => {
            return Err(DispatchError::UnknownAction {
                tag: action.tag().to_string(),
            })
        }
    };

    Ok(OutboundRequest {
        method,
        url: endpoint(api_base, &path)?,
        query: with_access_token(Vec::new(), access_token)?,
        body: Some(body),
    })
}

/// Build the profile lookup `GET {api_base}/{user_id}?fields=...`.
pub fn build_profile_request(
    user_id: &UserId,
    api_base: &str,
    access_token: Option<&str>,
) -> Result<OutboundRequest, DispatchError> {
    let query = vec![("fields".to_string(), PROFILE_FIELDS.to_string())];

    let id = user_id.to_string();

    Ok(OutboundRequest {
        method: Method::GET,
        url: endpoint(api_base, &[id.as_str()])?,
        query: with_access_token(query, access_token)?,
        body: None,
    })
}

/// Append path segments (percent-encoded) to the API base.
fn endpoint(api_base: &str, segments: &[&str]) -> Result<Url, DispatchError> {
    let mut url = Url::parse(api_base)
        .map_err(|e| DispatchError::Configuration(format!("invalid API base {:?}: {}", api_base, e)))?;

    url.path_segments_mut()
        .map_err(|_| DispatchError::Configuration(format!("API base {:?} cannot take a path", api_base)))?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}

/// Merge the access token into action-specific query parameters.
fn with_access_token(
    mut query: Vec<(String, String)>,
    access_token: Option<&str>,
) -> Result<Vec<(String, String)>, DispatchError> {
    let token = access_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| DispatchError::Configuration("missing page access token".to_string()))?;

    query.retain(|(k, _)| k != "access_token");
    query.push(("access_token".to_string(), token.to_string()));
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::SenderAction;

    const BASE: &str = "https://graph.facebook.com/v2.6";

    #[test]
    fn test_message_request() {
        let message = json!({ "text": "hello" });
        let req = build_request(&Action::message(123u64, message.clone()), BASE, Some("tok")).unwrap();

        assert_eq!(req.method, Method::POST);
        assert_eq!(req.url.as_str(), "https://graph.facebook.com/v2.6/me/messages");
        assert_eq!(req.query_param("access_token"), Some("tok"));
        assert_eq!(
            req.body,
            Some(json!({ "recipient": { "id": 123 }, "message": message }))
        );
    }

    #[test]
    fn test_string_recipient_stays_string() {
        let req = build_request(&Action::text_message("123", "hi"), BASE, Some("tok")).unwrap();

        assert_eq!(
            req.body,
            Some(json!({ "recipient": { "id": "123" }, "message": { "text": "hi" } }))
        );
    }

    #[test]
    fn test_sender_action_request() {
        let action = Action::sender_action(123u64, SenderAction::TypingOn);
        let req = build_request(&action, BASE, Some("tok")).unwrap();

        assert_eq!(req.method, Method::POST);
        assert_eq!(req.url.path(), "/v2.6/me/messages");
        assert_eq!(
            req.body,
            Some(json!({ "recipient": { "id": 123 }, "sender_action": "typing_on" }))
        );
    }

    #[test]
    fn test_thread_settings_requests() {
        let payload = json!({ "setting_type": "greeting", "greeting": { "text": "Hi" } });

        let set = build_request(
            &Action::SetThreadSettings { payload: payload.clone() },
            BASE,
            Some("tok"),
        )
        .unwrap();
        assert_eq!(set.method, Method::POST);
        assert_eq!(set.url.path(), "/v2.6/me/thread_settings");
        assert_eq!(set.body.as_ref(), Some(&payload));

        let remove = build_request(
            &Action::RemoveThreadSettings { payload: payload.clone() },
            BASE,
            Some("tok"),
        )
        .unwrap();
        assert_eq!(remove.method, Method::DELETE);
        assert_eq!(remove.url.path(), "/v2.6/me/thread_settings");
        assert_eq!(remove.body, Some(payload));
    }

    #[test]
    fn test_inbound_actions_are_unknown() {
        let action = Action::Text {
            sender: UserId::from("1"),
            text: Some("hi".to_string()),
        };

        match build_request(&action, BASE, Some("tok")) {
            Err(DispatchError::UnknownAction { tag }) => assert_eq!(tag, "TEXT"),
            other => panic!("Expected UnknownAction, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_tag_reported_before_missing_token() {
        let action = Action::Image {
            sender: UserId::from("1"),
            url: "https://x".to_string(),
        };
        assert!(matches!(
            build_request(&action, BASE, None),
            Err(DispatchError::UnknownAction { .. })
        ));
    }

    #[test]
    fn test_missing_token() {
        for token in [None, Some(""), Some("  ")] {
            assert!(matches!(
                build_request(&Action::text_message("1", "x"), BASE, token),
                Err(DispatchError::Configuration(_))
            ));
        }
    }

    #[test]
    fn test_invalid_api_base() {
        assert!(matches!(
            build_request(&Action::text_message("1", "x"), "not a url", Some("tok")),
            Err(DispatchError::Configuration(_))
        ));
    }

    #[test]
    fn test_trailing_slash_in_base() {
        let req = build_request(
            &Action::text_message("1", "x"),
            "https://graph.example.com/v9.0/",
            Some("tok"),
        )
        .unwrap();
        assert_eq!(req.url.as_str(), "https://graph.example.com/v9.0/me/messages");
    }

    #[test]
    fn test_profile_request() {
        let req = build_profile_request(&UserId::from("12/34"), BASE, Some("tok")).unwrap();

        assert_eq!(req.method, Method::GET);
        assert_eq!(req.url.as_str(), "https://graph.facebook.com/v2.6/12%2F34");
        assert_eq!(req.query_param("fields"), Some(PROFILE_FIELDS));
        assert_eq!(req.query_param("access_token"), Some("tok"));
        assert!(req.body.is_none());
    }
}
