//! Inbound update envelope — the JSON shapes Telegram posts to the
//! webhook, and their normalization into one `Inbound` value.

use serde::Deserialize;

/// Raw update envelope. Exactly one of `message` / `callback_query` is
/// expected; anything else is ignored upstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

/// A normalized inbound event the coordinator dispatches on.
#[derive(Debug, Clone)]
pub struct Inbound {
    /// Telegram user id, stringified — the session key.
    pub user_id: String,
    /// Chat to reply into.
    pub chat_id: String,
    /// Message text or callback data, trimmed.
    pub text: String,
    /// Display name snapshot.
    pub first_name: String,
    /// BCP-47-ish language code Telegram reports for the user.
    pub language_code: Option<String>,
    /// Message the inline keyboard hangs off, for callback updates.
    pub callback_message_id: Option<i64>,
}

impl Update {
    /// Flatten the envelope. Returns `None` for shapes the bot does not
    /// handle (no message/callback, or a message without text).
    pub fn into_inbound(self) -> Option<Inbound> {
        if let Some(message) = self.message {
            let text = message.text?.trim().to_string();
            let from = message.from;
            return Some(Inbound {
                user_id: from
                    .as_ref()
                    .map(|u| u.id.to_string())
                    .unwrap_or_else(|| message.chat.id.to_string()),
                chat_id: message.chat.id.to_string(),
                text,
                first_name: from
                    .as_ref()
                    .and_then(|u| u.first_name.clone())
                    .unwrap_or_default(),
                language_code: from.and_then(|u| u.language_code),
                callback_message_id: None,
            });
        }

        if let Some(callback) = self.callback_query {
            let message = callback.message?;
            let data = callback.data?.trim().to_string();
            return Some(Inbound {
                user_id: callback.from.id.to_string(),
                chat_id: message.chat.id.to_string(),
                text: data,
                first_name: callback.from.first_name.clone().unwrap_or_default(),
                language_code: callback.from.language_code,
                callback_message_id: Some(message.message_id),
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_update_normalizes() {
        let update: Update = serde_json::from_str(
            r#"{"update_id":1,"message":{"message_id":10,"chat":{"id":1},
                "from":{"id":1,"first_name":"Ann","language_code":"en"},
                "text":"  /start  "}}"#,
        )
        .unwrap();

        let inbound = update.into_inbound().unwrap();
        assert_eq!(inbound.user_id, "1");
        assert_eq!(inbound.chat_id, "1");
        assert_eq!(inbound.text, "/start");
        assert_eq!(inbound.first_name, "Ann");
        assert_eq!(inbound.language_code.as_deref(), Some("en"));
        assert!(inbound.callback_message_id.is_none());
    }

    #[test]
    fn callback_update_normalizes() {
        let update: Update = serde_json::from_str(
            r#"{"callback_query":{
                "from":{"id":7,"first_name":"Ann"},
                "message":{"message_id":55,"chat":{"id":9}},
                "data":"/start"}}"#,
        )
        .unwrap();

        let inbound = update.into_inbound().unwrap();
        assert_eq!(inbound.user_id, "7");
        assert_eq!(inbound.chat_id, "9");
        assert_eq!(inbound.text, "/start");
        assert_eq!(inbound.callback_message_id, Some(55));
    }

    #[test]
    fn unknown_shapes_are_ignored() {
        let update: Update = serde_json::from_str(r#"{"update_id":3}"#).unwrap();
        assert!(update.into_inbound().is_none());

        // A message without text (sticker, photo, ...) is ignored too.
        let update: Update = serde_json::from_str(
            r#"{"message":{"message_id":1,"chat":{"id":1},"from":{"id":1}}}"#,
        )
        .unwrap();
        assert!(update.into_inbound().is_none());
    }

    #[test]
    fn message_without_sender_falls_back_to_chat_id() {
        let update: Update = serde_json::from_str(
            r#"{"message":{"message_id":1,"chat":{"id":42},"text":"hi"}}"#,
        )
        .unwrap();
        let inbound = update.into_inbound().unwrap();
        assert_eq!(inbound.user_id, "42");
        assert_eq!(inbound.first_name, "");
    }
}
