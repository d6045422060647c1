//! Loading chat exports into [`Message`]s.
//!
//! The accepted shape is the JSON chat export:
//!
//! ```json
//! {
//!   "chatName": "...",
//!   "messages": [{
//!     "messageId": "...", "timestamp": "2024-01-01T12:00:00Z",
//!     "sender": {"uin": "...", "name": "..."},
//!     "content": {"text": "...", "reply": {"referencedMessageId": "..."}},
//!     "rawMessage": {"sendMemberName": "...", "subMsgType": 0, "elements": [
//!         {"elementType": 1, "textElement": {"atType": 2, "atUid": "..."}}
//!     ]}
//!   }]
//! }
//! ```
//!
//! snake_case spellings, a flat `send_member_name`, explicit `mentions` and
//! `is_bot` are accepted too. Ids and timestamps may be strings or numbers.
//! Anything missing or of the wrong shape is read as absent.

use std::fs;
use std::path::Path;

use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::message::Message;

/// `subMsgType` values the exporter uses for bot messages.
const BOT_SUB_MSG_TYPES: &[i64] = &[577, 65];
const TEXT_ELEMENT: i64 = 1;
const UNKNOWN_CHAT: &str = "未知群聊";

#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub chat_name: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawTranscript {
    #[serde(alias = "chat_name")]
    chat_name: Option<String>,
    #[serde(alias = "chat_info")]
    chat_info: Option<RawChatInfo>,
    messages: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawChatInfo {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawMessage {
    #[serde(alias = "message_id")]
    message_id: Option<Value>,
    timestamp: Option<Value>,
    sender: Option<RawSender>,
    #[serde(alias = "send_member_name")]
    send_member_name: Option<String>,
    content: Option<Value>,
    #[serde(alias = "raw_message")]
    raw_message: Option<RawDetail>,
    mentions: Vec<Value>,
    #[serde(alias = "is_bot")]
    is_bot: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSender {
    uin: Option<Value>,
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawDetail {
    send_member_name: Option<String>,
    sub_msg_type: Option<i64>,
    elements: Vec<RawElement>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawElement {
    element_type: Option<i64>,
    text_element: Option<RawTextElement>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawTextElement {
    at_type: Option<i64>,
    at_uid: Option<Value>,
}

/// String or number rendered as a non-empty string.
fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl RawMessage {
    fn into_message(self) -> Message {
        let (sender_id, sender_name) = match self.sender {
            Some(s) => (s.uin.as_ref().and_then(scalar_string), s.name),
            None => (None, None),
        };

        let (text, reply_to) = match &self.content {
            Some(Value::Object(content)) => {
                let text = content
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                // a non-empty reply without a resolvable id still counts as a reply
                let reply_to = content
                    .get("reply")
                    .filter(|r| r.as_object().is_some_and(|o| !o.is_empty()))
                    .map(|r| {
                        r.get("referencedMessageId")
                            .or_else(|| r.get("referenced_message_id"))
                            .and_then(scalar_string)
                            .unwrap_or_default()
                    });
                (text, reply_to)
            }
            _ => (String::new(), None),
        };

        let mut mentions: Vec<String> = self.mentions.iter().filter_map(scalar_string).collect();
        let mut alt_name = non_empty(self.send_member_name);
        let mut is_bot = self.is_bot.unwrap_or(false);
        if let Some(raw) = self.raw_message {
            alt_name = alt_name.or_else(|| non_empty(raw.send_member_name));
            is_bot |= raw
                .sub_msg_type
                .is_some_and(|t| BOT_SUB_MSG_TYPES.contains(&t));
            mentions.extend(
                raw.elements
                    .iter()
                    .filter(|e| e.element_type == Some(TEXT_ELEMENT))
                    .filter_map(|e| e.text_element.as_ref())
                    .filter(|t| t.at_type.unwrap_or(0) > 0)
                    .filter_map(|t| t.at_uid.as_ref().and_then(scalar_string))
                    .filter(|uid| uid != "0"),
            );
        }

        Message {
            id: self.message_id.as_ref().and_then(scalar_string),
            timestamp: self.timestamp.as_ref().and_then(scalar_string),
            sender_id,
            sender_name,
            alt_name,
            text,
            reply_to,
            mentions,
            is_bot,
        }
    }
}

impl Transcript {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let raw: RawTranscript = serde_json::from_str(raw)?;
        let chat_name = non_empty(raw.chat_name)
            .or_else(|| raw.chat_info.and_then(|i| non_empty(i.name)))
            .unwrap_or_else(|| UNKNOWN_CHAT.to_string());

        let mut malformed = 0usize;
        let messages = raw
            .messages
            .into_iter()
            .map(|v| match serde_json::from_value::<RawMessage>(v) {
                Ok(m) => m.into_message(),
                Err(e) => {
                    debug!("unreadable message: {e}");
                    malformed += 1;
                    Message::default()
                }
            })
            .collect::<Vec<_>>();
        if malformed > 0 {
            warn!("{malformed} messages could not be read and are kept empty");
        }
        Ok(Transcript {
            chat_name,
            messages,
        })
    }
}

/// Read a chat export from disk.
pub fn load_transcript<P: AsRef<Path>>(path: P) -> Result<Transcript> {
    let raw = fs::read_to_string(path)?;
    Transcript::from_json_str(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_chat_export_shape() {
        let t = Transcript::from_json_str(
            r#"{
              "chatInfo": {"name": "摸鱼群"},
              "messages": [{
                "messageId": "m1",
                "timestamp": "2024-03-01T22:15:00.000Z",
                "sender": {"uin": 10001, "name": "阿强"},
                "content": {"text": "@小明 今晚开黑", "reply": {"referencedMessageId": "m0"}},
                "rawMessage": {
                  "sendMemberName": "强哥",
                  "subMsgType": 0,
                  "elements": [
                    {"elementType": 1, "textElement": {"atType": 2, "atUid": "10002"}},
                    {"elementType": 1, "textElement": {"atType": 0, "atUid": "10003"}},
                    {"elementType": 1, "textElement": {"atType": 2, "atUid": "0"}}
                  ]
                }
              }]
            }"#,
        )
        .unwrap();
        assert_eq!(t.chat_name, "摸鱼群");
        let m = &t.messages[0];
        assert_eq!(m.id.as_deref(), Some("m1"));
        assert_eq!(m.sender_id.as_deref(), Some("10001"));
        assert_eq!(m.alt_name.as_deref(), Some("强哥"));
        assert_eq!(m.reply_to.as_deref(), Some("m0"));
        assert_eq!(m.mentions, vec!["10002"]);
        assert!(!m.is_bot);
    }

    #[test]
    fn bot_sub_types_and_flags() {
        let t = Transcript::from_json_str(
            r#"{"messages": [
                {"rawMessage": {"subMsgType": 577}},
                {"is_bot": true},
                {"rawMessage": {"subMsgType": 1}}
            ]}"#,
        )
        .unwrap();
        let bots: Vec<bool> = t.messages.iter().map(|m| m.is_bot).collect();
        assert_eq!(bots, vec![true, true, false]);
        assert_eq!(t.chat_name, "未知群聊");
    }

    #[test]
    fn malformed_fields_degrade_to_absent() {
        let t = Transcript::from_json_str(
            r#"{"chat_name": "群", "messages": [
                {"content": "not an object", "timestamp": 1700000000},
                {"sender": "nobody"},
                {"content": {"reply": {}}},
                {"content": {"text": "x", "reply": {"senderUid": "u9"}}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(t.messages.len(), 4);
        assert_eq!(t.messages[0].text, "");
        assert_eq!(t.messages[0].timestamp.as_deref(), Some("1700000000"));
        assert_eq!(t.messages[1], Message::default());
        // an empty reply object is no reply
        assert_eq!(t.messages[2].reply_to, None);
        // reply present, target unknown
        assert_eq!(t.messages[3].reply_to.as_deref(), Some(""));
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(Transcript::from_json_str("{not json").is_err());
    }
}
