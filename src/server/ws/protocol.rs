use serde::Deserialize;
use serde_json::{json, Value};

use crate::rag::QueryOutcome;

#[derive(Debug, Deserialize, Default)]
pub struct WsIncomingMessage {
    #[serde(rename = "type")]
    pub msg_type: Option<String>,
    pub question: Option<String>,
    #[serde(rename = "systemPrompt")]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WsCommand {
    Ask {
        question: String,
        system_prompt: Option<String>,
    },
    Reset,
}

impl WsCommand {
    /// A frame is either a JSON object or a bare question string.
    pub fn parse(text: &str) -> WsCommand {
        let incoming = match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => {
                serde_json::from_value::<WsIncomingMessage>(Value::Object(map)).unwrap_or_default()
            }
            Ok(Value::String(question)) => WsIncomingMessage {
                question: Some(question),
                ..WsIncomingMessage::default()
            },
            _ => WsIncomingMessage {
                question: Some(text.to_string()),
                ..WsIncomingMessage::default()
            },
        };

        match incoming.msg_type.as_deref() {
            Some("reset") => WsCommand::Reset,
            _ => WsCommand::Ask {
                question: incoming.question.unwrap_or_default(),
                system_prompt: incoming.system_prompt,
            },
        }
    }
}

pub fn reply(outcome: &QueryOutcome) -> Value {
    json!({
        "type": "reply",
        "answer": outcome.answer,
        "hits": outcome.hits,
        "tokens": outcome.tokens,
        "conversationId": outcome.conversation_id,
    })
}

pub fn error_reply(message: &str) -> Value {
    json!({ "type": "reply", "error": message })
}

pub fn reset_reply() -> Value {
    json!({ "type": "reply", "ok": true, "reset": true })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_message_and_reset() {
        assert_eq!(
            WsCommand::parse(r#"{"type":"message","question":"전시 추천","systemPrompt":"짧게"}"#),
            WsCommand::Ask {
                question: "전시 추천".to_string(),
                system_prompt: Some("짧게".to_string()),
            }
        );
        assert_eq!(WsCommand::parse(r#"{"type":"reset"}"#), WsCommand::Reset);
    }

    #[test]
    fn bare_strings_are_questions() {
        assert_eq!(
            WsCommand::parse(r#""주말 공연""#),
            WsCommand::Ask {
                question: "주말 공연".to_string(),
                system_prompt: None,
            }
        );
        assert_eq!(
            WsCommand::parse("plain text"),
            WsCommand::Ask {
                question: "plain text".to_string(),
                system_prompt: None,
            }
        );
    }
}
