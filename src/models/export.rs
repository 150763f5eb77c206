use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Root of a persisted conversation capture
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Export {
    /// Opaque format version, used for diagnostic grouping only.
    /// Any JSON value is accepted and written back unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_version: Option<Value>,
    /// Capture timestamp as written by the exporter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_timestamp: Option<Value>,
    /// Stored exchange count (not recomputed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_count: Option<Value>,
    /// Total messages across all exchanges
    #[serde(default, deserialize_with = "null_as_default")]
    pub message_count: usize,
    /// Conversation turns in capture order
    #[serde(default, deserialize_with = "null_as_default")]
    pub exchanges: Vec<Exchange>,
    /// Raw captured document, present only for some captures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_html: Option<String>,
    /// Fields this crate does not interpret, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Export {
    /// `export_version` rendered for grouping
    pub fn version_label(&self) -> Option<String> {
        self.export_version.as_ref().and_then(render_opaque)
    }

    pub fn timestamp_label(&self) -> Option<String> {
        self.export_timestamp.as_ref().and_then(render_opaque)
    }

    /// `exchange_count` as stored, 0 when absent or not a count
    pub fn stored_exchange_count(&self) -> usize {
        match &self.exchange_count {
            Some(Value::Number(n)) => n.as_u64().map_or(0, |n| n as usize),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    /// Sum of messages across all exchanges as they currently stand
    pub fn total_messages(&self) -> usize {
        self.exchanges.iter().map(|e| e.messages.len()).sum()
    }

    /// Number of stages held in structured thinking messages
    pub fn structured_stage_count(&self) -> usize {
        self.exchanges
            .iter()
            .flat_map(|e| e.messages.iter())
            .filter_map(Message::thinking_stages)
            .map(<[Stage]>::len)
            .sum()
    }
}

/// One conversational turn
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Exchange {
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<Message>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Exchange {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            extra: Map::new(),
        }
    }

    /// The thinking message of this exchange, if any
    pub fn thinking(&self) -> Option<&Message> {
        self.messages
            .iter()
            .find(|m| m.message_type == MessageType::Thinking)
    }

    /// Stages of the thinking message, empty when there is none
    pub fn thinking_stages(&self) -> &[Stage] {
        self.thinking()
            .and_then(Message::thinking_stages)
            .unwrap_or(&[])
    }

    /// Rewrite `message_index` so it is contiguous from zero
    pub fn renumber(&mut self) {
        for (index, message) in self.messages.iter_mut().enumerate() {
            message.message_index = Some(index);
        }
    }
}

/// Wire value of `message_type`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageType {
    Thinking,
    AssistantResponse,
    /// Any other kind (user prompts, system notes); passed through untouched
    Other(String),
}

impl MessageType {
    fn is_unset(&self) -> bool {
        matches!(self, MessageType::Other(s) if s.is_empty())
    }
}

impl Default for MessageType {
    fn default() -> Self {
        MessageType::Other(String::new())
    }
}

impl From<String> for MessageType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "thinking" => MessageType::Thinking,
            "assistant_response" => MessageType::AssistantResponse,
            _ => MessageType::Other(value),
        }
    }
}

impl From<MessageType> for String {
    fn from(value: MessageType) -> Self {
        match value {
            MessageType::Thinking => "thinking".to_string(),
            MessageType::AssistantResponse => "assistant_response".to_string(),
            MessageType::Other(s) => s,
        }
    }
}

/// A message as stored on the wire
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "MessageType::is_unset")]
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_stages: Option<Vec<Stage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Typed view over a [`Message`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MessageKind<'a> {
    /// Reasoning, possibly with no stages at all
    Thinking(&'a [Stage]),
    /// Final visible answer
    Response(&'a str),
    Other,
}

impl Message {
    pub fn thinking(stages: Vec<Stage>) -> Self {
        Self {
            message_type: MessageType::Thinking,
            thinking_stages: Some(stages),
            ..Default::default()
        }
    }

    pub fn response(text: impl Into<String>) -> Self {
        Self {
            message_type: MessageType::AssistantResponse,
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn kind(&self) -> MessageKind<'_> {
        match self.message_type {
            MessageType::Thinking => {
                MessageKind::Thinking(self.thinking_stages.as_deref().unwrap_or(&[]))
            }
            MessageType::AssistantResponse => {
                MessageKind::Response(self.text.as_deref().unwrap_or(""))
            }
            MessageType::Other(_) => MessageKind::Other,
        }
    }

    /// Stages if this is a thinking message
    pub fn thinking_stages(&self) -> Option<&[Stage]> {
        match self.kind() {
            MessageKind::Thinking(stages) => Some(stages),
            _ => None,
        }
    }

    /// Text if this is a response message
    pub fn response_text(&self) -> Option<&str> {
        match self.kind() {
            MessageKind::Response(text) => Some(text),
            _ => None,
        }
    }
}

/// A named segment of reasoning
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Stage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub stage_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Stage {
    pub fn new(stage_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            stage_name: stage_name.into(),
            text: text.into(),
            extra: Map::new(),
        }
    }
}

/// Strings as-is, other scalars in their JSON form
fn render_opaque(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Treat an explicit JSON `null` the same as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_export() {
        let json = r#"{
            "export_version": "2.1",
            "message_count": 2,
            "exchanges": [{
                "messages": [
                    {"message_type": "thinking", "message_index": 0,
                     "thinking_stages": [{"stage_name": "Clarifying the request", "text": "The user wants..."}]},
                    {"message_type": "assistant_response", "message_index": 1, "text": "Here you go."}
                ]
            }]
        }"#;

        let export: Export = serde_json::from_str(json).unwrap();

        assert_eq!(export.version_label().as_deref(), Some("2.1"));
        assert_eq!(export.exchanges.len(), 1);
        let exchange = &export.exchanges[0];
        assert_eq!(exchange.thinking_stages().len(), 1);
        assert_eq!(
            exchange.thinking_stages()[0].stage_name,
            "Clarifying the request"
        );
        assert_eq!(exchange.messages[1].kind(), MessageKind::Response("Here you go."));
        assert_eq!(export.structured_stage_count(), 1);
    }

    #[test]
    fn test_missing_fields_default() {
        let export: Export = serde_json::from_str(r#"{"export_version": "1.0"}"#).unwrap();
        assert!(export.exchanges.is_empty());
        assert_eq!(export.message_count, 0);
        assert!(export.raw_html.is_none());

        let export: Export = serde_json::from_str(r#"{"exchanges": null}"#).unwrap();
        assert!(export.exchanges.is_empty());
    }

    #[test]
    fn test_non_string_header_fields() {
        let json = r#"{"export_version": 2.1, "export_timestamp": 1735787045, "exchange_count": 4, "exchanges": []}"#;
        let export: Export = serde_json::from_str(json).unwrap();

        assert_eq!(export.version_label().as_deref(), Some("2.1"));
        assert_eq!(export.timestamp_label().as_deref(), Some("1735787045"));
        assert_eq!(export.stored_exchange_count(), 4);

        // Written back with the original types
        let value = serde_json::to_value(&export).unwrap();
        assert_eq!(value["export_version"], 2.1);
        assert_eq!(value["export_timestamp"], 1735787045);
        assert_eq!(value["exchange_count"], 4);
    }

    #[test]
    fn test_odd_exchange_count() {
        let export: Export =
            serde_json::from_str(r#"{"exchange_count": "7", "export_version": null}"#).unwrap();
        assert_eq!(export.stored_exchange_count(), 7);
        assert_eq!(export.version_label(), None);

        let export: Export = serde_json::from_str(r#"{"exchange_count": -1}"#).unwrap();
        assert_eq!(export.stored_exchange_count(), 0);
    }

    #[test]
    fn test_thinking_without_stages() {
        let json = r#"{"message_type": "thinking", "thinking_stages": null}"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.kind(), MessageKind::Thinking(&[]));
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let json = r#"{
            "export_version": "3.0",
            "title": "Some chat",
            "exchanges": [{
                "prompt": "hi",
                "messages": [
                    {"message_type": "user_prompt", "text": "hi", "author": "me"},
                    {"message_type": "thinking", "thinking_stages": [
                        {"stage_name": "A", "text": "b", "stage_index": 4}
                    ]}
                ]
            }]
        }"#;

        let export: Export = serde_json::from_str(json).unwrap();
        let value = serde_json::to_value(&export).unwrap();

        assert_eq!(value["title"], "Some chat");
        assert_eq!(value["exchanges"][0]["prompt"], "hi");
        assert_eq!(value["exchanges"][0]["messages"][0]["message_type"], "user_prompt");
        assert_eq!(value["exchanges"][0]["messages"][0]["author"], "me");
        assert_eq!(
            value["exchanges"][0]["messages"][1]["thinking_stages"][0]["stage_index"],
            4
        );
        assert_eq!(export.exchanges[0].messages[0].kind(), MessageKind::Other);
    }

    #[test]
    fn test_renumber() {
        let mut exchange = Exchange::new(vec![
            Message::thinking(vec![]),
            Message::response("a"),
        ]);
        exchange.messages[0].message_index = Some(3);
        exchange.renumber();
        let indices: Vec<_> = exchange.messages.iter().map(|m| m.message_index).collect();
        assert_eq!(indices, vec![Some(0), Some(1)]);
    }
}
