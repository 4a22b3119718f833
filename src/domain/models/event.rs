//! Stream protocol events
//!
//! One completion request produces `Init (QueryRewrite* Search)? Answer* End`,
//! each event serialized as a single NDJSON record:
//!
//! ```json
//! {"kind": "Answer", "data": {"content": "Hi"}}
//! ```

use serde::{Deserialize, Serialize};

use super::search::Attachment;

/// Seconds since the Unix epoch, with sub-second precision
pub fn epoch_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitData {
    pub chat_id: String,
    pub message_id: String,
    pub created_at: f64,
}

/// One fragment of streamed model text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub content: String,
}

/// Terminal status carried by the End event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum EndReason {
    /// Pipeline reached natural exhaustion
    Completed,
    /// Halted, or a stage failed
    Aborted,
}

impl EndReason {
    pub fn code(&self) -> i32 {
        match self {
            EndReason::Completed => 0,
            EndReason::Aborted => -1,
        }
    }
}

impl From<EndReason> for i32 {
    fn from(reason: EndReason) -> Self {
        reason.code()
    }
}

impl TryFrom<i32> for EndReason {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(EndReason::Completed),
            -1 => Ok(EndReason::Aborted),
            other => Err(format!("unknown end_reason: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndData {
    pub completion_time: f64,
    pub end_reason: EndReason,
}

/// Event kinds, in protocol order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Init,
    QueryRewrite,
    Search,
    Answer,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum ChatEvent {
    Init(InitData),
    QueryRewrite(TextFragment),
    Search(Attachment),
    Answer(TextFragment),
    End(EndData),
}

impl ChatEvent {
    pub fn init(chat_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self::Init(InitData {
            chat_id: chat_id.into(),
            message_id: message_id.into(),
            created_at: epoch_seconds(),
        })
    }

    pub fn query_rewrite(content: impl Into<String>) -> Self {
        Self::QueryRewrite(TextFragment {
            content: content.into(),
        })
    }

    pub fn search(attachment: Attachment) -> Self {
        Self::Search(attachment)
    }

    pub fn answer(content: impl Into<String>) -> Self {
        Self::Answer(TextFragment {
            content: content.into(),
        })
    }

    pub fn end(reason: EndReason) -> Self {
        Self::End(EndData {
            completion_time: epoch_seconds(),
            end_reason: reason,
        })
    }

    pub fn kind(&self) -> EventKind {
        match self {
            ChatEvent::Init(_) => EventKind::Init,
            ChatEvent::QueryRewrite(_) => EventKind::QueryRewrite,
            ChatEvent::Search(_) => EventKind::Search,
            ChatEvent::Answer(_) => EventKind::Answer,
            ChatEvent::End(_) => EventKind::End,
        }
    }

    /// Convert to NDJSON line (newline included)
    pub fn to_ndjson(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_answer_wire_shape() {
        let value = serde_json::to_value(ChatEvent::answer("Hi")).unwrap();
        assert_eq!(value, json!({"kind": "Answer", "data": {"content": "Hi"}}));
    }

    #[test]
    fn test_query_rewrite_kind_name() {
        let value = serde_json::to_value(ChatEvent::query_rewrite("q")).unwrap();
        assert_eq!(value["kind"], "QueryRewrite");
    }

    #[test]
    fn test_init_payload() {
        let event = ChatEvent::init("c1", "m1");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"], "Init");
        assert_eq!(value["data"]["chat_id"], "c1");
        assert_eq!(value["data"]["message_id"], "m1");
        assert!(value["data"]["created_at"].as_f64().unwrap() > 1_600_000_000.0);
    }

    #[test]
    fn test_end_reason_is_integer() {
        let value = serde_json::to_value(ChatEvent::end(EndReason::Aborted)).unwrap();
        assert_eq!(value["data"]["end_reason"], -1);

        let value = serde_json::to_value(ChatEvent::end(EndReason::Completed)).unwrap();
        assert_eq!(value["data"]["end_reason"], 0);
        assert!(value["data"]["completion_time"].is_f64());
    }

    #[test]
    fn test_end_reason_rejects_unknown_code() {
        let parsed: Result<EndData, _> =
            serde_json::from_value(json!({"completion_time": 1.0, "end_reason": 3}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_ndjson_is_single_line() {
        let line = ChatEvent::answer("multi\nline").to_ndjson().unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);

        let parsed: ChatEvent = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(parsed.kind(), EventKind::Answer);
    }
}
