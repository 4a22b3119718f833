use serde::{Deserialize, Serialize};

/// Author of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Message in a conversation, as supplied by the caller.
///
/// `attachment` is carried through untouched; the streaming core never
/// interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<serde_json::Value>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            attachment: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            attachment: None,
        }
    }
}

/// Chat completion request payload
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatRequest {
    /// Run the rewrite -> search -> answer pipeline instead of a plain answer
    pub rag_enable: bool,
    pub chat_id: String,
    pub message_id: String,
    pub query: Vec<Message>,
}

impl ChatRequest {
    /// Reject requests the pipeline cannot run on
    pub fn validate(&self) -> Result<(), String> {
        if self.chat_id.trim().is_empty() {
            return Err("chat_id must not be empty".to_string());
        }
        if self.query.is_empty() {
            return Err("query must not be empty".to_string());
        }
        Ok(())
    }

    /// Most recent user turn, falling back to the first message
    pub fn latest_user_query(&self) -> &str {
        self.query
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .or_else(|| self.query.first())
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}
