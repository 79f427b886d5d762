//! Conversation turn value object.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{OrchestratorError, Result};

/// The speaker role of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversationRole {
    User,
    Assistant,
    System,
    Tool,
}

impl ConversationRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationRole::User => "user",
            ConversationRole::Assistant => "assistant",
            ConversationRole::System => "system",
            ConversationRole::Tool => "tool",
        }
    }
}

/// A single, immutable turn in a conversation.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub role: ConversationRole,
    pub content: String,
    pub tool_calls: Option<Vec<Value>>,
    pub tool_results: Option<Vec<Value>>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// Construct a new turn with the current timestamp.
    pub fn new(role: ConversationRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            tool_results: None,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_tool_calls(mut self, tool_calls: Vec<Value>) -> Self {
        self.tool_calls = Some(tool_calls);
        self
    }

    #[must_use]
    pub fn with_tool_results(mut self, tool_results: Vec<Value>) -> Self {
        self.tool_results = Some(tool_results);
        self
    }

    /// Convert to a `{role, content}`-shaped map for LLM context, including
    /// `tool_calls`/`tool_results` when present.
    pub fn to_dict(&self) -> serde_json::Map<String, Value> {
        let mut map = serde_json::Map::new();
        map.insert("role".into(), Value::String(self.role.as_str().into()));
        map.insert("content".into(), Value::String(self.content.clone()));
        if let Some(ref calls) = self.tool_calls {
            map.insert("tool_calls".into(), Value::Array(calls.clone()));
        }
        if let Some(ref results) = self.tool_results {
            map.insert("tool_results".into(), Value::Array(results.clone()));
        }
        map
    }
}

/// Validate a role string against the four supported roles.
pub fn parse_role(role: &str) -> Result<ConversationRole> {
    match role {
        "user" => Ok(ConversationRole::User),
        "assistant" => Ok(ConversationRole::Assistant),
        "system" => Ok(ConversationRole::System),
        "tool" => Ok(ConversationRole::Tool),
        other => Err(OrchestratorError::Validation(format!(
            "invalid role: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_dict_omits_absent_tool_fields() {
        let turn = ConversationTurn::new(ConversationRole::User, "hello");
        let dict = turn.to_dict();
        assert_eq!(dict.get("role"), Some(&Value::String("user".into())));
        assert!(!dict.contains_key("tool_calls"));
        assert!(!dict.contains_key("tool_results"));
    }

    #[test]
    fn to_dict_includes_tool_fields_when_present() {
        let turn = ConversationTurn::new(ConversationRole::Assistant, "[TOOL_CALL: lookup]")
            .with_tool_calls(vec![serde_json::json!({"name": "lookup"})]);
        let dict = turn.to_dict();
        assert!(dict.contains_key("tool_calls"));
    }

    #[test]
    fn parse_role_rejects_unknown() {
        assert!(parse_role("narrator").is_err());
    }
}
