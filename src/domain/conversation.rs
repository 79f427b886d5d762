//! Conversation entity: the turn history for one call.

use serde_json::Value;

use crate::error::{OrchestratorError, Result};
use crate::value_objects::ConversationTurn;

/// An ordered history of conversation turns.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self { turns: Vec::new() }
    }

    pub fn add_turn(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    /// The most recent `limit` turns, for LLM context windowing. `None`
    /// returns the full history; `Some(0)` returns an empty slice.
    ///
    /// # Errors
    ///
    /// Never returns an error directly, but `limit` is validated upstream by
    /// callers that accept user-supplied values; this method itself cannot
    /// fail on a `usize` limit.
    pub fn context_window(&self, limit: Option<usize>) -> &[ConversationTurn] {
        match limit {
            None => &self.turns,
            Some(0) => &[],
            Some(n) if n >= self.turns.len() => &self.turns,
            Some(n) => &self.turns[self.turns.len() - n..],
        }
    }

    pub fn history_as_dicts(&self) -> Vec<serde_json::Map<String, Value>> {
        self.turns.iter().map(ConversationTurn::to_dict).collect()
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }
}

/// Validate a requested context-window limit (rejects negative values,
/// which the Rust `usize` type already precludes at the type level, kept
/// for parity with callers that parse the limit from untrusted input).
pub fn validate_limit(limit: i64) -> Result<usize> {
    if limit < 0 {
        return Err(OrchestratorError::Validation(
            "context window limit must be non-negative".into(),
        ));
    }
    Ok(limit as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::ConversationRole;

    fn turn(content: &str) -> ConversationTurn {
        ConversationTurn::new(ConversationRole::User, content)
    }

    #[test]
    fn context_window_returns_most_recent() {
        let mut conv = Conversation::new();
        for i in 0..5 {
            conv.add_turn(turn(&format!("turn {i}")));
        }
        let window = conv.context_window(Some(2));
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].content, "turn 3");
        assert_eq!(window[1].content, "turn 4");
    }

    #[test]
    fn context_window_none_returns_all() {
        let mut conv = Conversation::new();
        conv.add_turn(turn("hello"));
        assert_eq!(conv.context_window(None).len(), 1);
    }

    #[test]
    fn context_window_zero_returns_empty() {
        let mut conv = Conversation::new();
        conv.add_turn(turn("hello"));
        assert_eq!(conv.context_window(Some(0)).len(), 0);
    }

    #[test]
    fn turn_count_tracks_additions() {
        let mut conv = Conversation::new();
        assert_eq!(conv.turn_count(), 0);
        conv.add_turn(turn("hi"));
        assert_eq!(conv.turn_count(), 1);
    }

    #[test]
    fn validate_limit_rejects_negative() {
        assert!(validate_limit(-1).is_err());
        assert!(validate_limit(10).is_ok());
    }
}
