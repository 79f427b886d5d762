//! Conversation finite-state-machine.

use tracing::info;

/// The conversation state. `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversationState {
    Idle,
    Listening,
    Processing,
    Speaking,
    Interrupted,
    Ended,
}

impl ConversationState {
    fn is_valid_transition(self, target: ConversationState) -> bool {
        use ConversationState::{Ended, Idle, Interrupted, Listening, Processing, Speaking};
        if target == Ended {
            return self != Ended;
        }
        matches!(
            (self, target),
            (Idle, Listening)
                | (Listening, Processing)
                | (Listening, Speaking)
                | (Listening, Interrupted)
                | (Processing, Speaking)
                | (Processing, Interrupted)
                | (Processing, Listening)
                | (Speaking, Listening)
                | (Speaking, Interrupted)
                | (Interrupted, Listening)
                | (Interrupted, Processing)
        )
    }
}

/// Owns the current [`ConversationState`] and enforces the transition table.
#[derive(Debug)]
pub struct ConversationFsm {
    state: ConversationState,
}

impl Default for ConversationFsm {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationFsm {
    pub fn new() -> Self {
        Self {
            state: ConversationState::Idle,
        }
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    /// Attempt a transition. Returns `false` and leaves state unchanged if
    /// `(state, target)` is not in the transition table; returns `true` and
    /// applies the transition otherwise.
    pub fn transition(&mut self, target: ConversationState, reason: &str) -> bool {
        if !self.state.is_valid_transition(target) {
            info!(
                from = ?self.state,
                to = ?target,
                reason,
                "rejected invalid FSM transition"
            );
            return false;
        }
        info!(from = ?self.state, to = ?target, reason, "FSM transition");
        self.state = target;
        true
    }

    pub fn can_speak(&self) -> bool {
        matches!(
            self.state,
            ConversationState::Listening | ConversationState::Processing | ConversationState::Speaking
        )
    }

    pub fn can_interrupt(&self) -> bool {
        matches!(
            self.state,
            ConversationState::Speaking | ConversationState::Processing | ConversationState::Listening
        )
    }

    pub fn can_process(&self) -> bool {
        matches!(
            self.state,
            ConversationState::Listening | ConversationState::Interrupted
        )
    }

    /// Reset back to `Idle` regardless of current state (used between calls
    /// sharing an orchestrator instance in tests; production orchestrators
    /// are one-per-call and are simply dropped).
    pub fn reset(&mut self) {
        self.state = ConversationState::Idle;
    }
}
