//! Call aggregate root.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::{Agent, Conversation};
use crate::error::{OrchestratorError, Result};
use crate::value_objects::{CallId, PhoneNumber};

/// Call lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Initiated,
    Ringing,
    InProgress,
    Completed,
    Failed,
    Busy,
    NoAnswer,
}

/// Aggregate root for a voice-call session: owns lifecycle state and the
/// conversation history for that call.
#[derive(Debug, Clone)]
pub struct Call {
    pub id: CallId,
    pub agent: Agent,
    pub conversation: Conversation,
    pub status: CallStatus,
    pub phone_number: Option<PhoneNumber>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub metadata: serde_json::Map<String, Value>,
}

impl Call {
    pub fn new(id: CallId, agent: Agent, conversation: Conversation) -> Self {
        Self {
            id,
            agent,
            conversation,
            status: CallStatus::Initiated,
            phone_number: None,
            start_time: Utc::now(),
            end_time: None,
            metadata: serde_json::Map::new(),
        }
    }

    /// Mark the call in-progress.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::Fsm` if the call is not `Initiated` or
    /// `Ringing`.
    pub fn start(&mut self) -> Result<()> {
        if !matches!(self.status, CallStatus::Initiated | CallStatus::Ringing) {
            return Err(OrchestratorError::Fsm(format!(
                "cannot start call from status {:?}",
                self.status
            )));
        }
        self.status = CallStatus::InProgress;
        Ok(())
    }

    /// End the call, recording `reason` in metadata. Idempotent: calling this
    /// on an already-ended call is a no-op.
    pub fn end(&mut self, reason: impl Into<String>) {
        if matches!(self.status, CallStatus::Completed | CallStatus::Failed) {
            return;
        }
        let reason = reason.into();
        let is_failure = matches!(
            reason.to_lowercase().as_str(),
            "failed" | "error" | "timeout" | "system_error"
        );
        self.status = if is_failure {
            CallStatus::Failed
        } else {
            CallStatus::Completed
        };
        self.end_time = Some(Utc::now());
        self.metadata
            .insert("termination_reason".into(), Value::String(reason));
    }

    /// Duration so far (if still in progress) or the recorded final duration.
    pub fn duration_seconds(&self) -> f64 {
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - self.start_time).num_milliseconds() as f64 / 1000.0
    }

    pub fn update_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::VoiceConfig;

    fn make_call() -> Call {
        let voice = VoiceConfig::new("alloy", 1.0, 0.0, 100.0, "neutral", 1.0, "default").unwrap();
        let agent = Agent::new("support_v1", "You are helpful.", voice).unwrap();
        Call::new(CallId::new("call-1").unwrap(), agent, Conversation::new())
    }

    #[test]
    fn start_from_initiated_succeeds() {
        let mut call = make_call();
        call.start().unwrap();
        assert_eq!(call.status, CallStatus::InProgress);
    }

    #[test]
    fn start_from_in_progress_fails() {
        let mut call = make_call();
        call.start().unwrap();
        assert!(call.start().is_err());
    }

    #[test]
    fn end_is_idempotent() {
        let mut call = make_call();
        call.end("completed");
        let first_end_time = call.end_time;
        call.end("failed");
        assert_eq!(call.end_time, first_end_time);
        assert_eq!(call.status, CallStatus::Completed);
    }

    #[test]
    fn end_with_failure_reason_sets_failed_status() {
        let mut call = make_call();
        call.end("timeout");
        assert_eq!(call.status, CallStatus::Failed);
        assert_eq!(
            call.metadata.get("termination_reason"),
            Some(&Value::String("timeout".into()))
        );
    }

    #[test]
    fn duration_is_non_negative_before_end() {
        let call = make_call();
        assert!(call.duration_seconds() >= 0.0);
    }
}
