//! Barge-in handling: pure domain decision, no infrastructure dependencies.

use tracing::info;

/// What the orchestrator should do in response to a user interruption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BargeInCommand {
    pub clear_pipeline: bool,
    pub interrupt_audio: bool,
    pub reason: String,
}

/// Decide how to handle a user interruption during assistant speech.
///
/// User-speech-triggered reasons (containing `"vad"` or `"user"`) get a full
/// interruption: clear the pipeline and stop audio. Other reasons (e.g.
/// error recovery) interrupt audio but leave pipeline state intact.
pub fn handle_barge_in(reason: impl Into<String>) -> BargeInCommand {
    let reason = reason.into();
    info!(reason = reason.as_str(), "barge-in triggered");
    let lower = reason.to_lowercase();
    let full_interruption = lower.contains("vad") || lower.contains("user");
    BargeInCommand {
        clear_pipeline: full_interruption,
        interrupt_audio: true,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vad_detected_triggers_full_interruption() {
        let cmd = handle_barge_in("vad_detected");
        assert!(cmd.clear_pipeline);
        assert!(cmd.interrupt_audio);
    }

    #[test]
    fn user_spoke_triggers_full_interruption() {
        let cmd = handle_barge_in("user_spoke");
        assert!(cmd.clear_pipeline);
    }

    #[test]
    fn other_reasons_keep_pipeline_state() {
        let cmd = handle_barge_in("silence_timeout");
        assert!(!cmd.clear_pipeline);
        assert!(cmd.interrupt_audio);
    }
}
