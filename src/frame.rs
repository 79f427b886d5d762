//! Tagged-union frames passed between pipeline processors.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// The role attached to a `Text` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// Severity of a `Backpressure` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackpressureSeverity {
    Warning,
    Critical,
}

/// The direction a frame travels through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDirection {
    /// Source toward sink (VAD -> STT -> LLM -> TTS).
    Downstream,
    /// Sink toward source; used for backpressure and TTS's last-resort emission.
    Upstream,
}

/// Priority class a frame variant belongs to. System frames are dispatched
/// ahead of data frames by processors that maintain internal queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FrameClass {
    Data = 0,
    Control = 1,
    System = 2,
}

/// A tagged-variant message flowing through the processor chain.
///
/// Every frame additionally carries identity/tracing metadata (`id`,
/// `timestamp`, `trace_id`, `metadata`) via [`FrameEnvelope`]; `Frame` itself
/// is the payload discriminant.
#[derive(Debug, Clone)]
pub enum Frame {
    // --- System frames (high priority) ---
    Start,
    End { reason: String },
    Cancel { reason: String },
    EndTask { task_id: String, result: String },
    Error { message: String, fatal: bool },
    Backpressure {
        queue_size: usize,
        max_size: usize,
        severity: BackpressureSeverity,
    },
    UserStartedSpeaking,
    UserStoppedSpeaking,

    // --- Data frames (normal priority) ---
    Audio {
        bytes: Vec<u8>,
        sample_rate: u32,
        channels: u16,
    },
    Text {
        text: String,
        is_final: bool,
        role: Role,
    },
    Image {
        bytes: Vec<u8>,
        mime_type: String,
    },
}

impl Frame {
    /// Which priority class this variant belongs to.
    pub fn class(&self) -> FrameClass {
        match self {
            Frame::Start
            | Frame::End { .. }
            | Frame::Cancel { .. }
            | Frame::EndTask { .. }
            | Frame::Error { .. }
            | Frame::Backpressure { .. }
            | Frame::UserStartedSpeaking
            | Frame::UserStoppedSpeaking => FrameClass::System,
            Frame::Audio { .. } | Frame::Text { .. } | Frame::Image { .. } => FrameClass::Data,
        }
    }

    /// The variant tag name, used for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Frame::Start => "Start",
            Frame::End { .. } => "End",
            Frame::Cancel { .. } => "Cancel",
            Frame::EndTask { .. } => "EndTask",
            Frame::Error { .. } => "Error",
            Frame::Backpressure { .. } => "Backpressure",
            Frame::UserStartedSpeaking => "UserStartedSpeaking",
            Frame::UserStoppedSpeaking => "UserStoppedSpeaking",
            Frame::Audio { .. } => "Audio",
            Frame::Text { .. } => "Text",
            Frame::Image { .. } => "Image",
        }
    }
}

/// Identity and tracing metadata wrapping a [`Frame`] payload.
#[derive(Debug, Clone)]
pub struct FrameEnvelope {
    /// Unique id for this frame instance.
    pub id: Uuid,
    /// When the frame was constructed.
    pub timestamp: DateTime<Utc>,
    /// Correlates this frame with the generation task / tool call that produced it.
    pub trace_id: String,
    /// Free-form metadata (e.g. `{"source": "stt"}`).
    pub metadata: HashMap<String, Value>,
    /// The payload.
    pub frame: Frame,
}

impl FrameEnvelope {
    /// Wrap a frame with a fresh id/timestamp and the given trace id.
    pub fn new(frame: Frame, trace_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            trace_id: trace_id.into(),
            metadata: HashMap::new(),
            frame,
        }
    }

    /// Attach a metadata entry, builder-style.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn name(&self) -> &'static str {
        self.frame.name()
    }

    pub fn class(&self) -> FrameClass {
        self.frame.class()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_frames_classify_as_system() {
        assert_eq!(Frame::Start.class(), FrameClass::System);
        assert_eq!(
            Frame::Cancel { reason: "x".into() }.class(),
            FrameClass::System
        );
        assert_eq!(Frame::UserStartedSpeaking.class(), FrameClass::System);
    }

    #[test]
    fn data_frames_classify_as_data() {
        let audio = Frame::Audio {
            bytes: vec![0, 1],
            sample_rate: 16_000,
            channels: 1,
        };
        assert_eq!(audio.class(), FrameClass::Data);
        let text = Frame::Text {
            text: "hi".into(),
            is_final: true,
            role: Role::User,
        };
        assert_eq!(text.class(), FrameClass::Data);
    }

    #[test]
    fn envelope_carries_trace_and_metadata() {
        let env = FrameEnvelope::new(Frame::Start, "trace-1")
            .with_metadata("source", serde_json::json!("stt"));
        assert_eq!(env.trace_id, "trace-1");
        assert_eq!(env.name(), "Start");
        assert_eq!(env.metadata.get("source"), Some(&serde_json::json!("stt")));
    }
}
