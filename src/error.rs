//! Error types for the voice-agent runtime.

/// Top-level error type for the voice-agent core.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// Malformed value-object construction (speed/pitch/format/phone-number/etc).
    #[error("validation error: {0}")]
    Validation(String),

    /// A remote port (STT/LLM/TTS/Telephony) failed.
    #[error("{port} error (provider={provider:?}, retryable={retryable}): {source}")]
    Port {
        /// Which port failed, e.g. "stt", "llm", "tts", "telephony".
        port: &'static str,
        /// Provider tag, if the port implementation tags one.
        provider: Option<String>,
        /// Whether a fallback adapter should retry on a secondary provider.
        retryable: bool,
        /// Underlying cause.
        #[source]
        source: anyhow::Error,
    },

    /// FSM-adjacent error surfaced outside the `transition()` boolean contract.
    #[error("fsm error: {0}")]
    Fsm(String),

    /// Configuration load/parse error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Control channel error (closed, send failure).
    #[error("control channel error: {0}")]
    Channel(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, OrchestratorError>;
