//! Speech-to-text port.

use async_trait::async_trait;
use std::pin::Pin;
use tokio_stream::Stream;

use crate::error::Result;
use crate::value_objects::AudioFormat;

/// Why a streaming STT result arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SttResultReason {
    RecognizedSpeech,
    RecognizingSpeech,
    Canceled,
    Unknown,
}

/// One event emitted by an [`SttSession`].
#[derive(Debug, Clone)]
pub struct SttEvent {
    pub reason: SttResultReason,
    pub text: String,
    pub duration_secs: f64,
    pub error_details: Option<String>,
}

/// Tuning knobs for a streaming recognition session.
#[derive(Debug, Clone)]
pub struct SttConfig {
    pub language: String,
    pub initial_silence_ms: u32,
    pub segmentation_silence_ms: u32,
    pub model: String,
    pub punctuation: bool,
    pub profanity_filter: bool,
    pub smart_formatting: bool,
    pub diarization: bool,
    pub multilingual: bool,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            language: "en-US".into(),
            initial_silence_ms: 5000,
            segmentation_silence_ms: 1000,
            model: "default".into(),
            punctuation: true,
            profanity_filter: true,
            smart_formatting: true,
            diarization: false,
            multilingual: false,
        }
    }
}

pub type SttEventStream = Pin<Box<dyn Stream<Item = SttEvent> + Send>>;

/// A live, continuous recognition session returned by [`SttPort::start_stream`].
#[async_trait]
pub trait SttSession: Send + Sync {
    /// Push raw audio bytes to the recognizer.
    async fn process_audio(&self, audio_chunk: &[u8]) -> Result<()>;

    /// The stream of recognition events for this session.
    fn events(&self) -> SttEventStream;

    /// Close the session and release provider-side resources.
    async fn close(&self) -> Result<()>;
}

/// Interface for speech-to-text providers: one-shot transcription and
/// continuous streaming recognition.
#[async_trait]
pub trait SttPort: Send + Sync {
    /// Transcribe a complete, already-buffered audio clip.
    async fn transcribe(&self, audio: &[u8], format: &AudioFormat, language: &str) -> Result<String>;

    /// Start a real-time recognition session over `format`-encoded audio.
    async fn start_stream(
        &self,
        format: &AudioFormat,
        config: Option<SttConfig>,
    ) -> Result<Box<dyn SttSession>>;

    /// Release any provider-held resources (connection pools, model handles).
    async fn close(&self) -> Result<()>;
}
