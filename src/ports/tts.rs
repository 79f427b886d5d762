//! Text-to-speech port.

use async_trait::async_trait;
use std::pin::Pin;
use tokio_stream::Stream;

use crate::error::Result;
use crate::value_objects::{AudioFormat, VoiceConfig};

/// Metadata for a voice available from a provider.
#[derive(Debug, Clone)]
pub struct VoiceMetadata {
    pub id: String,
    pub name: String,
    pub gender: String,
    pub locale: String,
}

/// A structured synthesis request with provider-specific escape hatches.
#[derive(Debug, Clone)]
pub struct TtsRequest {
    pub text: String,
    pub voice_id: String,
    pub language: String,
    pub voice: VoiceConfig,
    pub format: AudioFormat,
    pub backpressure_detected: bool,
    pub provider_options: serde_json::Map<String, serde_json::Value>,
}

pub type AudioChunkStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Interface for text-to-speech providers.
#[async_trait]
pub trait TtsPort: Send + Sync {
    /// Synthesize `text` to a complete audio buffer.
    async fn synthesize(&self, text: &str, voice: &VoiceConfig, format: &AudioFormat) -> Result<Vec<u8>>;

    /// Stream synthesized audio in provider-sized chunks.
    fn synthesize_stream(&self, text: &str, voice: &VoiceConfig, format: &AudioFormat) -> AudioChunkStream;

    /// Synthesize using a fully structured request.
    async fn synthesize_request(&self, request: &TtsRequest) -> Result<Vec<u8>>;

    /// Synthesize directly from SSML markup.
    async fn synthesize_ssml(&self, ssml: &str) -> Result<Vec<u8>>;

    /// Voices available from this provider, optionally filtered by language.
    async fn get_available_voices(&self, language: Option<&str>) -> Result<Vec<VoiceMetadata>>;

    /// Styles supported by a specific voice (e.g. "cheerful", "sad").
    async fn get_voice_styles(&self, voice_id: &str) -> Result<Vec<String>>;

    /// Release any provider-held resources.
    async fn close(&self) -> Result<()>;
}
