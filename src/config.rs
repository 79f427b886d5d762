//! Configuration types for the voice-agent runtime.

use serde::{Deserialize, Serialize};

/// Top-level configuration for one call's pipeline + orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Voice-activity-detection tunables.
    pub vad: VadConfig,
    /// Speech-to-text tunables.
    pub stt: SttConfig,
    /// Language-model generation defaults.
    pub llm: LlmConfig,
    /// Text-to-speech defaults.
    pub tts: TtsConfig,
    /// Orchestrator-level watchdogs and channel sizing.
    pub orchestrator: OrchestratorConfig,
    /// Transport/client hint used to resolve `AudioFormat` presets.
    pub client_type: Option<String>,
}

/// Voice activity detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    /// Confidence above which a chunk counts toward onset (default 0.5).
    pub threshold_start: f32,
    /// Confidence below which a chunk counts toward offset (default 0.35).
    pub threshold_return: f32,
    /// Consecutive over-threshold chunks required to confirm onset.
    pub min_speech_frames: u32,
    /// Confirmation window in ms; onset only fires once this much time has
    /// elapsed since the first over-threshold chunk (see the two-phase
    /// confirmation note on the VAD processor).
    pub confirmation_window_ms: u32,
    /// Approximate duration of one VAD chunk in ms, used to convert
    /// `silence_frames` into `silence_ms` for `detect_turn_end`.
    pub chunk_duration_ms: u32,
    /// Silence duration (ms) that ends the current user turn.
    pub silence_timeout_ms: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            threshold_start: 0.5,
            threshold_return: 0.35,
            min_speech_frames: 3,
            confirmation_window_ms: 96,
            chunk_duration_ms: 32,
            silence_timeout_ms: 500,
        }
    }
}

/// Speech-to-text configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// Provider-facing model identifier (opaque to the core).
    pub model_id: String,
    /// BCP-47 language hint.
    pub language: String,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model_id: "default".to_owned(),
            language: "en-US".to_owned(),
        }
    }
}

/// Language model generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model identifier requested of the LLM port.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum tokens to generate per response.
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "llama-3.3-70b-versatile".to_owned(),
            temperature: 0.7,
            max_tokens: 600,
        }
    }
}

/// Text-to-speech defaults, read tolerantly when building a `VoiceConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Default voice name.
    pub voice_name: String,
    /// Default speed multiplier (0.5-2.0).
    pub voice_speed: f32,
    /// Default pitch shift in Hz (-100..100).
    pub voice_pitch: f32,
    /// Default volume (0..100).
    pub voice_volume: f32,
    /// Default style label.
    pub voice_style: String,
    /// Default style degree (0.01-2.0).
    pub voice_style_degree: f32,
    /// Default provider tag.
    pub provider: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            voice_name: "default".to_owned(),
            voice_speed: 1.0,
            voice_pitch: 0.0,
            voice_volume: 100.0,
            voice_style: "neutral".to_owned(),
            voice_style_degree: 1.0,
            provider: "default".to_owned(),
        }
    }
}

/// Orchestrator-level watchdog and channel sizing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Seconds of no interaction before `EmergencyStop{reason:"idle_timeout"}`.
    pub idle_timeout_secs: u64,
    /// Maximum call duration in seconds before `EmergencyStop{reason:"max_duration_exceeded"}`.
    pub max_duration_secs: u64,
    /// Bounded control-channel capacity.
    pub control_channel_capacity: usize,
    /// Default per-tool-call timeout in seconds.
    pub tool_timeout_secs: f64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 30,
            max_duration_secs: 600,
            control_channel_capacity: 100,
            tool_timeout_secs: 10.0,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| crate::error::OrchestratorError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::OrchestratorError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Tolerant lookup into a JSON object that accepts either snake_case or
/// camelCase spellings of a key. Returns the first key that is present.
///
/// Centralising this (per the design note on configuration access) means
/// call sites only ever spell the snake_case key; the camelCase alias is
/// derived mechanically.
pub fn tolerant_lookup<'a>(
    map: &'a serde_json::Map<String, serde_json::Value>,
    snake_key: &str,
) -> Option<&'a serde_json::Value> {
    if let Some(v) = map.get(snake_key) {
        return Some(v);
    }
    let camel = snake_to_camel(snake_key);
    map.get(&camel)
}

fn snake_to_camel(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = false;
    for ch in s.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}
