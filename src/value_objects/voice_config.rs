//! Voice configuration value object.

use crate::error::{OrchestratorError, Result};

/// Immutable, validated voice configuration passed to TTS synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceConfig {
    pub name: String,
    pub speed: f32,
    pub pitch: f32,
    pub volume: f32,
    pub style: String,
    pub style_degree: f32,
    pub provider: String,
}

impl VoiceConfig {
    /// Construct and validate a new `VoiceConfig`.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::Validation` if `speed`, `pitch`, `volume`,
    /// or `style_degree` fall outside their documented ranges.
    pub fn new(
        name: impl Into<String>,
        speed: f32,
        pitch: f32,
        volume: f32,
        style: impl Into<String>,
        style_degree: f32,
        provider: impl Into<String>,
    ) -> Result<Self> {
        if !(0.5..=2.0).contains(&speed) {
            return Err(OrchestratorError::Validation(format!(
                "voice speed out of range [0.5, 2.0]: {speed}"
            )));
        }
        if !(-100.0..=100.0).contains(&pitch) {
            return Err(OrchestratorError::Validation(format!(
                "voice pitch out of range [-100, 100]: {pitch}"
            )));
        }
        if !(0.0..=100.0).contains(&volume) {
            return Err(OrchestratorError::Validation(format!(
                "voice volume out of range [0, 100]: {volume}"
            )));
        }
        if !(0.01..=2.0).contains(&style_degree) {
            return Err(OrchestratorError::Validation(format!(
                "voice style_degree out of range [0.01, 2.0]: {style_degree}"
            )));
        }
        Ok(Self {
            name: name.into(),
            speed,
            pitch,
            volume,
            style: style.into(),
            style_degree,
            provider: provider.into(),
        })
    }
}
