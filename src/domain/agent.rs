//! Agent entity: configuration for one conversational persona.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{OrchestratorError, Result};
use crate::value_objects::VoiceConfig;

/// The configuration for an AI agent persona: prompt, voice, tools, and
/// LLM settings, decoupled from however it was persisted.
#[derive(Debug, Clone)]
pub struct Agent {
    pub name: String,
    pub system_prompt: String,
    pub voice_config: VoiceConfig,
    pub first_message: String,
    pub silence_timeout_ms: u32,
    pub tools: Vec<Value>,
    pub llm_config: serde_json::Map<String, Value>,
    pub metadata: serde_json::Map<String, Value>,
    pub agent_uuid: Option<String>,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Agent {
    /// Construct a new `Agent` with default `silence_timeout_ms` of 1000.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::Validation` if `name` or `system_prompt`
    /// is empty.
    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        voice_config: VoiceConfig,
    ) -> Result<Self> {
        let name = name.into();
        let system_prompt = system_prompt.into();
        if name.is_empty() {
            return Err(OrchestratorError::Validation(
                "agent name cannot be empty".into(),
            ));
        }
        if system_prompt.is_empty() {
            return Err(OrchestratorError::Validation(
                "agent system prompt cannot be empty".into(),
            ));
        }
        Ok(Self {
            name,
            system_prompt,
            voice_config,
            first_message: String::new(),
            silence_timeout_ms: 1000,
            tools: Vec::new(),
            llm_config: serde_json::Map::new(),
            metadata: serde_json::Map::new(),
            agent_uuid: None,
            is_active: false,
            created_at: None,
        })
    }

    /// Override the default silence timeout.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::Validation` if `ms` is zero.
    pub fn with_silence_timeout_ms(mut self, ms: u32) -> Result<Self> {
        if ms == 0 {
            return Err(OrchestratorError::Validation(
                "silence timeout must be positive".into(),
            ));
        }
        self.silence_timeout_ms = ms;
        Ok(self)
    }

    /// The initial greeting, if one is configured.
    pub fn get_greeting(&self) -> Option<&str> {
        if self.first_message.is_empty() {
            None
        } else {
            Some(&self.first_message)
        }
    }

    /// Replace the system prompt (e.g. with dynamic style overrides spliced
    /// in for this session).
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::Validation` if `new_prompt` is empty.
    pub fn update_system_prompt(&mut self, new_prompt: impl Into<String>) -> Result<()> {
        let new_prompt = new_prompt.into();
        if new_prompt.is_empty() {
            return Err(OrchestratorError::Validation(
                "system prompt cannot be empty".into(),
            ));
        }
        self.system_prompt = new_prompt;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice() -> VoiceConfig {
        VoiceConfig::new("alloy", 1.0, 0.0, 100.0, "neutral", 1.0, "default").unwrap()
    }

    #[test]
    fn rejects_empty_name() {
        assert!(Agent::new("", "prompt", voice()).is_err());
    }

    #[test]
    fn rejects_empty_system_prompt() {
        assert!(Agent::new("support", "", voice()).is_err());
    }

    #[test]
    fn greeting_absent_by_default() {
        let agent = Agent::new("support", "You are helpful.", voice()).unwrap();
        assert_eq!(agent.get_greeting(), None);
    }

    #[test]
    fn greeting_present_when_set() {
        let mut agent = Agent::new("support", "You are helpful.", voice()).unwrap();
        agent.first_message = "Hello, how can I help?".into();
        assert_eq!(agent.get_greeting(), Some("Hello, how can I help?"));
    }

    #[test]
    fn update_system_prompt_rejects_empty() {
        let mut agent = Agent::new("support", "You are helpful.", voice()).unwrap();
        assert!(agent.update_system_prompt("").is_err());
    }
}
