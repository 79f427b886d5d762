//! Large-language-model port.

use async_trait::async_trait;
use serde_json::Value;
use std::pin::Pin;
use tokio_stream::Stream;

use crate::domain::{Agent, Conversation};
use crate::error::Result;

/// One message in an LLM conversation request.
#[derive(Debug, Clone)]
pub struct LlmMessage {
    pub role: String,
    pub content: String,
}

/// A function/tool call requested by the model.
#[derive(Debug, Clone)]
pub struct LlmFunctionCall {
    pub name: String,
    pub arguments: Value,
}

/// One chunk of a streamed LLM response: text, a function call, or both.
#[derive(Debug, Clone, Default)]
pub struct LlmResponseChunk {
    pub text: String,
    pub is_final: bool,
    pub function_call: Option<LlmFunctionCall>,
}

impl LlmResponseChunk {
    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }

    pub fn has_function_call(&self) -> bool {
        self.function_call.is_some()
    }
}

/// A request for streamed LLM generation.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub messages: Vec<LlmMessage>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: String,
    pub tools: Option<Vec<Value>>,
    pub metadata: serde_json::Map<String, Value>,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl LlmRequest {
    pub fn new(messages: Vec<LlmMessage>, model: impl Into<String>) -> Self {
        Self {
            messages,
            model: model.into(),
            temperature: 0.7,
            max_tokens: 600,
            system_prompt: String::new(),
            tools: None,
            metadata: serde_json::Map::new(),
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

pub type LlmChunkStream = Pin<Box<dyn Stream<Item = Result<LlmResponseChunk>> + Send>>;

/// Interface for large-language-model providers.
#[async_trait]
pub trait LlmPort: Send + Sync {
    /// Generate a single, non-streamed completion.
    async fn generate_response(&self, conversation: &Conversation, agent: &Agent) -> Result<String>;

    /// Stream structured response chunks, with function-calling support.
    fn generate_stream(&self, request: LlmRequest) -> LlmChunkStream;

    /// Models available from this provider.
    async fn get_available_models(&self) -> Result<Vec<String>>;

    /// Whether `model` is recommended for low-latency voice use.
    fn is_model_safe_for_voice(&self, model: &str) -> bool;
}
