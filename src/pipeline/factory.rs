//! Pipeline factory: wires VAD -> STT -> LLM -> TTS into one
//! [`ProcessorChain`] for a single call, from ports and configuration.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::RuntimeConfig;
use crate::domain::{Agent, Conversation};
use crate::error::Result;
use crate::ports::{LlmPort, SttPort, TtsPort};
use crate::processors::llm::LlmProcessor;
use crate::processors::stt::SttProcessor;
use crate::processors::tts::{AudioOutputSink, TtsProcessor};
use crate::processors::vad::VadProcessor;
use crate::processors::{FrameProcessor, ProcessorChain};
use crate::usecases::execute_tool::{ExecuteToolUseCase, Tool};
use crate::value_objects::AudioFormat;

/// The provider adapters and audio sink needed to assemble a pipeline for
/// one call. The factory knows nothing about how these were constructed.
pub struct PipelinePorts {
    pub stt: Arc<dyn SttPort>,
    pub llm: Arc<dyn LlmPort>,
    pub tts: Arc<dyn TtsPort>,
    pub audio_output: Arc<dyn AudioOutputSink>,
    pub tools: HashMap<String, Arc<dyn Tool>>,
}

fn llm_prompt_config(agent: &Agent) -> serde_json::Map<String, Value> {
    let mut config = agent.llm_config.clone();
    config.insert(
        "system_prompt".into(),
        Value::String(agent.system_prompt.clone()),
    );
    config
}

/// Build the VAD -> STT -> LLM -> TTS chain for one call, linked in order
/// and ready for [`ProcessorChain::start`].
///
/// # Errors
///
/// This assembly step itself cannot fail; the `Result` exists for parity
/// with call sites that validate ports/config before construction.
pub async fn build_pipeline(
    config: &RuntimeConfig,
    ports: PipelinePorts,
    agent: &Agent,
    conversation: Arc<Mutex<Conversation>>,
    parent_token: &CancellationToken,
) -> Result<ProcessorChain> {
    let audio_format = AudioFormat::for_client(config.client_type.as_deref().unwrap_or("telephony"));

    let vad = Arc::new(VadProcessor::new(config.vad.clone()));
    let stt = Arc::new(SttProcessor::new(ports.stt, audio_format, parent_token));

    let execute_tool = Arc::new(ExecuteToolUseCase::new(ports.tools));
    let tool_definitions = execute_tool.get_tool_definitions();
    let llm = Arc::new(LlmProcessor::new(
        ports.llm,
        execute_tool,
        conversation,
        config.llm.clone(),
        llm_prompt_config(agent),
        tool_definitions,
        parent_token,
    ));

    let tts = Arc::new(TtsProcessor::new(
        ports.tts,
        ports.audio_output,
        agent.voice_config.clone(),
        audio_format,
    ));

    let chain: Vec<Arc<dyn FrameProcessor>> = vec![vad, stt, llm, tts];
    Ok(ProcessorChain::new(chain).await)
}
