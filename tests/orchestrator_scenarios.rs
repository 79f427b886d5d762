//! End-to-end scenarios driving a full call through [`CallOrchestrator`]
//! with in-memory fake ports standing in for real STT/LLM/TTS providers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use voxgraph::domain::{Agent, Call, CallStatus, Conversation};
use voxgraph::error::Result;
use voxgraph::pipeline::PipelinePorts;
use voxgraph::ports::llm::{LlmChunkStream, LlmPort, LlmRequest, LlmResponseChunk};
use voxgraph::ports::stt::{SttConfig, SttEvent, SttEventStream, SttPort, SttResultReason, SttSession};
use voxgraph::ports::tts::{AudioChunkStream, TtsPort, TtsRequest, VoiceMetadata};
use voxgraph::ports::CallRepository;
use voxgraph::processors::tts::AudioOutputSink;
use voxgraph::value_objects::{AudioFormat, CallId, VoiceConfig};
use voxgraph::{CallOrchestrator, ConversationState, RuntimeConfig};

struct ScriptedSttSession {
    tx: mpsc::UnboundedSender<SttEvent>,
    rx: std::sync::Mutex<Option<mpsc::UnboundedReceiver<SttEvent>>>,
}

#[async_trait]
impl SttSession for ScriptedSttSession {
    async fn process_audio(&self, audio_chunk: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(audio_chunk).into_owned();
        let _ = self.tx.send(SttEvent {
            reason: SttResultReason::RecognizedSpeech,
            text,
            duration_secs: 0.5,
            error_details: None,
        });
        Ok(())
    }

    fn events(&self) -> SttEventStream {
        let mut rx = self.rx.lock().unwrap().take().expect("events() called once per session");
        Box::pin(async_stream::stream! {
            while let Some(event) = rx.recv().await {
                yield event;
            }
        })
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

struct ScriptedStt;

#[async_trait]
impl SttPort for ScriptedStt {
    async fn transcribe(&self, audio: &[u8], _format: &AudioFormat, _language: &str) -> Result<String> {
        Ok(String::from_utf8_lossy(audio).into_owned())
    }

    async fn start_stream(&self, _format: &AudioFormat, _config: Option<SttConfig>) -> Result<Box<dyn SttSession>> {
        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Box::new(ScriptedSttSession {
            tx,
            rx: std::sync::Mutex::new(Some(rx)),
        }))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// An STT session whose `process_audio` always fails, simulating a
/// transient provider error mid-chain.
struct FailingSttSession;

#[async_trait]
impl SttSession for FailingSttSession {
    async fn process_audio(&self, _audio_chunk: &[u8]) -> Result<()> {
        Err(voxgraph::error::OrchestratorError::Port {
            port: "stt",
            provider: Some("flaky".into()),
            retryable: true,
            source: anyhow::anyhow!("connection reset"),
        })
    }

    fn events(&self) -> SttEventStream {
        Box::pin(tokio_stream::empty())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

struct FailingStt;

#[async_trait]
impl SttPort for FailingStt {
    async fn transcribe(&self, _audio: &[u8], _format: &AudioFormat, _language: &str) -> Result<String> {
        Ok(String::new())
    }

    async fn start_stream(&self, _format: &AudioFormat, _config: Option<SttConfig>) -> Result<Box<dyn SttSession>> {
        Ok(Box::new(FailingSttSession))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

struct ScriptedLlm {
    reply: String,
}

#[async_trait]
impl LlmPort for ScriptedLlm {
    async fn generate_response(&self, _conversation: &Conversation, _agent: &Agent) -> Result<String> {
        Ok(self.reply.clone())
    }

    fn generate_stream(&self, _request: LlmRequest) -> LlmChunkStream {
        let chunk = LlmResponseChunk {
            text: self.reply.clone(),
            is_final: true,
            function_call: None,
        };
        Box::pin(tokio_stream::once(Ok(chunk)))
    }

    async fn get_available_models(&self) -> Result<Vec<String>> {
        Ok(vec!["scripted".into()])
    }

    fn is_model_safe_for_voice(&self, _model: &str) -> bool {
        true
    }
}

struct ScriptedTts;

#[async_trait]
impl TtsPort for ScriptedTts {
    async fn synthesize(&self, text: &str, _voice: &VoiceConfig, _format: &AudioFormat) -> Result<Vec<u8>> {
        Ok(vec![text.len() as u8; 4])
    }

    fn synthesize_stream(&self, text: &str, _voice: &VoiceConfig, _format: &AudioFormat) -> AudioChunkStream {
        let bytes = vec![text.len() as u8; 4];
        Box::pin(tokio_stream::once(Ok(bytes)))
    }

    async fn synthesize_request(&self, _request: &TtsRequest) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn synthesize_ssml(&self, _ssml: &str) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn get_available_voices(&self, _language: Option<&str>) -> Result<Vec<VoiceMetadata>> {
        Ok(Vec::new())
    }

    async fn get_voice_styles(&self, _voice_id: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

struct CollectingSink {
    chunks: Mutex<Vec<Vec<u8>>>,
}

#[async_trait]
impl AudioOutputSink for CollectingSink {
    async fn send_audio(&self, bytes: Vec<u8>, _format: AudioFormat) -> Result<()> {
        self.chunks.lock().await.push(bytes);
        Ok(())
    }
}

struct InMemoryCallRepository {
    saved: Mutex<Vec<Call>>,
}

#[async_trait]
impl CallRepository for InMemoryCallRepository {
    async fn save(&self, call: &Call) -> Result<()> {
        self.saved.lock().await.push(call.clone());
        Ok(())
    }

    async fn get_by_id(&self, call_id: &CallId) -> Result<Option<Call>> {
        Ok(self
            .saved
            .lock()
            .await
            .iter()
            .find(|c| c.id.as_str() == call_id.as_str())
            .cloned())
    }

    async fn get_calls(&self, _limit: u32, _offset: u32, _client_type: Option<&str>) -> Result<(Vec<Call>, u64)> {
        let saved = self.saved.lock().await;
        Ok((saved.clone(), saved.len() as u64))
    }

    async fn delete(&self, call_id: &CallId) -> Result<()> {
        self.saved.lock().await.retain(|c| c.id.as_str() != call_id.as_str());
        Ok(())
    }

    async fn clear(&self) -> Result<u64> {
        let mut saved = self.saved.lock().await;
        let count = saved.len() as u64;
        saved.clear();
        Ok(count)
    }
}

fn test_agent(greeting: &str) -> Agent {
    let voice = VoiceConfig::new("alloy", 1.0, 0.0, 100.0, "neutral", 1.0, "default").unwrap();
    let mut agent = Agent::new("support", "You are a helpful voice agent.", voice).unwrap();
    agent.first_message = greeting.to_owned();
    agent
}

fn scripted_ports(reply: &str) -> (Arc<InMemoryCallRepository>, Arc<CollectingSink>, PipelinePorts) {
    let sink = Arc::new(CollectingSink {
        chunks: Mutex::new(Vec::new()),
    });
    let repo = Arc::new(InMemoryCallRepository {
        saved: Mutex::new(Vec::new()),
    });
    let ports = PipelinePorts {
        stt: Arc::new(ScriptedStt),
        llm: Arc::new(ScriptedLlm { reply: reply.to_owned() }),
        tts: Arc::new(ScriptedTts),
        audio_output: sink.clone(),
        tools: HashMap::new(),
    };
    (repo, sink, ports)
}

#[tokio::test]
async fn full_round_trip_greets_transcribes_and_synthesizes() {
    let (repo, sink, ports) = scripted_ports("Sure, here is the answer. ");
    let orchestrator = Arc::new(CallOrchestrator::new(RuntimeConfig::default(), Some(repo.clone())));

    let greeting = orchestrator
        .start_session(
            test_agent("Hi, how can I help you today?"),
            CallId::new("call-e2e-1").unwrap(),
            None,
            None,
            Some(ports),
        )
        .await
        .unwrap();
    assert_eq!(greeting, Some(vec![b"Hi, how can I help you today?".len() as u8; 4]));

    orchestrator
        .push_audio_frame(b"what is my balance".to_vec(), 8000, 1)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(!sink.chunks.lock().await.is_empty());

    orchestrator.end_session("completed").await.unwrap();
    assert!(!orchestrator.is_active());

    let saved = repo.saved.lock().await;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].status, CallStatus::Completed);
    assert!(saved[0].conversation.turn_count() >= 2);
}

#[tokio::test]
async fn barge_in_clears_fsm_back_to_listening_mid_call() {
    let (_repo, _sink, ports) = scripted_ports("This is a long answer that keeps going. ");
    let orchestrator = Arc::new(CallOrchestrator::new(RuntimeConfig::default(), None));

    orchestrator
        .start_session(test_agent(""), CallId::new("call-e2e-2").unwrap(), None, None, Some(ports))
        .await
        .unwrap();
    assert_eq!(orchestrator.fsm_state().await, ConversationState::Listening);

    orchestrator.handle_interruption("wait, stop talking").await;
    assert_eq!(orchestrator.fsm_state().await, ConversationState::Listening);

    orchestrator.end_session("completed").await.unwrap();
}

#[tokio::test]
async fn call_failure_reason_is_recorded_as_failed_status() {
    let (repo, _sink, ports) = scripted_ports("Okay. ");
    let orchestrator = Arc::new(CallOrchestrator::new(RuntimeConfig::default(), Some(repo.clone())));

    orchestrator
        .start_session(test_agent(""), CallId::new("call-e2e-3").unwrap(), None, None, Some(ports))
        .await
        .unwrap();
    orchestrator.end_session("timeout").await.unwrap();

    let saved = repo.saved.lock().await;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].status, CallStatus::Failed);
}

#[tokio::test]
async fn idle_timeout_watchdog_ends_session_without_interaction() {
    let mut config = RuntimeConfig::default();
    config.orchestrator.idle_timeout_secs = 1;
    config.orchestrator.max_duration_secs = 100;
    let (_repo, _sink, ports) = scripted_ports("Okay. ");
    let orchestrator = Arc::new(CallOrchestrator::new(config, None));

    orchestrator
        .start_session(test_agent(""), CallId::new("call-e2e-4").unwrap(), None, None, Some(ports))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(!orchestrator.is_active());
}

#[tokio::test]
async fn failing_stt_session_does_not_kill_the_call() {
    let sink = Arc::new(CollectingSink {
        chunks: Mutex::new(Vec::new()),
    });
    let ports = PipelinePorts {
        stt: Arc::new(FailingStt),
        llm: Arc::new(ScriptedLlm {
            reply: "Okay.".to_owned(),
        }),
        tts: Arc::new(ScriptedTts),
        audio_output: sink.clone(),
        tools: HashMap::new(),
    };
    let orchestrator = Arc::new(CallOrchestrator::new(RuntimeConfig::default(), None));

    orchestrator
        .start_session(test_agent(""), CallId::new("call-e2e-5").unwrap(), None, None, Some(ports))
        .await
        .unwrap();
    assert_eq!(orchestrator.fsm_state().await, ConversationState::Listening);

    // The STT session always errors on `process_audio`; pushing an audio
    // frame through the pipeline must not propagate that error out of the
    // orchestrator's public API, and the call must stay alive afterward.
    let result = orchestrator.push_audio_frame(b"hello".to_vec(), 8000, 1).await;
    assert!(result.is_ok());
    assert!(orchestrator.is_active());
    assert_eq!(orchestrator.fsm_state().await, ConversationState::Listening);

    orchestrator.end_session("completed").await.unwrap();
}
