//! Call orchestrator: the facade owning one call's pipeline, FSM, control
//! channel, and session-lifetime watchdogs.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::RuntimeConfig;
use crate::control::{ControlChannel, ControlMessage, ControlSignal};
use crate::domain::{Agent, Call, Conversation};
use crate::error::Result;
use crate::frame::{Frame, FrameDirection, FrameEnvelope};
use crate::fsm::{ConversationFsm, ConversationState};
use crate::pipeline::{build_pipeline, PipelinePorts};
use crate::ports::CallRepository;
use crate::processors::{FrameProcessor, ProcessorChain};
use crate::value_objects::{AudioFormat, CallId, PhoneNumber};

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Owns everything scoped to one call: the pipeline, the conversation FSM,
/// the out-of-band control channel, and the idle/duration watchdogs. One
/// instance per call; dropped at session end rather than reused.
pub struct CallOrchestrator {
    config: RuntimeConfig,
    call_repository: Option<Arc<dyn CallRepository>>,
    control: Mutex<ControlChannel>,
    fsm: Mutex<ConversationFsm>,
    conversation: Arc<Mutex<Conversation>>,
    call: Mutex<Option<Call>>,
    pipeline: Mutex<Option<ProcessorChain>>,
    active: AtomicBool,
    start_time_ms: AtomicI64,
    last_interaction_ms: AtomicI64,
    shutdown: CancellationToken,
    background: Mutex<Vec<JoinHandle<()>>>,
    trace_id: Mutex<String>,
}

impl CallOrchestrator {
    pub fn new(config: RuntimeConfig, call_repository: Option<Arc<dyn CallRepository>>) -> Self {
        let capacity = config.orchestrator.control_channel_capacity;
        Self {
            call_repository,
            control: Mutex::new(ControlChannel::new(capacity)),
            fsm: Mutex::new(ConversationFsm::new()),
            conversation: Arc::new(Mutex::new(Conversation::new())),
            call: Mutex::new(None),
            pipeline: Mutex::new(None),
            active: AtomicBool::new(false),
            start_time_ms: AtomicI64::new(0),
            last_interaction_ms: AtomicI64::new(0),
            shutdown: CancellationToken::new(),
            background: Mutex::new(Vec::new()),
            trace_id: Mutex::new("session".to_owned()),
            config,
        }
    }

    /// Start a session for `agent` over `call_id`. Builds and starts the
    /// pipeline when `ports` is supplied, spawns the control loop and idle
    /// monitor, and synthesizes the agent's greeting if one is configured
    /// and a TTS port is available.
    ///
    /// # Errors
    ///
    /// On any failure this calls `stop()` before propagating the error, so
    /// callers never need to clean up a partially-started session.
    pub async fn start_session(
        self: &Arc<Self>,
        agent: Agent,
        call_id: CallId,
        from: Option<PhoneNumber>,
        to: Option<PhoneNumber>,
        ports: Option<PipelinePorts>,
    ) -> Result<Option<Vec<u8>>> {
        match self.start_session_inner(agent, call_id, from, to, ports).await {
            Ok(greeting) => Ok(greeting),
            Err(err) => {
                self.stop().await;
                Err(err)
            }
        }
    }

    async fn start_session_inner(
        self: &Arc<Self>,
        agent: Agent,
        call_id: CallId,
        from: Option<PhoneNumber>,
        to: Option<PhoneNumber>,
        ports: Option<PipelinePorts>,
    ) -> Result<Option<Vec<u8>>> {
        self.active.store(true, Ordering::SeqCst);
        let now = now_ms();
        self.start_time_ms.store(now, Ordering::SeqCst);
        self.last_interaction_ms.store(now, Ordering::SeqCst);
        *self.trace_id.lock().await = call_id.as_str().to_owned();
        let _ = to.as_ref();

        let mut call = Call::new(call_id, agent.clone(), Conversation::new());
        call.phone_number = from;
        call.start()?;
        if let Some(repo) = &self.call_repository {
            repo.save(&call).await?;
        }

        self.fsm
            .lock()
            .await
            .transition(ConversationState::Listening, "session_started");

        let mut greeting_audio = None;
        if let Some(ports) = ports {
            let tts_for_greeting = Arc::clone(&ports.tts);
            let chain = build_pipeline(&self.config, ports, &agent, Arc::clone(&self.conversation), &self.shutdown).await?;
            chain.start().await?;
            *self.pipeline.lock().await = Some(chain);

            if let Some(greeting_text) = agent.get_greeting() {
                let format = AudioFormat::for_client(self.config.client_type.as_deref().unwrap_or("telephony"));
                match tts_for_greeting.synthesize(greeting_text, &agent.voice_config, &format).await {
                    Ok(bytes) => greeting_audio = Some(bytes),
                    Err(err) => warn!(error = %err, "greeting synthesis failed; continuing without it"),
                }
            }
        }

        self.spawn_control_loop().await;
        self.spawn_idle_monitor().await;

        *self.call.lock().await = Some(call);
        Ok(greeting_audio)
    }

    /// Push one chunk of raw audio into the head of the pipeline. A no-op
    /// (logged) if no pipeline is active.
    ///
    /// # Errors
    ///
    /// Never returns an error: a failure in the pipeline's head processor is
    /// caught and logged here rather than surfaced, matching the "a single
    /// processor's exception never terminates the pipeline" contract the
    /// rest of the chain already honours via `push_frame`.
    pub async fn push_audio_frame(&self, raw_audio: Vec<u8>, sample_rate: u32, channels: u16) -> Result<()> {
        let pipeline = self.pipeline.lock().await;
        let Some(head) = pipeline.as_ref().and_then(ProcessorChain::head) else {
            warn!("push_audio_frame called with no active pipeline, dropping");
            return Ok(());
        };
        let trace_id = self.trace_id.lock().await.clone();
        let envelope = FrameEnvelope::new(
            Frame::Audio {
                bytes: raw_audio,
                sample_rate,
                channels,
            },
            trace_id,
        );
        if let Err(err) = head.clone().process_frame(envelope, FrameDirection::Downstream).await {
            error!(error = %err, "pipeline head failed to process audio frame");
        }
        Ok(())
    }

    /// Handle a user-speech interruption: `Listening/Processing/Speaking ->
    /// Interrupted -> Listening`, with an `Interrupt` control signal sent
    /// in between. A no-op if the FSM's current state cannot be interrupted.
    pub async fn handle_interruption(&self, text: &str) {
        if !self.fsm.lock().await.can_interrupt() {
            info!(text, "ignoring interruption: not interruptible in current state");
            return;
        }
        let prefix: String = text.chars().take(40).collect();
        self.fsm
            .lock()
            .await
            .transition(ConversationState::Interrupted, &format!("barge_in: {prefix}"));

        self.control.lock().await.send_signal(
            ControlMessage::new(ControlSignal::Interrupt)
                .with_metadata("reason", serde_json::Value::String("barge_in".into()))
                .with_metadata("text", serde_json::Value::String(text.to_owned())),
        );

        self.fsm
            .lock()
            .await
            .transition(ConversationState::Listening, "ready_for_input");
        self.last_interaction_ms.store(now_ms(), Ordering::SeqCst);
    }

    /// End the session: stop everything, mark the call ended, and persist
    /// the final conversation state if a repository is configured.
    ///
    /// # Errors
    ///
    /// Propagates any repository save failure.
    pub async fn end_session(&self, reason: &str) -> Result<()> {
        self.stop().await;
        let conversation_snapshot = self.conversation.lock().await.clone();
        if let Some(mut call) = self.call.lock().await.take() {
            call.conversation = conversation_snapshot;
            call.end(reason);
            if let Some(repo) = &self.call_repository {
                repo.save(&call).await?;
            }
        }
        Ok(())
    }

    /// Idempotent cleanup: stop the pipeline, cancel background tasks,
    /// close the control channel, and reset the FSM. Safe to call more than
    /// once and safe to call even if `start_session` never ran.
    pub async fn stop(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shutdown.cancel();
        if let Some(pipeline) = self.pipeline.lock().await.take() {
            pipeline.stop().await;
        }
        for handle in self.background.lock().await.drain(..) {
            handle.abort();
        }
        self.control.lock().await.close();
        self.fsm.lock().await.reset();
        info!("call orchestrator stopped");
    }

    pub async fn fsm_state(&self) -> ConversationState {
        self.fsm.lock().await.state()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    async fn spawn_control_loop(self: &Arc<Self>) {
        let me = Arc::clone(self);
        let shutdown = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            loop {
                if !me.active.load(Ordering::SeqCst) {
                    break;
                }
                let signal = tokio::select! {
                    () = shutdown.cancelled() => break,
                    signal = async {
                        let mut control = me.control.lock().await;
                        control.wait_for_signal(Duration::from_secs(1)).await
                    } => signal,
                };
                let Some(message) = signal else { continue };
                match message.signal {
                    ControlSignal::Interrupt => info!("control loop observed Interrupt"),
                    ControlSignal::Cancel => info!("control loop observed Cancel"),
                    ControlSignal::ClearPipeline => info!("control loop observed ClearPipeline"),
                    ControlSignal::EmergencyStop => {
                        warn!("EmergencyStop received, stopping session");
                        me.stop().await;
                        break;
                    }
                    ControlSignal::Pause | ControlSignal::Resume => {}
                }
            }
        });
        self.background.lock().await.push(handle);
    }

    async fn spawn_idle_monitor(self: &Arc<Self>) {
        let me = Arc::clone(self);
        let shutdown = self.shutdown.clone();
        let idle_timeout_ms = i64::try_from(self.config.orchestrator.idle_timeout_secs).unwrap_or(i64::MAX) * 1000;
        let max_duration_ms = i64::try_from(self.config.orchestrator.max_duration_secs).unwrap_or(i64::MAX) * 1000;
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(Duration::from_secs(1)) => {}
                }
                if !me.active.load(Ordering::SeqCst) {
                    break;
                }
                let now = now_ms();
                let start = me.start_time_ms.load(Ordering::SeqCst);
                let last = me.last_interaction_ms.load(Ordering::SeqCst);
                let sender = me.control.lock().await.sender();
                if now - start > max_duration_ms {
                    sender.send_emergency_stop("max_duration_exceeded");
                    break;
                } else if now - last > idle_timeout_ms {
                    sender.send_emergency_stop("idle_timeout");
                    break;
                }
            }
        });
        self.background.lock().await.push(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::VoiceConfig;
    use std::time::Duration as StdDuration;

    fn test_agent() -> Agent {
        let voice = VoiceConfig::new("alloy", 1.0, 0.0, 100.0, "neutral", 1.0, "default").unwrap();
        Agent::new("support", "You are helpful.", voice).unwrap()
    }

    #[tokio::test]
    async fn start_session_without_ports_transitions_to_listening() {
        let orchestrator = Arc::new(CallOrchestrator::new(RuntimeConfig::default(), None));
        let greeting = orchestrator
            .start_session(test_agent(), CallId::new("call-1").unwrap(), None, None, None)
            .await
            .unwrap();
        assert!(greeting.is_none());
        assert_eq!(orchestrator.fsm_state().await, ConversationState::Listening);
        assert!(orchestrator.is_active());
        orchestrator.stop().await;
    }

    #[tokio::test]
    async fn push_audio_frame_without_pipeline_is_a_no_op() {
        let orchestrator = Arc::new(CallOrchestrator::new(RuntimeConfig::default(), None));
        orchestrator
            .start_session(test_agent(), CallId::new("call-2").unwrap(), None, None, None)
            .await
            .unwrap();
        let result = orchestrator.push_audio_frame(vec![0u8; 16], 8000, 1).await;
        assert!(result.is_ok());
        orchestrator.stop().await;
    }

    #[tokio::test]
    async fn interruption_from_idle_is_ignored() {
        let orchestrator = Arc::new(CallOrchestrator::new(RuntimeConfig::default(), None));
        orchestrator.handle_interruption("hello").await;
        assert_eq!(orchestrator.fsm_state().await, ConversationState::Idle);
    }

    #[tokio::test]
    async fn interruption_while_listening_returns_to_listening() {
        let orchestrator = Arc::new(CallOrchestrator::new(RuntimeConfig::default(), None));
        orchestrator
            .start_session(test_agent(), CallId::new("call-3").unwrap(), None, None, None)
            .await
            .unwrap();
        orchestrator.handle_interruption("wait, stop").await;
        assert_eq!(orchestrator.fsm_state().await, ConversationState::Listening);
        orchestrator.stop().await;
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let orchestrator = Arc::new(CallOrchestrator::new(RuntimeConfig::default(), None));
        orchestrator
            .start_session(test_agent(), CallId::new("call-4").unwrap(), None, None, None)
            .await
            .unwrap();
        orchestrator.stop().await;
        orchestrator.stop().await;
        assert!(!orchestrator.is_active());
    }

    #[tokio::test]
    async fn end_session_clears_active_call() {
        let orchestrator = Arc::new(CallOrchestrator::new(RuntimeConfig::default(), None));
        orchestrator
            .start_session(test_agent(), CallId::new("call-5").unwrap(), None, None, None)
            .await
            .unwrap();
        orchestrator.end_session("completed").await.unwrap();
        assert!(!orchestrator.is_active());
        assert!(orchestrator.call.lock().await.is_none());
    }

    #[tokio::test]
    async fn idle_timeout_triggers_emergency_stop() {
        let mut config = RuntimeConfig::default();
        config.orchestrator.idle_timeout_secs = 1;
        config.orchestrator.max_duration_secs = 100;
        let orchestrator = Arc::new(CallOrchestrator::new(config, None));
        orchestrator
            .start_session(test_agent(), CallId::new("call-6").unwrap(), None, None, None)
            .await
            .unwrap();
        tokio::time::sleep(StdDuration::from_millis(2500)).await;
        assert!(!orchestrator.is_active());
    }
}
