//! Text-to-speech processor: a strictly-serial synthesis worker draining a
//! FIFO sentence queue.
//!
//! The TTS processor sits at the tail of the pipeline. [`push_frame`]
//! downstream from here is a silent no-op (there is no next processor), so
//! synthesized audio is handed to the caller-supplied [`AudioOutputSink`]
//! instead — that is the only way audio actually leaves the pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::frame::{Frame, FrameDirection, FrameEnvelope, Role};
use crate::ports::tts::TtsPort;
use crate::processors::{push_frame, FrameProcessor, ProcessorNode};
use crate::value_objects::{AudioFormat, VoiceConfig};

/// Where synthesized audio actually goes. Concrete sinks (a telephony leg, a
/// websocket frame writer) implement this; the processor only knows this one
/// shape.
#[async_trait]
pub trait AudioOutputSink: Send + Sync {
    async fn send_audio(&self, bytes: Vec<u8>, format: AudioFormat) -> Result<()>;
}

struct SynthesisJob {
    text: String,
    trace_id: String,
}

/// Text-to-speech processor. Owns a FIFO queue of sentences and a single
/// worker task that synthesizes them one at a time, in order.
pub struct TtsProcessor {
    node: ProcessorNode,
    provider: Arc<dyn TtsPort>,
    output: Arc<dyn AudioOutputSink>,
    voice: VoiceConfig,
    format: AudioFormat,
    queue_tx: Mutex<Option<mpsc::UnboundedSender<SynthesisJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TtsProcessor {
    pub fn new(provider: Arc<dyn TtsPort>, output: Arc<dyn AudioOutputSink>, voice: VoiceConfig, format: AudioFormat) -> Self {
        Self {
            node: ProcessorNode::new(),
            provider,
            output,
            voice,
            format,
            queue_tx: Mutex::new(None),
            worker: Mutex::new(None),
        }
    }

    fn spawn_worker(provider: Arc<dyn TtsPort>, output: Arc<dyn AudioOutputSink>, voice: VoiceConfig, format: AudioFormat) -> (mpsc::UnboundedSender<SynthesisJob>, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<SynthesisJob>();
        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let mut stream = provider.synthesize_stream(&job.text, &voice, &format);
                loop {
                    match stream.next().await {
                        Some(Ok(chunk)) => {
                            if let Err(err) = output.send_audio(chunk, format).await {
                                error!(error = %err, trace_id = job.trace_id.as_str(), "failed to deliver synthesized audio");
                                break;
                            }
                        }
                        Some(Err(err)) => {
                            error!(error = %err, trace_id = job.trace_id.as_str(), "TTS synthesis failed");
                            break;
                        }
                        None => break,
                    }
                }
            }
        });
        (tx, handle)
    }

    async fn enqueue(&self, text: String, trace_id: String) {
        let sender = self.queue_tx.lock().await.clone();
        match sender {
            Some(sender) => {
                if sender.send(SynthesisJob { text, trace_id }).is_err() {
                    warn!("TTS worker channel closed, dropping sentence");
                }
            }
            None => warn!("TTS processor not started, dropping sentence"),
        }
    }

    /// Abort the in-flight worker (dropping whatever it was synthesizing)
    /// and start a fresh one with an empty queue.
    async fn flush_and_restart(&self) {
        if let Some(handle) = self.worker.lock().await.take() {
            handle.abort();
        }
        let (tx, handle) = Self::spawn_worker(
            Arc::clone(&self.provider),
            Arc::clone(&self.output),
            self.voice.clone(),
            self.format,
        );
        *self.queue_tx.lock().await = Some(tx);
        *self.worker.lock().await = Some(handle);
        info!("TTS queue flushed and worker restarted");
    }
}

#[async_trait]
impl FrameProcessor for TtsProcessor {
    fn name(&self) -> &'static str {
        "tts"
    }

    fn node(&self) -> &ProcessorNode {
        &self.node
    }

    async fn process_frame(self: Arc<Self>, envelope: FrameEnvelope, direction: FrameDirection) -> Result<()> {
        if direction == FrameDirection::Downstream {
            match &envelope.frame {
                Frame::Text {
                    text,
                    is_final: true,
                    role: Role::Assistant,
                } => {
                    self.enqueue(text.clone(), envelope.trace_id.clone()).await;
                    return Ok(());
                }
                Frame::Cancel { .. } => {
                    self.flush_and_restart().await;
                    return Ok(());
                }
                _ => {}
            }
        }
        let me: Arc<dyn FrameProcessor> = self.clone();
        push_frame(&me, envelope, direction).await
    }

    async fn start(self: Arc<Self>) -> Result<()> {
        let (tx, handle) = Self::spawn_worker(
            Arc::clone(&self.provider),
            Arc::clone(&self.output),
            self.voice.clone(),
            self.format,
        );
        *self.queue_tx.lock().await = Some(tx);
        *self.worker.lock().await = Some(handle);
        info!("TTSProcessor started");
        Ok(())
    }

    async fn stop(self: Arc<Self>) {
        *self.queue_tx.lock().await = None;
        if let Some(handle) = self.worker.lock().await.take() {
            handle.abort();
        }
        if let Err(err) = self.provider.close().await {
            warn!(error = %err, "error closing TTS provider");
        }
        info!("TTSProcessor stopped");
    }
}
