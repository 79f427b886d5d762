//! Speech-to-text processor: audio in, finalized transcripts out.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::frame::{Frame, FrameDirection, FrameEnvelope, Role};
use crate::ports::stt::{SttPort, SttSession};
use crate::processors::{push_frame, FrameProcessor, ProcessorNode};
use crate::value_objects::AudioFormat;

/// Speech-to-text processor. Owns a streaming [`SttSession`] and a
/// background reader task that forwards finalized transcripts downstream as
/// `Text{role: User, is_final: true}` frames.
pub struct SttProcessor {
    node: ProcessorNode,
    provider: Arc<dyn SttPort>,
    audio_format: AudioFormat,
    session: Mutex<Option<Arc<dyn SttSession>>>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl SttProcessor {
    pub fn new(provider: Arc<dyn SttPort>, audio_format: AudioFormat, parent_token: &CancellationToken) -> Self {
        Self {
            node: ProcessorNode::new(),
            provider,
            audio_format,
            session: Mutex::new(None),
            reader_task: Mutex::new(None),
            shutdown: parent_token.child_token(),
        }
    }

    async fn start_impl(self: &Arc<Self>) -> Result<()> {
        let session: Arc<dyn SttSession> = self.provider.start_stream(&self.audio_format, None).await?.into();
        *self.session.lock().await = Some(Arc::clone(&session));

        let me = Arc::clone(self);
        let shutdown = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            let mut events = session.events();
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("STT result reader cancelled");
                        break;
                    }
                    event = events.next() => {
                        match event {
                            Some(event) if !event.text.is_empty() => {
                                debug!(text = event.text.as_str(), "STT recognized");
                                let envelope = FrameEnvelope::new(
                                    Frame::Text { text: event.text, is_final: true, role: Role::User },
                                    "stt",
                                )
                                .with_metadata("source", serde_json::json!("stt"));
                                let dyn_self: Arc<dyn FrameProcessor> = me.clone();
                                if let Err(err) = push_frame(&dyn_self, envelope, FrameDirection::Downstream).await {
                                    error!(error = %err, "failed to push STT result downstream");
                                }
                            }
                            Some(_) => {}
                            None => break,
                        }
                    }
                }
            }
        });
        *self.reader_task.lock().await = Some(handle);
        info!("STTProcessor started");
        Ok(())
    }

    async fn stop_impl(&self) {
        self.shutdown.cancel();
        if let Some(handle) = self.reader_task.lock().await.take() {
            let _ = handle.await;
        }
        if let Some(session) = self.session.lock().await.take() {
            if let Err(err) = session.close().await {
                warn!(error = %err, "error closing STT session");
            }
        }
        info!("STTProcessor stopped");
    }
}

#[async_trait]
impl FrameProcessor for SttProcessor {
    fn name(&self) -> &'static str {
        "stt"
    }

    fn node(&self) -> &ProcessorNode {
        &self.node
    }

    async fn process_frame(self: Arc<Self>, envelope: FrameEnvelope, direction: FrameDirection) -> Result<()> {
        if direction == FrameDirection::Downstream {
            if let Frame::Audio { ref bytes, .. } = envelope.frame {
                let session = self.session.lock().await.clone();
                match session {
                    Some(session) => {
                        if let Err(err) = session.process_audio(bytes).await {
                            error!(error = %err, "failed to push audio into STT session");
                        }
                    }
                    None => {
                        warn!("STT session not active, dropping audio");
                    }
                }
            }
        }
        let me: Arc<dyn FrameProcessor> = self.clone();
        push_frame(&me, envelope, direction).await
    }

    /// Open the streaming session and spawn the background result reader.
    ///
    /// # Errors
    ///
    /// Propagates any error from the provider's `start_stream`.
    async fn start(self: Arc<Self>) -> Result<()> {
        self.start_impl().await
    }

    /// Cancel the reader task and close the session.
    async fn stop(self: Arc<Self>) {
        self.stop_impl().await
    }
}
