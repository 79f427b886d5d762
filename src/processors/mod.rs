//! The doubly-linked frame-processor chain.
//!
//! Each processor holds a strong forward link (`next`) and a weak backward
//! link (`prev`); the weak link breaks the reference cycle a naive
//! doubly-linked `Arc` chain would otherwise form. Processors dispatch into
//! their neighbor through `Arc<dyn FrameProcessor>`, which requires trait
//! methods to take `self: Arc<Self>` so a processor can be invoked through a
//! cloned handle without re-entrant `&mut self` borrows.

pub mod llm;
pub mod stt;
pub mod tts;
pub mod vad;

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{error, trace};

use crate::error::Result;
use crate::frame::{Frame, FrameDirection, FrameEnvelope};

/// The mutable link state shared by every processor in the chain.
#[derive(Default)]
pub struct ProcessorNode {
    next: Mutex<Option<Arc<dyn FrameProcessor>>>,
    prev: Mutex<Option<Weak<dyn FrameProcessor>>>,
}

impl ProcessorNode {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A stage in the VAD → STT → LLM → TTS pipeline.
#[async_trait]
pub trait FrameProcessor: Send + Sync {
    /// A short, stable name for logging (e.g. `"vad"`, `"llm"`).
    fn name(&self) -> &'static str;

    /// Access this processor's link state.
    fn node(&self) -> &ProcessorNode;

    /// Handle one frame. Implementations that don't care about a frame
    /// should forward it unchanged via [`push_frame`] rather than dropping
    /// it silently — only the chain's ends drop frames.
    async fn process_frame(self: Arc<Self>, envelope: FrameEnvelope, direction: FrameDirection) -> Result<()>;

    /// Optional lifecycle hook: open sessions, spawn workers. No-op by default.
    async fn start(self: Arc<Self>) -> Result<()> {
        Ok(())
    }

    /// Optional lifecycle hook: cancel workers, close sessions. No-op by default.
    async fn stop(self: Arc<Self>) {}
}

/// Link `upstream -> downstream`: `downstream` becomes `upstream`'s `next`,
/// and `upstream` becomes `downstream`'s `prev`.
pub async fn link(upstream: &Arc<dyn FrameProcessor>, downstream: &Arc<dyn FrameProcessor>) {
    *upstream.node().next.lock().await = Some(Arc::clone(downstream));
    *downstream.node().prev.lock().await = Some(Arc::downgrade(upstream));
}

/// Push a frame from `from` in `direction`. Downstream frames go to `next`;
/// upstream frames go to `prev`. If there is no neighbor in that direction
/// (chain end), the frame is silently dropped.
///
/// A neighbor's `process_frame` erroring is caught and logged here, not
/// propagated — one processor's failure must never terminate the pipeline.
pub async fn push_frame(from: &Arc<dyn FrameProcessor>, envelope: FrameEnvelope, direction: FrameDirection) -> Result<()> {
    match direction {
        FrameDirection::Downstream => {
            let next = from.node().next.lock().await.clone();
            match next {
                Some(next) => {
                    let frame_name = envelope.name();
                    if let Err(err) = next.process_frame(envelope, direction).await {
                        error!(processor = next.name(), frame = frame_name, error = %err, "neighbor failed to process frame");
                    }
                }
                None => {
                    trace!(processor = from.name(), frame = envelope.name(), "dropped at chain tail");
                }
            }
        }
        FrameDirection::Upstream => {
            let prev = from.node().prev.lock().await.as_ref().and_then(Weak::upgrade);
            match prev {
                Some(prev) => {
                    let frame_name = envelope.name();
                    if let Err(err) = prev.process_frame(envelope, direction).await {
                        error!(processor = prev.name(), frame = frame_name, error = %err, "neighbor failed to process frame");
                    }
                }
                None => {
                    trace!(processor = from.name(), frame = envelope.name(), "dropped at chain head");
                }
            }
        }
    }
    Ok(())
}

/// An ordered chain of processors, linked in construction order.
pub struct ProcessorChain {
    processors: Vec<Arc<dyn FrameProcessor>>,
}

impl ProcessorChain {
    pub async fn new(processors: Vec<Arc<dyn FrameProcessor>>) -> Self {
        for pair in processors.windows(2) {
            link(&pair[0], &pair[1]).await;
        }
        Self { processors }
    }

    pub fn head(&self) -> Option<&Arc<dyn FrameProcessor>> {
        self.processors.first()
    }

    pub fn tail(&self) -> Option<&Arc<dyn FrameProcessor>> {
        self.processors.last()
    }

    pub fn processors(&self) -> &[Arc<dyn FrameProcessor>] {
        &self.processors
    }

    /// Start every processor in construction order.
    ///
    /// # Errors
    ///
    /// Propagates the first error raised by any processor's `start()`.
    pub async fn start(&self) -> Result<()> {
        for processor in &self.processors {
            Arc::clone(processor).start().await?;
        }
        Ok(())
    }

    /// Stop every processor in reverse construction order.
    pub async fn stop(&self) {
        for processor in self.processors.iter().rev() {
            Arc::clone(processor).stop().await;
        }
    }
}
