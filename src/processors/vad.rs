//! Voice-activity-detection processor.
//!
//! Buffers incoming audio into model-sized chunks, scores each chunk with an
//! energy/confidence function, and runs a two-threshold onset/offset state
//! machine to emit `UserStartedSpeaking`/`UserStoppedSpeaking` frames.
//!
//! The onset side has a deliberate two-phase confirmation: a first candidate
//! chunk starts a confirmation window, and only if the window elapses with
//! confidence still high (or confirmation is disabled) is onset declared.
//! This matches the reference VAD's turn-taking behavior exactly, including
//! its quirk of only re-evaluating elapsed time on the *next* above-threshold
//! chunk rather than on a wall-clock timer — a chunk arriving well after the
//! window closes still confirms onset as soon as it arrives.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::VadConfig;
use crate::error::Result;
use crate::frame::{Frame, FrameDirection, FrameEnvelope};
use crate::processors::{push_frame, FrameProcessor, ProcessorNode};
use crate::usecases::detect_turn_end::detect_turn_end;

/// A pluggable confidence scorer: raw 16-bit PCM samples -> confidence in
/// `[0.0, 1.0]`. Concrete model adapters (e.g. a neural VAD) implement this;
/// the default is RMS energy.
pub trait VadScorer: Send + Sync {
    fn score(&self, samples: &[i16]) -> f32;
}

/// RMS-energy-based confidence scorer: normalized root-mean-square of the
/// chunk, scaled into a rough `[0.0, 1.0]` confidence band.
pub struct RmsEnergyScorer;

impl VadScorer for RmsEnergyScorer {
    fn score(&self, samples: &[i16]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples.iter().map(|&s| (s as f64).powi(2)).sum();
        let rms = (sum_sq / samples.len() as f64).sqrt();
        ((rms / 32768.0) as f32 * 6.0).min(1.0)
    }
}

fn required_samples(sample_rate: u32) -> usize {
    if sample_rate == 8000 {
        256
    } else {
        512
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

struct VadState {
    buffer: Vec<u8>,
    speaking: bool,
    silence_frames: u32,
    speech_frames: u32,
}

/// Voice-activity-detection processor: the head of the pipeline.
pub struct VadProcessor {
    node: ProcessorNode,
    config: VadConfig,
    scorer: Box<dyn VadScorer>,
    state: Mutex<VadState>,
    voice_detected_at_ms: AtomicI64,
    speaking_flag: AtomicBool,
    speech_frame_count: AtomicU32,
}

impl VadProcessor {
    pub fn new(config: VadConfig) -> Self {
        Self::with_scorer(config, Box::new(RmsEnergyScorer))
    }

    pub fn with_scorer(config: VadConfig, scorer: Box<dyn VadScorer>) -> Self {
        Self {
            node: ProcessorNode::new(),
            config,
            scorer,
            state: Mutex::new(VadState {
                buffer: Vec::new(),
                speaking: false,
                silence_frames: 0,
                speech_frames: 0,
            }),
            voice_detected_at_ms: AtomicI64::new(-1),
            speaking_flag: AtomicBool::new(false),
            speech_frame_count: AtomicU32::new(0),
        }
    }

    async fn process_audio(
        self: &Arc<Self>,
        bytes: &[u8],
        sample_rate: u32,
        envelope: &FrameEnvelope,
    ) -> Result<()> {
        let samples = required_samples(sample_rate);
        let chunk_bytes_len = samples * 2;

        let mut pending_events: Vec<Frame> = Vec::new();
        {
            let mut state = self.state.lock().await;
            state.buffer.extend_from_slice(bytes);

            while state.buffer.len() >= chunk_bytes_len {
                let chunk: Vec<u8> = state.buffer.drain(..chunk_bytes_len).collect();
                let pcm: Vec<i16> = chunk
                    .chunks_exact(2)
                    .map(|b| i16::from_le_bytes([b[0], b[1]]))
                    .collect();
                let confidence = self.scorer.score(&pcm);

                if confidence > self.config.threshold_start {
                    state.silence_frames = 0;
                    state.speech_frames += 1;

                    if !state.speaking && state.speech_frames >= self.config.min_speech_frames {
                        let voice_at = self.voice_detected_at_ms.load(Ordering::SeqCst);
                        if voice_at < 0 {
                            self.voice_detected_at_ms.store(now_ms(), Ordering::SeqCst);
                            if self.config.confirmation_window_ms == 0 {
                                state.speaking = true;
                                self.voice_detected_at_ms.store(-1, Ordering::SeqCst);
                                info!(confidence, "user started speaking (immediate)");
                                pending_events.push(Frame::UserStartedSpeaking);
                            }
                        } else {
                            let elapsed_ms = now_ms() - voice_at;
                            if elapsed_ms as u64 >= u64::from(self.config.confirmation_window_ms) {
                                state.speaking = true;
                                self.voice_detected_at_ms.store(-1, Ordering::SeqCst);
                                info!(confidence, elapsed_ms, "user started speaking (confirmed)");
                                pending_events.push(Frame::UserStartedSpeaking);
                            }
                        }
                    }
                } else if confidence < self.config.threshold_return {
                    let voice_at = self.voice_detected_at_ms.load(Ordering::SeqCst);
                    if voice_at >= 0 && !state.speaking {
                        let elapsed_ms = now_ms() - voice_at;
                        if (elapsed_ms as u64) < u64::from(self.config.confirmation_window_ms) {
                            self.voice_detected_at_ms.store(-1, Ordering::SeqCst);
                            state.speech_frames = 0;
                        }
                    }

                    if state.speaking {
                        state.silence_frames += 1;
                        let silence_ms = u64::from(state.silence_frames) * u64::from(self.config.chunk_duration_ms);
                        if detect_turn_end(silence_ms, self.config.silence_timeout_ms) {
                            state.speaking = false;
                            info!(silence_ms, "user stopped speaking");
                            pending_events.push(Frame::UserStoppedSpeaking);
                        }
                    }
                }
            }
            self.speaking_flag.store(state.speaking, Ordering::SeqCst);
            self.speech_frame_count.store(state.speech_frames, Ordering::SeqCst);
        }

        let me: Arc<dyn FrameProcessor> = self.clone() as Arc<dyn FrameProcessor>;
        for event in pending_events {
            push_frame(
                &me,
                FrameEnvelope::new(event, envelope.trace_id.clone()),
                FrameDirection::Downstream,
            )
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl FrameProcessor for VadProcessor {
    fn name(&self) -> &'static str {
        "vad"
    }

    fn node(&self) -> &ProcessorNode {
        &self.node
    }

    async fn process_frame(self: Arc<Self>, envelope: FrameEnvelope, direction: FrameDirection) -> Result<()> {
        if direction == FrameDirection::Downstream {
            if let Frame::Audio {
                ref bytes,
                sample_rate,
                ..
            } = envelope.frame
            {
                self.process_audio(bytes, sample_rate, &envelope).await?;
            }
        }
        let me: Arc<dyn FrameProcessor> = self.clone() as Arc<dyn FrameProcessor>;
        push_frame(&me, envelope, direction).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silence_chunk(n_samples: usize) -> Vec<u8> {
        vec![0u8; n_samples * 2]
    }

    fn loud_chunk(n_samples: usize) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(n_samples * 2);
        for _ in 0..n_samples {
            bytes.extend_from_slice(&20000i16.to_le_bytes());
        }
        bytes
    }

    struct Sink {
        node: ProcessorNode,
        frames: Mutex<Vec<Frame>>,
    }

    #[async_trait]
    impl FrameProcessor for Sink {
        fn name(&self) -> &'static str {
            "sink"
        }
        fn node(&self) -> &ProcessorNode {
            &self.node
        }
        async fn process_frame(self: Arc<Self>, envelope: FrameEnvelope, _direction: FrameDirection) -> Result<()> {
            self.frames.lock().await.push(envelope.frame);
            Ok(())
        }
    }

    #[tokio::test]
    async fn loud_audio_eventually_triggers_start_speaking() {
        let mut config = VadConfig::default();
        config.confirmation_window_ms = 0;
        config.min_speech_frames = 1;
        let vad = Arc::new(VadProcessor::new(config));
        let sink = Arc::new(Sink {
            node: ProcessorNode::new(),
            frames: Mutex::new(Vec::new()),
        });
        let vad_dyn: Arc<dyn FrameProcessor> = vad.clone();
        let sink_dyn: Arc<dyn FrameProcessor> = sink.clone();
        crate::processors::link(&vad_dyn, &sink_dyn).await;

        let audio = Frame::Audio {
            bytes: loud_chunk(256),
            sample_rate: 8000,
            channels: 1,
        };
        vad_dyn
            .process_frame(FrameEnvelope::new(audio, "t1"), FrameDirection::Downstream)
            .await
            .unwrap();

        let frames = sink.frames.lock().await;
        assert!(frames.iter().any(|f| matches!(f, Frame::UserStartedSpeaking)));
    }

    #[tokio::test]
    async fn silent_audio_never_triggers_start_speaking() {
        let vad = Arc::new(VadProcessor::new(VadConfig::default()));
        let sink = Arc::new(Sink {
            node: ProcessorNode::new(),
            frames: Mutex::new(Vec::new()),
        });
        let vad_dyn: Arc<dyn FrameProcessor> = vad.clone();
        let sink_dyn: Arc<dyn FrameProcessor> = sink.clone();
        crate::processors::link(&vad_dyn, &sink_dyn).await;

        let audio = Frame::Audio {
            bytes: silence_chunk(256),
            sample_rate: 8000,
            channels: 1,
        };
        vad_dyn
            .process_frame(FrameEnvelope::new(audio, "t1"), FrameDirection::Downstream)
            .await
            .unwrap();

        let frames = sink.frames.lock().await;
        assert!(!frames.iter().any(|f| matches!(f, Frame::UserStartedSpeaking)));
        // The audio frame itself is still forwarded downstream.
        assert!(frames.iter().any(|f| matches!(f, Frame::Audio { .. })));
    }
}
