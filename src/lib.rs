//! voxgraph: a real-time voice-agent runtime.
//!
//! This crate provides the per-call core of a voice-agent system: a
//! cascaded pipeline for voice conversations over a telephony or browser
//! transport.
//!
//! # Architecture
//!
//! One call is one [`orchestrator::CallOrchestrator`], owning:
//! - a [`pipeline`] of VAD → STT → LLM → TTS [`processors`], linked as a
//!   doubly-linked [`processors::ProcessorChain`] and driven by [`frame`]s,
//! - a [`fsm::ConversationFsm`] gating what the agent may do in each phase,
//! - a [`control::ControlChannel`] carrying interrupt/cancel/emergency-stop
//!   signals out of band from ordinary data frames.
//!
//! Everything the pipeline talks to outside this crate — STT/LLM/TTS/
//! telephony providers, repositories, caches — is a trait object behind
//! [`ports`]; no concrete adapter lives here.

pub mod config;
pub mod control;
pub mod domain;
pub mod error;
pub mod fallback;
pub mod frame;
pub mod fsm;
pub mod orchestrator;
pub mod pipeline;
pub mod ports;
pub mod processors;
pub mod usecases;
pub mod value_objects;

pub use config::RuntimeConfig;
pub use control::{ControlChannel, ControlMessage, ControlSender, ControlSignal};
pub use error::{OrchestratorError, Result};
pub use fallback::FallbackChain;
pub use frame::{Frame, FrameDirection, FrameEnvelope};
pub use fsm::{ConversationFsm, ConversationState};
pub use orchestrator::CallOrchestrator;
pub use pipeline::{build_pipeline, PipelinePorts};
