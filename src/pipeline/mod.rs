//! Assembly of the VAD -> STT -> LLM -> TTS processor chain for one call.

pub mod factory;

pub use factory::{build_pipeline, PipelinePorts};
