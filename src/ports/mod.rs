//! Port traits: the abstract boundaries between the core runtime and
//! concrete provider/infrastructure adapters. Only the interfaces live here;
//! no adapter implements them in this crate.

pub mod cache;
pub mod llm;
pub mod repository;
pub mod stt;
pub mod telephony;
pub mod tts;

pub use cache::CachePort;
pub use llm::LlmPort;
pub use repository::{AgentRepository, CallRepository, TranscriptRepositoryPort};
pub use stt::SttPort;
pub use telephony::TelephonyPort;
pub use tts::TtsPort;
