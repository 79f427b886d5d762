//! Immutable value objects validated at construction.

mod audio_format;
mod call_id;
mod conversation_turn;
mod phone_number;
mod tool;
mod voice_config;

pub use audio_format::{AudioEncoding, AudioFormat};
pub use call_id::CallId;
pub use conversation_turn::{ConversationRole, ConversationTurn};
pub use phone_number::PhoneNumber;
pub use tool::{ToolDefinition, ToolRequest, ToolResponse};
pub use voice_config::VoiceConfig;
