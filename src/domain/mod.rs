//! Domain entities: the mutable aggregates orchestrated by use-cases.

mod agent;
mod call;
mod conversation;

pub use agent::Agent;
pub use call::{Call, CallStatus};
pub use conversation::Conversation;
