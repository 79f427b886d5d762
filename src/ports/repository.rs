//! Persistence ports for calls, agents, and transcripts.

use async_trait::async_trait;

use crate::domain::{Agent, Call};
use crate::error::Result;
use crate::value_objects::CallId;

/// Port for persisting transcript lines as they are produced.
#[async_trait]
pub trait TranscriptRepositoryPort: Send + Sync {
    /// Save a single transcript line for `call_id`.
    async fn save(&self, call_id: &str, role: &str, content: &str) -> Result<()>;
}

/// Port for persisting the [`Call`] aggregate root.
#[async_trait]
pub trait CallRepository: Send + Sync {
    async fn save(&self, call: &Call) -> Result<()>;

    async fn get_by_id(&self, call_id: &CallId) -> Result<Option<Call>>;

    /// Paginated call listing; returns `(page, total_count)`.
    async fn get_calls(
        &self,
        limit: u32,
        offset: u32,
        client_type: Option<&str>,
    ) -> Result<(Vec<Call>, u64)>;

    async fn delete(&self, call_id: &CallId) -> Result<()>;

    /// Clear all calls, returning the count deleted.
    async fn clear(&self) -> Result<u64>;
}

/// Port for managing [`Agent`] configuration. At most one agent is active at
/// a time; `set_active_agent` enforces that invariant atomically.
#[async_trait]
pub trait AgentRepository: Send + Sync {
    async fn get_agent(&self, agent_id: &str) -> Result<Option<Agent>>;

    async fn update_agent(&self, agent: &Agent) -> Result<()>;

    /// All agents, ordered by creation time.
    async fn get_all_agents(&self) -> Result<Vec<Agent>>;

    /// Persist a new agent and return it with server-assigned fields
    /// (`agent_uuid`, `created_at`) populated.
    async fn create_agent(&self, agent: Agent) -> Result<Agent>;

    async fn get_agent_by_uuid(&self, agent_uuid: &str) -> Result<Option<Agent>>;

    async fn delete_agent(&self, agent_uuid: &str) -> Result<()>;

    async fn get_active_agent(&self) -> Result<Option<Agent>>;

    /// Atomically deactivate all agents and activate the one identified by
    /// `agent_uuid`.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::Validation` if no agent with that UUID
    /// exists.
    async fn set_active_agent(&self, agent_uuid: &str) -> Result<Agent>;
}
