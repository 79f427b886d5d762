//! Tool execution: look up a named tool, run it under a timeout, and wrap
//! the outcome into an always-successfully-constructed [`ToolResponse`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, warn};

use crate::value_objects::{ToolDefinition, ToolRequest, ToolResponse};

/// A registered, invocable tool. Concrete tools (HTTP calls, DB lookups,
/// business logic) implement this; the use case only knows this one shape.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> &ToolDefinition;

    /// Run the tool. Any failure is returned as `Err(message)`; this trait
    /// never panics across the invocation boundary.
    async fn invoke(&self, arguments: Value) -> Result<Value, String>;
}

/// Executes a named tool from a registry, converting timeouts and failures
/// into failure [`ToolResponse`]s rather than propagating errors.
pub struct ExecuteToolUseCase {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ExecuteToolUseCase {
    pub fn new(tools: HashMap<String, Arc<dyn Tool>>) -> Self {
        Self { tools }
    }

    pub fn get_tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition().clone()).collect()
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    pub async fn execute(&self, request: ToolRequest) -> ToolResponse {
        let start = std::time::Instant::now();
        let Some(tool) = self.tools.get(&request.tool_name) else {
            return ToolResponse::failure(
                &request.tool_name,
                format!("Tool '{}' not found", request.tool_name),
                0.0,
                &request.trace_id,
            );
        };

        let timeout = Duration::from_secs_f64(request.timeout_seconds.max(0.0));
        match tokio::time::timeout(timeout, tool.invoke(request.arguments.clone())).await {
            Ok(Ok(result)) => ToolResponse::success(
                &request.tool_name,
                result,
                start.elapsed().as_secs_f64() * 1000.0,
                &request.trace_id,
            ),
            Ok(Err(message)) => {
                error!(tool = request.tool_name.as_str(), error = message.as_str(), "tool execution failed");
                ToolResponse::failure(
                    &request.tool_name,
                    message,
                    start.elapsed().as_secs_f64() * 1000.0,
                    &request.trace_id,
                )
            }
            Err(_) => {
                warn!(
                    tool = request.tool_name.as_str(),
                    timeout_seconds = request.timeout_seconds,
                    "tool execution timed out"
                );
                ToolResponse::failure(
                    &request.tool_name,
                    "Execution timed out",
                    start.elapsed().as_secs_f64() * 1000.0,
                    &request.trace_id,
                )
            }
        }
    }
}
