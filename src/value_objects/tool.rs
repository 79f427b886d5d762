//! Tool-call value objects.

use serde_json::Value;

use crate::error::{OrchestratorError, Result};

/// Tool metadata exportable for LLM function-calling schemas.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
    pub required: Vec<String>,
}

impl ToolDefinition {
    /// Construct a new `ToolDefinition`.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::Validation` if `name` or `description` is
    /// empty.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        required: Vec<String>,
    ) -> Result<Self> {
        let name = name.into();
        let description = description.into();
        if name.is_empty() {
            return Err(OrchestratorError::Validation(
                "tool name must be a non-empty string".into(),
            ));
        }
        if description.is_empty() {
            return Err(OrchestratorError::Validation(
                "tool description cannot be empty".into(),
            ));
        }
        Ok(Self {
            name,
            description,
            parameters,
            required,
        })
    }

    /// Render the OpenAI-style function-calling schema shape.
    pub fn to_function_schema(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "parameters": {
                "type": "object",
                "properties": self.parameters,
                "required": self.required,
            }
        })
    }
}

/// A request to execute a named tool.
#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub tool_name: String,
    pub arguments: Value,
    pub trace_id: String,
    pub timeout_seconds: f64,
    pub context: serde_json::Map<String, Value>,
    pub metadata: serde_json::Map<String, Value>,
}

impl ToolRequest {
    /// Construct a new `ToolRequest` with the default 10-second timeout.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::Validation` if `tool_name` is empty or
    /// `timeout_seconds` is not positive.
    pub fn new(tool_name: impl Into<String>, arguments: Value) -> Result<Self> {
        Self::with_timeout(tool_name, arguments, 10.0)
    }

    /// Construct a new `ToolRequest` with an explicit timeout.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::Validation` if `tool_name` is empty or
    /// `timeout_seconds` is not positive.
    pub fn with_timeout(
        tool_name: impl Into<String>,
        arguments: Value,
        timeout_seconds: f64,
    ) -> Result<Self> {
        let tool_name = tool_name.into();
        if tool_name.is_empty() {
            return Err(OrchestratorError::Validation(
                "tool name cannot be empty".into(),
            ));
        }
        if timeout_seconds <= 0.0 {
            return Err(OrchestratorError::Validation(
                "timeout must be positive".into(),
            ));
        }
        Ok(Self {
            tool_name,
            arguments,
            trace_id: String::new(),
            timeout_seconds,
            context: serde_json::Map::new(),
            metadata: serde_json::Map::new(),
        })
    }
}

/// The (always-successfully-constructed) result of a tool execution attempt.
#[derive(Debug, Clone)]
pub struct ToolResponse {
    pub tool_name: String,
    pub result: Value,
    pub success: bool,
    pub error_message: String,
    pub execution_time_ms: f64,
    pub trace_id: String,
}

impl ToolResponse {
    pub fn success(
        tool_name: impl Into<String>,
        result: Value,
        execution_time_ms: f64,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            result,
            success: true,
            error_message: String::new(),
            execution_time_ms,
            trace_id: trace_id.into(),
        }
    }

    pub fn failure(
        tool_name: impl Into<String>,
        error_message: impl Into<String>,
        execution_time_ms: f64,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            result: Value::Null,
            success: false,
            error_message: error_message.into(),
            execution_time_ms,
            trace_id: trace_id.into(),
        }
    }
}
