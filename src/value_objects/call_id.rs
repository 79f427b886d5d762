//! Call identifier value object.

use std::fmt;

use crate::error::{OrchestratorError, Result};

/// A validated, non-empty call identifier (max 255 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallId(String);

impl CallId {
    /// Construct a new `CallId`.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::Validation` if `value` is empty or longer
    /// than 255 characters.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(OrchestratorError::Validation(
                "CallId must be a non-empty string".into(),
            ));
        }
        if value.len() > 255 {
            return Err(OrchestratorError::Validation("CallId too long".into()));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
