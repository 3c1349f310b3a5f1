//! Correlation types for run tracking and tracing
//!
//! A sync run crosses many async boundaries (platform calls, status edits,
//! the flush task). These types tie the resulting log events together.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a single apply run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// Generate a new random RunId using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create from an existing string (for deserialization)
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Platform identity of the operator driving a preview or run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorId(pub u64);

impl std::fmt::Display for OperatorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Context carried through a run for correlation
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: RunId,
    pub operator_id: OperatorId,
}

impl RunContext {
    /// Create a new context with a fresh RunId
    pub fn new(operator_id: OperatorId) -> Self {
        Self {
            run_id: RunId::new(),
            operator_id,
        }
    }

    /// Create a context with an existing RunId
    pub fn with_run_id(run_id: RunId, operator_id: OperatorId) -> Self {
        Self {
            run_id,
            operator_id,
        }
    }
}
