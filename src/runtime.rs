//! Runtime for executing conversations
//!
//! Applies the effects the state machine asks for: persisting the
//! conversation, calling the model, and invoking tools.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::ConversationRuntime;
pub use traits::*;

use crate::db::DbError;
use crate::llm::LlmError;
use std::sync::Arc;
use thiserror::Error;

/// Runtime as served over HTTP: database storage, any model client, any tool executor
pub type ProductionRuntime =
    ConversationRuntime<DatabaseStorage, Arc<dyn LlmClient>, Arc<dyn ToolExecutor>>;

/// Failure of one user action. The conversation keeps whatever was last saved.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
    #[error("Model request failed: {0}")]
    Llm(#[from] LlmError),
}
