//! Batched conversation execution.
//!
//! [`Orchestrator`] fans conversations out under a [`ConcurrencyGate`];
//! each conversation is driven by a [`ConversationRunner`] that owns its own
//! [`Chat`](crate::Chat) history for the lifetime of the run.

pub mod conversation_runner;
pub mod gate;
pub mod orchestrator;

pub use conversation_runner::*;
pub use gate::*;
pub use orchestrator::*;

use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{LmUsage, ToolSchemaError};

/// What a turn does after the backend answers with tool calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolPolicy {
    /// Keep requesting with the grown history until the model replies without
    /// tool calls, up to `max_tool_rounds` rounds.
    #[default]
    UntilFinal,
    /// The first tool round ends the turn; its summary is the turn's output.
    SummaryOnly,
}

/// Options shared by every conversation in a run.
#[derive(Clone, Debug, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Maximum number of conversations in flight at once.
    #[builder(default = 8)]
    pub batch_size: usize,
    #[builder(default)]
    pub stop_sequences: Vec<String>,
    /// Function tool definitions, forwarded to the backend as-is.
    #[builder(default)]
    pub tools: Vec<Value>,
    pub structured_labels: Option<Vec<String>>,
    #[builder(into)]
    pub system_message: Option<String>,
    #[builder(default)]
    pub tool_policy: ToolPolicy,
    #[builder(default = 8)]
    pub max_tool_rounds: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions::builder().build()
    }
}

impl RunOptions {
    /// The requested label set, or `None` when structured decoding is off.
    pub fn labels(&self) -> Option<&[String]> {
        self.structured_labels
            .as_deref()
            .filter(|labels| !labels.is_empty())
    }
}

/// Per-conversation outcome. `outputs` has one entry per submitted turn.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ConversationResult {
    pub outputs: Vec<String>,
    pub usage: LmUsage,
    pub failed_turns: usize,
}

/// Errors that stop a run before any conversation starts.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error(transparent)]
    ToolSchema(#[from] ToolSchemaError),
}
