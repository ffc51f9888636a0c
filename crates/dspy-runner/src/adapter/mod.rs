//! Response post-processing.
//!
//! Two pure transforms sit between the backend and the conversation history:
//! [`resolve_tool_calls`] turns a tool-call-bearing assistant message into the
//! messages the history must grow by plus a JSON summary of what the model
//! asked for, and [`decode_structured`] pulls a label out of a
//! `{"classification": ...}` reply. Neither touches the network or the
//! history itself; the runner decides what to do with their output.

pub mod structured;
pub mod tool_calls;

pub use structured::*;
pub use tool_calls::*;
