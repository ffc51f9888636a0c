//! Batched multi-turn conversations against OpenAI-compatible chat backends.
//!
//! Build an [`LM`] from a [`ModelConfig`], wrap it in an [`Orchestrator`], and
//! hand it a list of [`Conversation`]s. Every conversation keeps its own
//! history; a [`ConcurrencyGate`] bounds how many talk to the backend at once.

pub mod adapter;
pub mod core;
pub mod data;
pub mod providers;
pub mod runner;
pub mod utils;

pub use adapter::*;
pub use core::*;
pub use data::*;
pub use providers::*;
pub use runner::*;
pub use utils::*;
