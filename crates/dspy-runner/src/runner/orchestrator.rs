use futures::future::join_all;
use tracing::{Instrument, debug_span, info};

use super::{
    ConcurrencyGate, ConversationResult, ConversationRunner, RequestTemplate, RunError, RunOptions,
};
use crate::core::{CompletionProvider, LM, LMClient, LMConfig, parse_tool_schemas};
use crate::data::Conversation;

/// Runs many independent conversations against one backend.
///
/// All conversations are polled from the caller's task; the gate decides how
/// many of them may talk to the backend at the same time. Results come back in
/// input order.
pub struct Orchestrator<P> {
    provider: P,
    config: LMConfig,
}

impl Orchestrator<LMClient> {
    pub fn from_lm(lm: LM) -> Self {
        Self::new(lm.client, lm.config)
    }
}

impl<P: CompletionProvider> Orchestrator<P> {
    pub fn new(provider: P, config: LMConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &LMConfig {
        &self.config
    }

    /// Runs every conversation and returns one output list per conversation.
    ///
    /// Only setup problems (bad batch size, bad tool schemas) are returned as
    /// errors. A failing turn shows up as an empty string in its slot.
    pub async fn run(
        &self,
        conversations: &[Conversation],
        options: &RunOptions,
    ) -> Result<Vec<Vec<String>>, RunError> {
        let results = self.run_detailed(conversations, options).await?;
        Ok(results.into_iter().map(|result| result.outputs).collect())
    }

    /// Like [`Orchestrator::run`], keeping token usage and failure counts.
    #[tracing::instrument(
        name = "dsrs.orchestrator.run",
        level = "info",
        skip_all,
        fields(conversations = conversations.len(), batch_size = options.batch_size)
    )]
    pub async fn run_detailed(
        &self,
        conversations: &[Conversation],
        options: &RunOptions,
    ) -> Result<Vec<ConversationResult>, RunError> {
        let tools = parse_tool_schemas(&options.tools)?;
        let gate = ConcurrencyGate::new(options.batch_size)?;
        let template = RequestTemplate::new(&self.config, options, tools);
        let runner = ConversationRunner::new(&self.provider, &template, options);

        let tasks = conversations
            .iter()
            .enumerate()
            .map(|(index, conversation)| {
                let gate = &gate;
                let runner = &runner;
                async move {
                    let permit = gate.acquire().await;
                    let result = runner.run(conversation).await;
                    permit.release();
                    result
                }
                .instrument(debug_span!("dsrs.conversation", index))
            });

        let results = join_all(tasks).await;

        let failed_turns: usize = results.iter().map(|result| result.failed_turns).sum();
        let total_tokens: u64 = results
            .iter()
            .map(|result| u64::from(result.usage.total_tokens))
            .sum();
        info!(failed_turns, total_tokens, "run finished");

        Ok(results)
    }
}
