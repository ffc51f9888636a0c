use tracing::{debug, warn};

use super::{ConversationResult, RunOptions, ToolPolicy};
use crate::adapter::{classification_format, decode_structured, resolve_tool_calls};
use crate::core::{
    Chat, CompletionProvider, CompletionRequest, LMConfig, LmError, LmUsage, Message,
    ResponseFormat, ToolChoice, ToolSchema,
};
use crate::data::Conversation;
use crate::utils::truncate;

/// Everything about a completion request except the history.
#[derive(Clone, Debug)]
pub struct RequestTemplate {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stop: Vec<String>,
    pub tools: Vec<ToolSchema>,
    pub response_format: Option<ResponseFormat>,
}

impl RequestTemplate {
    pub fn new(config: &LMConfig, options: &RunOptions, tools: Vec<ToolSchema>) -> Self {
        let response_format = options
            .labels()
            .filter(|_| config.use_structured)
            .map(classification_format);

        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            stop: options.stop_sequences.clone(),
            tools,
            response_format,
        }
    }

    /// Builds the request for the next round trip over `history`.
    pub fn request(&self, history: &Chat) -> CompletionRequest {
        let tool_choice = (!self.tools.is_empty()).then_some(ToolChoice::Auto);
        CompletionRequest::builder()
            .model(self.model.clone())
            .messages(history.messages().to_vec())
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .stop(self.stop.clone())
            .tools(self.tools.clone())
            .maybe_tool_choice(tool_choice)
            .maybe_response_format(self.response_format.clone())
            .build()
    }
}

/// Drives the turns of one conversation in order.
///
/// The history lives only inside [`ConversationRunner::run`]; a failing turn
/// is recorded as an empty output and never aborts the conversation.
pub struct ConversationRunner<'a, P> {
    provider: &'a P,
    template: &'a RequestTemplate,
    options: &'a RunOptions,
}

impl<'a, P: CompletionProvider> ConversationRunner<'a, P> {
    pub fn new(provider: &'a P, template: &'a RequestTemplate, options: &'a RunOptions) -> Self {
        Self {
            provider,
            template,
            options,
        }
    }

    #[tracing::instrument(
        name = "dsrs.runner.conversation",
        level = "debug",
        skip_all,
        fields(turns = conversation.len())
    )]
    pub async fn run(&self, conversation: &Conversation) -> ConversationResult {
        let mut history = Chat::seeded(self.options.system_message.as_deref());
        let mut result = ConversationResult {
            outputs: Vec::with_capacity(conversation.len()),
            ..Default::default()
        };

        for (turn, text) in conversation.turns().iter().enumerate() {
            history.push_message(Message::user(text.clone()));

            match self.run_turn(&mut history, &mut result.usage).await {
                Ok(output) => result.outputs.push(output),
                Err(error) => {
                    warn!(
                        turn,
                        error = %error,
                        class = ?error.class(),
                        "turn failed, recording empty output"
                    );
                    history.push_message(Message::assistant(""));
                    result.failed_turns += 1;
                    result.outputs.push(String::new());
                }
            }
        }

        debug!(
            messages = history.len(),
            failed_turns = result.failed_turns,
            total_tokens = result.usage.total_tokens,
            "conversation finished"
        );
        result
    }

    async fn run_turn(&self, history: &mut Chat, usage: &mut LmUsage) -> Result<String, LmError> {
        let mut rounds = 0;
        loop {
            let response = self
                .provider
                .complete(self.template.request(history))
                .await?;
            *usage += response.usage;

            let Some(round) = resolve_tool_calls(&response.message) else {
                return Ok(self.finish_turn(history, response.message));
            };

            rounds += 1;
            debug!(round = rounds, calls = round.call_count(), "tool round resolved");
            history.extend(round.messages);

            match self.options.tool_policy {
                ToolPolicy::SummaryOnly => return Ok(round.summary),
                ToolPolicy::UntilFinal if rounds >= self.options.max_tool_rounds.max(1) => {
                    warn!(rounds, "tool round limit reached, using last tool summary");
                    return Ok(round.summary);
                }
                ToolPolicy::UntilFinal => continue,
            }
        }
    }

    /// Appends the raw reply and returns the turn's recorded output.
    fn finish_turn(&self, history: &mut Chat, message: Message) -> String {
        let raw = message.content.unwrap_or_default();
        debug!(content = truncate(&raw, 200), "turn answered");
        history.push_message(Message::assistant(raw.clone()));

        match self.options.labels() {
            Some(labels) => decode_structured(&raw, labels),
            None => raw,
        }
    }
}
