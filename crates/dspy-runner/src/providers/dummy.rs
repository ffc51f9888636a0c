use crate::core::{CompletionProvider, CompletionRequest, CompletionResponse, LmError, Message};

/// Offline backend that echoes the latest user turn back as the assistant reply.
///
/// Useful for dry runs of a config: every conversation completes without a
/// network call, so the dataset and fan-out wiring can be checked in isolation.
#[derive(Clone, Debug, Default)]
pub struct DummyProvider;

impl CompletionProvider for DummyProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LmError> {
        let reply = request
            .last_user_message()
            .map(|message| message.content().to_string())
            .unwrap_or_default();
        Ok(CompletionResponse::new(Message::assistant(reply)))
    }
}
