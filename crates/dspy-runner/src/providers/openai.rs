use std::time::Duration;

use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolChoiceOption, ChatCompletionToolType,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs, FunctionCall,
    ResponseFormat as OpenAIResponseFormat, ResponseFormatJsonSchema, Stop,
};
use async_openai::{Client, config::OpenAIConfig};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, trace};

use crate::core::{
    CompletionProvider, CompletionRequest, CompletionResponse, ConfigError, LmError, LmUsage,
    Message, Role, ToolCall, ToolChoice, TransportConfig,
};

const PROVIDER_NAME: &str = "openai";

/// Chat-completions backend for any OpenAI-compatible endpoint
/// (OpenAI, OpenRouter, Groq, vLLM, ...).
#[derive(Clone)]
pub struct OpenAIProvider {
    client: Client<OpenAIConfig>,
    base_url: String,
    timeout: Duration,
}

impl OpenAIProvider {
    pub fn new(
        api_key: SecretString,
        base_url: String,
        transport: &TransportConfig,
    ) -> Result<Self, ConfigError> {
        let http_client = reqwest::Client::builder()
            .timeout(transport.timeout())
            .connect_timeout(transport.connect_timeout())
            .pool_max_idle_per_host(transport.max_idle_connections)
            .build()
            .map_err(|source| ConfigError::HttpClient { source })?;

        let config = OpenAIConfig::new()
            .with_api_key(api_key.expose_secret().to_string())
            .with_api_base(base_url.clone());
        let client = Client::with_config(config).with_http_client(http_client);

        Ok(OpenAIProvider {
            client,
            base_url,
            timeout: transport.timeout(),
        })
    }

    fn map_error(&self, error: OpenAIError) -> LmError {
        match error {
            OpenAIError::Reqwest(source) if source.is_timeout() => LmError::Timeout {
                after: self.timeout,
            },
            OpenAIError::Reqwest(source) => LmError::Network {
                endpoint: self.base_url.clone(),
                source,
            },
            OpenAIError::ApiError(api_error) => {
                let rate_limited = api_error
                    .r#type
                    .as_deref()
                    .is_some_and(|kind| kind.contains("rate_limit"))
                    || api_error.message.to_lowercase().contains("rate limit");
                if rate_limited {
                    LmError::RateLimit {
                        message: api_error.message,
                    }
                } else {
                    LmError::Api {
                        kind: api_error.r#type,
                        message: api_error.message,
                    }
                }
            }
            OpenAIError::JSONDeserialize(source) => LmError::MalformedResponse {
                reason: source.to_string(),
            },
            other => LmError::Provider {
                provider: PROVIDER_NAME.to_string(),
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}

impl From<&ToolCall> for ChatCompletionMessageToolCall {
    fn from(tool_call: &ToolCall) -> Self {
        ChatCompletionMessageToolCall {
            id: tool_call.id.clone(),
            r#type: ChatCompletionToolType::Function,
            function: FunctionCall {
                name: tool_call.name.clone(),
                arguments: tool_call.arguments.clone(),
            },
        }
    }
}

impl From<ChatCompletionMessageToolCall> for ToolCall {
    fn from(tool_call: ChatCompletionMessageToolCall) -> Self {
        ToolCall {
            id: tool_call.id,
            name: tool_call.function.name,
            arguments: tool_call.function.arguments,
        }
    }
}

impl From<ToolChoice> for ChatCompletionToolChoiceOption {
    fn from(choice: ToolChoice) -> Self {
        match choice {
            ToolChoice::Auto => ChatCompletionToolChoiceOption::Auto,
        }
    }
}

fn to_request_message(message: &Message) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    let content = message.content().to_string();
    let request_message = match message.role {
        Role::System => ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(content)
                .build()?,
        ),
        Role::User => ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(content)
                .build()?,
        ),
        Role::Assistant => {
            let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
            if let Some(content) = &message.content {
                builder.content(content.clone());
            }
            if message.has_tool_calls() {
                let tool_calls: Vec<ChatCompletionMessageToolCall> = message
                    .tool_calls()
                    .iter()
                    .map(ChatCompletionMessageToolCall::from)
                    .collect();
                builder.tool_calls(tool_calls);
            }
            ChatCompletionRequestMessage::Assistant(builder.build()?)
        }
        Role::Tool => ChatCompletionRequestMessage::Tool(
            ChatCompletionRequestToolMessageArgs::default()
                .content(content)
                .tool_call_id(message.tool_call_id.clone().unwrap_or_default())
                .build()?,
        ),
    };
    Ok(request_message)
}

#[allow(deprecated)]
fn to_openai_request(request: CompletionRequest) -> Result<CreateChatCompletionRequest, OpenAIError> {
    let messages = request
        .messages
        .iter()
        .map(to_request_message)
        .collect::<Result<Vec<_>, _>>()?;

    let mut builder = CreateChatCompletionRequestArgs::default();
    builder
        .model(request.model)
        .messages(messages)
        .temperature(request.temperature)
        .max_tokens(request.max_tokens);

    if !request.stop.is_empty() {
        builder.stop(Stop::StringArray(request.stop));
    }

    if !request.tools.is_empty() {
        let tools = request
            .tools
            .iter()
            .map(|tool| {
                tool.function().map(|function| ChatCompletionTool {
                    r#type: ChatCompletionToolType::Function,
                    function,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(OpenAIError::JSONDeserialize)?;
        builder.tools(tools);
    }

    if let Some(choice) = request.tool_choice {
        builder.tool_choice(ChatCompletionToolChoiceOption::from(choice));
    }

    if let Some(format) = request.response_format {
        builder.response_format(OpenAIResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                description: None,
                name: format.name,
                schema: Some(format.schema),
                strict: Some(format.strict),
            },
        });
    }

    builder.build()
}

impl CompletionProvider for OpenAIProvider {
    #[tracing::instrument(
        name = "dsrs.openai.complete",
        level = "debug",
        skip(self, request),
        fields(model = %request.model, messages = request.messages.len())
    )]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LmError> {
        // Nothing has been sent yet if conversion fails.
        let request = to_openai_request(request).map_err(|error| LmError::Provider {
            provider: PROVIDER_NAME.to_string(),
            message: format!("could not build request: {error}"),
            source: Some(Box::new(error)),
        })?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|error| self.map_error(error))?;

        let usage = response.usage.map(LmUsage::from).unwrap_or_default();
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LmError::MalformedResponse {
                reason: "response carried no choices".to_string(),
            })?;

        let tool_calls = choice
            .message
            .tool_calls
            .filter(|calls| !calls.is_empty())
            .map(|calls| calls.into_iter().map(ToolCall::from).collect::<Vec<_>>());

        debug!(
            tool_calls = tool_calls.as_ref().map_or(0, Vec::len),
            total_tokens = usage.total_tokens,
            "completion received"
        );
        trace!(content = ?choice.message.content, "raw completion content");

        let message = Message {
            role: Role::Assistant,
            content: choice.message.content,
            tool_calls,
            tool_call_id: None,
        };

        Ok(CompletionResponse { message, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ResponseFormat, parse_tool_schemas};
    use serde_json::json;

    fn base_request() -> CompletionRequest {
        CompletionRequest::builder()
            .model("gpt-4o-mini")
            .messages(vec![
                Message::system("classify"),
                Message::user("is rust fast?"),
                Message::assistant_tool_calls(
                    None,
                    vec![ToolCall::new("call_1", "search", r#"{"q":"rust"}"#)],
                ),
                Message::tool("call_1", "noted"),
            ])
            .temperature(0.0)
            .max_tokens(64)
            .build()
    }

    #[test]
    fn converts_history_with_tool_round() {
        let request = to_openai_request(base_request()).unwrap();

        assert_eq!(request.messages.len(), 4);
        assert!(matches!(
            request.messages[0],
            ChatCompletionRequestMessage::System(_)
        ));
        match &request.messages[2] {
            ChatCompletionRequestMessage::Assistant(assistant) => {
                let calls = assistant.tool_calls.as_ref().unwrap();
                assert_eq!(calls[0].id, "call_1");
                assert_eq!(calls[0].function.arguments, r#"{"q":"rust"}"#);
            }
            other => panic!("expected assistant message, got {other:?}"),
        }
        match &request.messages[3] {
            ChatCompletionRequestMessage::Tool(tool) => assert_eq!(tool.tool_call_id, "call_1"),
            other => panic!("expected tool message, got {other:?}"),
        }
    }

    #[test]
    fn attaches_tools_stop_and_response_format() {
        let mut request = base_request();
        request.stop = vec!["\n\n".to_string()];
        request.tools = parse_tool_schemas(&[json!({
            "type": "function",
            "function": {"name": "search", "parameters": {"type": "object", "properties": {}}}
        })])
        .unwrap();
        request.tool_choice = Some(ToolChoice::Auto);
        request.response_format = Some(ResponseFormat {
            name: "classification".to_string(),
            schema: json!({"type": "object"}),
            strict: true,
        });

        let request = to_openai_request(request).unwrap();

        assert_eq!(request.tools.as_ref().map(Vec::len), Some(1));
        assert!(matches!(
            request.tool_choice,
            Some(ChatCompletionToolChoiceOption::Auto)
        ));
        assert!(matches!(request.stop, Some(Stop::StringArray(ref stop)) if stop.len() == 1));
        assert!(matches!(
            request.response_format,
            Some(OpenAIResponseFormat::JsonSchema { .. })
        ));
    }

    #[test]
    fn omits_optional_fields_when_unused() {
        let request = to_openai_request(base_request()).unwrap();

        assert!(request.tools.is_none());
        assert!(request.tool_choice.is_none());
        assert!(request.stop.is_none());
        assert!(request.response_format.is_none());
    }
}
