use async_openai::types::FunctionObject;
use bon::Builder;
use serde::Serialize;
use serde_json::Value;

use super::{LmUsage, Message};
use crate::core::ToolSchemaError;

/// How the backend may pick among attached tools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
}

/// A function tool definition in the chat-completions shape.
///
/// `{"type": "function", "function": {"name": ..., "description": ..., "parameters": ...}}`.
/// The `function` object must read as a chat-completions function, so every
/// accepted schema can be sent as-is.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ToolSchema(Value);

impl ToolSchema {
    pub(crate) fn parse(index: usize, value: Value) -> Result<Self, ToolSchemaError> {
        let object = value
            .as_object()
            .ok_or(ToolSchemaError::NotAnObject { index })?;

        if let Some(kind) = object.get("type") {
            let kind = kind.as_str().unwrap_or_default();
            if kind != "function" {
                return Err(ToolSchemaError::UnsupportedType {
                    index,
                    kind: kind.to_string(),
                });
            }
        }

        let has_name = object
            .get("function")
            .and_then(|function| function.get("name"))
            .and_then(Value::as_str)
            .is_some_and(|name| !name.is_empty());
        if !has_name {
            return Err(ToolSchemaError::MissingName { index });
        }

        serde_json::from_value::<FunctionObject>(object["function"].clone())
            .map_err(|source| ToolSchemaError::InvalidFunction { index, source })?;

        Ok(Self(value))
    }

    pub fn name(&self) -> &str {
        self.0["function"]["name"].as_str().unwrap_or_default()
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// The `function` object in the backend's typed form.
    pub fn function(&self) -> Result<FunctionObject, serde_json::Error> {
        serde_json::from_value(self.0["function"].clone())
    }
}

/// Validates an externally supplied tool list, keeping its order.
pub fn parse_tool_schemas(values: &[Value]) -> Result<Vec<ToolSchema>, ToolSchemaError> {
    values
        .iter()
        .cloned()
        .enumerate()
        .map(|(index, value)| ToolSchema::parse(index, value))
        .collect()
}

/// A strict JSON-schema output constraint (`response_format`).
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseFormat {
    pub name: String,
    pub schema: Value,
    pub strict: bool,
}

/// Parameters of one completion round trip.
#[derive(Clone, Debug, Builder)]
pub struct CompletionRequest {
    #[builder(into)]
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
    #[builder(default)]
    pub stop: Vec<String>,
    #[builder(default)]
    pub tools: Vec<ToolSchema>,
    pub tool_choice: Option<ToolChoice>,
    pub response_format: Option<ResponseFormat>,
}

impl CompletionRequest {
    /// The most recent user message, if any.
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == super::Role::User)
    }
}

/// The single assistant choice returned by the backend.
#[derive(Clone, Debug)]
pub struct CompletionResponse {
    pub message: Message,
    pub usage: LmUsage,
}

impl CompletionResponse {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            usage: LmUsage::default(),
        }
    }
}
