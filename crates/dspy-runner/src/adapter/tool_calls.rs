use serde_json::{Value, json};

use crate::core::{Message, ToolCall};

/// Content of the tool-role message recorded for each call. Tools are never
/// executed here, so the model only learns that the call was noted.
pub const TOOL_RESULT_PLACEHOLDER: &str = "Tool call recorded. No result is available.";

/// The outcome of resolving one tool-call-bearing response.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolRound {
    /// The assistant message verbatim, then one tool message per call.
    pub messages: Vec<Message>,
    /// `{"tool_calls":[{"name":...,"arguments":...}]}` in issuing order.
    pub summary: String,
}

impl ToolRound {
    pub fn call_count(&self) -> usize {
        self.messages.len().saturating_sub(1)
    }
}

/// Returns `None` when `message` carries no tool calls.
pub fn resolve_tool_calls(message: &Message) -> Option<ToolRound> {
    if !message.has_tool_calls() {
        return None;
    }

    let calls = message.tool_calls();
    let mut messages = Vec::with_capacity(calls.len() + 1);
    messages.push(message.clone());
    messages.extend(
        calls
            .iter()
            .map(|call| Message::tool(call.id.clone(), TOOL_RESULT_PLACEHOLDER)),
    );

    Some(ToolRound {
        messages,
        summary: summarize_tool_calls(calls),
    })
}

pub fn summarize_tool_calls(calls: &[ToolCall]) -> String {
    let calls = calls
        .iter()
        .map(|call| json!({ "name": call.name, "arguments": call.arguments }))
        .collect::<Vec<Value>>();
    json!({ "tool_calls": calls }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Role;

    #[test]
    fn plain_reply_is_not_a_tool_round() {
        assert!(resolve_tool_calls(&Message::assistant("hello")).is_none());
    }

    #[test]
    fn tool_messages_follow_call_order_and_ids() {
        let message = Message::assistant_tool_calls(
            None,
            vec![
                ToolCall::new("a", "get_weather", r#"{"city":"Paris"}"#),
                ToolCall::new("b", "get_time", "{}"),
            ],
        );

        let round = resolve_tool_calls(&message).unwrap();

        assert_eq!(round.messages.len(), 3);
        assert_eq!(round.call_count(), 2);
        assert_eq!(round.messages[0], message);
        assert_eq!(round.messages[1].role, Role::Tool);
        assert_eq!(round.messages[1].tool_call_id.as_deref(), Some("a"));
        assert_eq!(round.messages[2].role, Role::Tool);
        assert_eq!(round.messages[2].tool_call_id.as_deref(), Some("b"));
        assert_eq!(round.messages[2].content(), TOOL_RESULT_PLACEHOLDER);
    }

    #[test]
    fn summary_keeps_arguments_as_opaque_strings() {
        let summary = summarize_tool_calls(&[ToolCall::new("a", "lookup", r#"{"id": 7}"#)]);

        assert_eq!(
            summary,
            r#"{"tool_calls":[{"name":"lookup","arguments":"{\"id\": 7}"}]}"#
        );
    }
}
