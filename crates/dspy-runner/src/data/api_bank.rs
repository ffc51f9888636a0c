//! Normalizes API-Bank style records into `{query, instruction, ground_truth}`.
//!
//! Expected outputs of the form `API-Request: [Name(key='value', ...)]` become
//! tool ground truth; anything else is kept as a natural-language answer.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

const API_REQUEST_MARKER: &str = "API-Request";

static API_CALL_PAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([A-Za-z0-9_]+)\((.*)\)\]").unwrap());

static API_PARAM_PAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\w+)=('([^']*)'|"([^"]*)")"#).unwrap());

/// One call parsed out of an `API-Request: [...]` string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub name: String,
    pub parameters: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool: String,
    pub parameters: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GroundTruth {
    Tool { tools: Vec<ToolInvocation> },
    Nlp { response: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedEntry {
    /// `null` when the record has no `input`.
    pub query: Option<String>,
    pub instruction: Option<String>,
    pub ground_truth: GroundTruth,
}

/// Parses the first `[Name(k='v', ...)]` call in `text`.
///
/// Parameter values may be single- or double-quoted; unquoted values are
/// not recognized.
pub fn parse_api_request(text: &str) -> Option<ApiRequest> {
    let captures = API_CALL_PAT.captures(text)?;
    let name = captures.get(1)?.as_str().to_string();
    let arguments = captures.get(2).map_or("", |m| m.as_str());

    let parameters = API_PARAM_PAT
        .captures_iter(arguments)
        .filter_map(|param| {
            let key = param.get(1)?.as_str().to_string();
            let value = param.get(3).or_else(|| param.get(4))?.as_str();
            Some((key, Value::from(value)))
        })
        .collect();

    Some(ApiRequest { name, parameters })
}

/// Normalizes one raw record.
///
/// The expected output is taken from `expected_output`, then `answer`, then
/// `output`; empty strings count as missing. `input` and `instruction` are
/// copied as-is and stay `None` when absent.
pub fn format_entry(record: &Value) -> FormattedEntry {
    let text = |key: &str| {
        record
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let expected = ["expected_output", "answer", "output"]
        .into_iter()
        .map(text)
        .find(|value| !value.is_empty())
        .unwrap_or_default();

    let ground_truth = if expected.contains(API_REQUEST_MARKER) {
        let invocation = match parse_api_request(&expected) {
            Some(request) => ToolInvocation {
                tool: request.name,
                parameters: request.parameters,
            },
            None => {
                debug!(raw = %expected, "unrecognized API request");
                let mut parameters = Map::new();
                parameters.insert("raw".to_string(), Value::from(expected.clone()));
                ToolInvocation {
                    tool: "unknown".to_string(),
                    parameters,
                }
            }
        };
        GroundTruth::Tool {
            tools: vec![invocation],
        }
    } else {
        GroundTruth::Nlp { response: expected }
    };

    let passthrough = |key: &str| record.get(key).and_then(Value::as_str).map(String::from);

    FormattedEntry {
        query: passthrough("input"),
        instruction: passthrough("instruction"),
        ground_truth,
    }
}

/// Writes `entries` as one pretty-printed JSON array.
pub fn write_formatted(path: impl AsRef<Path>, entries: &[FormattedEntry], indent: usize) -> Result<()> {
    let path = path.as_ref();
    let indent = " ".repeat(indent);
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    entries.serialize(&mut serializer)?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, buffer).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_mixed_quotes() {
        let request =
            parse_api_request(r#"API-Request: [ToolSearcher(keywords='weather', city="Paris")]"#)
                .unwrap();
        assert_eq!(request.name, "ToolSearcher");
        assert_eq!(request.parameters["keywords"], json!("weather"));
        assert_eq!(request.parameters["city"], json!("Paris"));
    }

    #[test]
    fn call_without_parameters() {
        let request = parse_api_request("API-Request: [GetToday()]").unwrap();
        assert_eq!(request.name, "GetToday");
        assert!(request.parameters.is_empty());
    }

    #[test]
    fn plain_text_is_not_a_request() {
        assert!(parse_api_request("The weather is sunny.").is_none());
    }
}
