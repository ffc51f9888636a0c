use serde_json::{Value, json};
use tracing::debug;

use crate::core::ResponseFormat;

pub const CLASSIFICATION_FIELD: &str = "classification";

/// Builds the strict `json_schema` constraint restricting replies to `labels`.
pub fn classification_format(labels: &[String]) -> ResponseFormat {
    ResponseFormat {
        name: CLASSIFICATION_FIELD.to_string(),
        schema: json!({
            "type": "object",
            "properties": {
                CLASSIFICATION_FIELD: {
                    "type": "string",
                    "enum": labels,
                }
            },
            "required": [CLASSIFICATION_FIELD],
            "additionalProperties": false,
        }),
        strict: true,
    }
}

/// Extracts the `classification` value from a JSON reply.
///
/// Anything that is not a JSON object with that field comes back unchanged.
/// String values are returned verbatim, other JSON values in compact form.
pub fn decode_structured(raw: &str, labels: &[String]) -> String {
    let Ok(Value::Object(mut object)) = serde_json::from_str::<Value>(raw.trim()) else {
        return raw.to_string();
    };

    let decoded = match object.remove(CLASSIFICATION_FIELD) {
        Some(Value::String(label)) => label,
        Some(other) => other.to_string(),
        None => return raw.to_string(),
    };

    if !labels.iter().any(|label| *label == decoded) {
        debug!(label = %decoded, "decoded label is outside the requested set");
    }
    decoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn labels() -> Vec<String> {
        vec!["yes".to_string(), "no".to_string()]
    }

    #[rstest]
    #[case(r#"{"classification":"yes"}"#, "yes")]
    #[case(r#"  {"classification": "no", "reason": "short"}  "#, "no")]
    #[case(r#"{"classification": 3}"#, "3")]
    #[case(r#"{"label":"yes"}"#, r#"{"label":"yes"}"#)]
    #[case("yes", "yes")]
    #[case(r#"["yes"]"#, r#"["yes"]"#)]
    #[case(r#"{"classification":"#, r#"{"classification":"#)]
    #[case("", "")]
    fn decodes_or_passes_through(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(decode_structured(raw, &labels()), expected);
    }

    #[test]
    fn labels_outside_the_set_are_still_returned() {
        assert_eq!(
            decode_structured(r#"{"classification":"maybe"}"#, &labels()),
            "maybe"
        );
    }

    #[test]
    fn format_names_every_label() {
        let format = classification_format(&labels());

        assert_eq!(format.name, "classification");
        assert!(format.strict);
        assert_eq!(
            format.schema["properties"]["classification"]["enum"],
            json!(["yes", "no"])
        );
        assert_eq!(format.schema["additionalProperties"], json!(false));
    }
}
