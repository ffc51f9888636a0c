use std::fs;
use std::path::Path;

use dspy_runner::{ConfigError, RunnerConfig, ToolPolicy, ToolSchemaError};
use rstest::*;
use serde_json::json;
use tempfile::TempDir;

fn write_config(dir: &Path, yaml: &str) -> std::path::PathBuf {
    let path = dir.join("runner.yaml");
    fs::write(&path, yaml).unwrap();
    path
}

#[rstest]
fn test_full_config_loads() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        r####"
model:
  provider: openrouter
  model: meta-llama/llama-3-8b-instruct
  temperature: 0.0
  max_tokens: 128
  use_structured: false
  api_key_env: MY_KEY
  transport:
    timeout_secs: 30
inference:
  batch_size: 16
  stop_sequences: ["###"]
  structured_labels: [yes, no]
  system_message: Answer yes or no.
  tool_policy: summary_only
  max_tool_rounds: 2
dataset:
  path: data.jsonl
  fields:
    turns: [question, follow_up]
  sample_size: 10
  shuffle_seed: 7
"####,
    );

    let config = RunnerConfig::load(&path).unwrap();

    assert_eq!(config.model.provider.as_deref(), Some("openrouter"));
    assert_eq!(config.model.api_key_env.as_deref(), Some("MY_KEY"));
    assert_eq!(config.model.lm.model, "meta-llama/llama-3-8b-instruct");
    assert_eq!(config.model.lm.temperature, 0.0);
    assert_eq!(config.model.lm.max_tokens, 128);
    assert!(!config.model.lm.use_structured);
    assert_eq!(config.model.transport.timeout_secs, 30);
    assert_eq!(config.model.transport.connect_timeout_secs, 10);

    let options = &config.inference.options;
    assert_eq!(options.batch_size, 16);
    assert_eq!(options.stop_sequences, vec!["###".to_string()]);
    assert_eq!(
        options.structured_labels,
        Some(vec!["yes".to_string(), "no".to_string()])
    );
    assert_eq!(options.system_message.as_deref(), Some("Answer yes or no."));
    assert_eq!(options.tool_policy, ToolPolicy::SummaryOnly);
    assert_eq!(options.max_tool_rounds, 2);

    let dataset = config.dataset.as_ref().unwrap();
    assert_eq!(dataset.fields.turns, vec!["question", "follow_up"]);
    assert_eq!(dataset.sample_size, Some(10));
    assert_eq!(dataset.shuffle_seed, Some(7));
    assert_eq!(dataset.indent, 4);
    assert_eq!(config.base_dir, dir.path());
}

#[rstest]
fn test_minimal_config_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "model:\n  model: gpt-4o-mini\n");

    let config = RunnerConfig::load(&path).unwrap();

    assert!(config.model.provider.is_none());
    assert_eq!(config.model.lm.temperature, 0.7);
    assert!(config.model.lm.use_structured);
    assert_eq!(config.inference.options.batch_size, 8);
    assert_eq!(config.inference.options.tool_policy, ToolPolicy::UntilFinal);
    assert!(config.dataset.is_none());
}

#[rstest]
fn test_zero_batch_size_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "model: {}\ninference:\n  batch_size: 0\n");

    assert!(matches!(
        RunnerConfig::load(&path),
        Err(ConfigError::InvalidBatchSize)
    ));
}

#[rstest]
fn test_missing_file_and_bad_yaml() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        RunnerConfig::load(dir.path().join("absent.yaml")),
        Err(ConfigError::Read { .. })
    ));

    let path = write_config(dir.path(), "model: [unclosed\n");
    assert!(matches!(
        RunnerConfig::load(&path),
        Err(ConfigError::Parse { .. })
    ));
}

#[rstest]
fn test_run_options_loads_referenced_files() {
    let dir = TempDir::new().unwrap();
    let tools = json!([{
        "type": "function",
        "function": {"name": "get_weather", "parameters": {"type": "object"}}
    }]);
    fs::write(dir.path().join("tools.json"), tools.to_string()).unwrap();
    fs::write(dir.path().join("system.txt"), "You are a weather bot.\n").unwrap();
    let path = write_config(
        dir.path(),
        "model: {}\ninference:\n  tools_path: tools.json\n  system_message_path: system.txt\n",
    );

    let options = RunnerConfig::load(&path).unwrap().run_options().unwrap();

    assert_eq!(options.tools, tools.as_array().unwrap().clone());
    assert_eq!(options.system_message.as_deref(), Some("You are a weather bot."));
}

#[rstest]
#[case("[{\"type\": \"function\", \"function\": {}}]", "missing")]
#[case("{\"tools\": []}", "not_a_list")]
#[case("not json", "parse")]
fn test_run_options_rejects_bad_tool_files(#[case] contents: &str, #[case] expected: &str) {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("tools.json"), contents).unwrap();
    let path = write_config(dir.path(), "model: {}\ninference:\n  tools_path: tools.json\n");

    let error = RunnerConfig::load(&path).unwrap().run_options().unwrap_err();

    let matched = match (&error, expected) {
        (ConfigError::ToolSchema(ToolSchemaError::MissingName { index: 0 }), "missing") => true,
        (ConfigError::ToolSchema(ToolSchemaError::NotAList { .. }), "not_a_list") => true,
        (ConfigError::ToolSchema(ToolSchemaError::Parse { .. }), "parse") => true,
        _ => false,
    };
    assert!(matched, "unexpected error: {error:?}");
}

#[rstest]
fn test_unreadable_tool_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "model: {}\ninference:\n  tools_path: missing.json\n");

    let error = RunnerConfig::load(&path).unwrap().run_options().unwrap_err();

    assert!(matches!(
        error,
        ConfigError::ToolSchema(ToolSchemaError::Read { .. })
    ));
}
