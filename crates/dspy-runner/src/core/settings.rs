use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use super::{ConfigError, LMConfig, ToolSchemaError, TransportConfig, parse_tool_schemas};
use crate::data::FieldMap;
use crate::runner::RunOptions;

/// Top-level YAML document for a run.
///
/// ```yaml
/// model:
///   provider: openai
///   model: gpt-4o-mini
///   temperature: 0.0
/// inference:
///   batch_size: 16
///   structured_labels: [yes, no]
///   tools_path: tools.json
/// dataset:
///   path: data/questions.jsonl
///   fields:
///     turns: [question]
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub dataset: Option<DatasetConfig>,
    /// Directory relative paths in the file resolve against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Backend selection plus the per-request inference parameters.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// `openai`, `openrouter`, `local`, `dummy`, ... When absent, a
    /// `provider/` prefix on the model name decides, then `openai`.
    pub provider: Option<String>,
    pub base_url: Option<String>,
    /// Environment variable holding the API key. Defaults to
    /// `<PROVIDER>_API_KEY`.
    pub api_key_env: Option<String>,
    #[serde(flatten)]
    pub lm: LMConfig,
    #[serde(default)]
    pub transport: TransportConfig,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(flatten)]
    pub options: RunOptions,
    /// JSON file holding an array of function tool definitions.
    #[serde(default)]
    pub tools_path: Option<PathBuf>,
    /// Text file whose content becomes the system message.
    #[serde(default)]
    pub system_message_path: Option<PathBuf>,
}

/// Where conversations come from and where formatted data goes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub path: Option<PathBuf>,
    pub repo: Option<String>,
    pub file: Option<String>,
    pub revision: Option<String>,
    pub fields: FieldMap,
    pub sample_size: Option<usize>,
    pub shuffle_seed: Option<u64>,
    pub output_path: Option<PathBuf>,
    pub indent: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: None,
            repo: None,
            file: None,
            revision: None,
            fields: FieldMap::default(),
            sample_size: None,
            shuffle_seed: None,
            output_path: None,
            indent: 4,
        }
    }
}

impl RunnerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: RunnerConfig =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inference.options.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        Ok(())
    }

    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Run options with file references loaded and tool schemas checked.
    pub fn run_options(&self) -> Result<RunOptions, ConfigError> {
        self.validate()?;
        let mut options = self.inference.options.clone();

        if let Some(path) = &self.inference.tools_path {
            options
                .tools
                .extend(load_tool_definitions(self.resolve_path(path))?);
        }
        parse_tool_schemas(&options.tools)?;

        if let Some(path) = &self.inference.system_message_path {
            let path = self.resolve_path(path);
            let text = fs::read_to_string(&path)
                .map_err(|source| ConfigError::Read { path, source })?;
            options.system_message = Some(text.trim_end().to_string());
        }

        Ok(options)
    }
}

/// Reads a JSON array of tool definitions without validating each entry.
pub fn load_tool_definitions(path: impl AsRef<Path>) -> Result<Vec<Value>, ToolSchemaError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| ToolSchemaError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&raw).map_err(|source| ToolSchemaError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Array(tools) => Ok(tools),
        _ => Err(ToolSchemaError::NotAList {
            path: path.to_path_buf(),
        }),
    }
}
