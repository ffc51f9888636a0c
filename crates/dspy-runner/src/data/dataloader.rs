use anyhow::{Context, Result, anyhow, bail};
use csv::ReaderBuilder;
use hf_hub::api::tokio::ApiBuilder;
use hf_hub::{Repo, RepoType};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::Conversation;
use crate::core::DatasetConfig;

/// Names the record fields that hold a conversation's user turns.
///
/// Each listed field contributes its turns in order. A field may hold a
/// single string or an array of strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMap {
    pub turns: Vec<String>,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            turns: vec!["input".to_string()],
        }
    }
}

impl FieldMap {
    pub fn new<T: Into<String>>(turns: impl IntoIterator<Item = T>) -> Self {
        Self {
            turns: turns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Reads raw dataset records from local files or the Hugging Face hub.
pub struct DataLoader;

impl DataLoader {
    /// A file holding one JSON array of records.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Vec<Value>> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let value: Value = serde_json::from_str(&data)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;

        match value {
            Value::Array(records) => Ok(records),
            _ => bail!("{} must contain a JSON array of records", path.display()),
        }
    }

    /// A file holding one JSON record per line. Blank lines are skipped.
    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Vec<Value>> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        data.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(number, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("{}:{} is not valid JSON", path.display(), number + 1))
            })
            .collect()
    }

    /// A CSV file with a header row. Every cell becomes a string field.
    pub fn load_csv(path: impl AsRef<Path>, delimiter: u8) -> Result<Vec<Value>> {
        let path = path.as_ref();
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_path(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let headers = reader.headers()?.clone();

        reader
            .records()
            .map(|row| {
                let row = row?;
                let record: Map<String, Value> = headers
                    .iter()
                    .zip(row.iter())
                    .map(|(header, cell)| (header.to_string(), Value::from(cell)))
                    .collect();
                Ok(Value::Object(record))
            })
            .collect()
    }

    /// Picks a loader from the file extension.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Vec<Value>> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        match extension.as_str() {
            "json" => Self::load_json(path),
            "jsonl" | "ndjson" => Self::load_jsonl(path),
            "csv" => Self::load_csv(path, b','),
            "tsv" => Self::load_csv(path, b'\t'),
            other => bail!(
                "unsupported dataset format `{other}` for {}",
                path.display()
            ),
        }
    }

    /// Downloads one file of a hub dataset into the local cache.
    #[tracing::instrument(name = "dsrs.data.load_hf", level = "info", skip(revision))]
    pub async fn fetch_hf(repo: &str, file: &str, revision: Option<&str>) -> Result<PathBuf> {
        let api = ApiBuilder::new().with_progress(false).build()?;
        let repo = match revision {
            Some(revision) => {
                Repo::with_revision(repo.to_string(), RepoType::Dataset, revision.to_string())
            }
            None => Repo::new(repo.to_string(), RepoType::Dataset),
        };
        let path = api
            .repo(repo)
            .get(file)
            .await
            .with_context(|| format!("failed to download `{file}`"))?;
        debug!(path = %path.display(), "dataset file cached");
        Ok(path)
    }

    /// Downloads one file of a hub dataset and loads it by extension.
    pub async fn load_hf(repo: &str, file: &str, revision: Option<&str>) -> Result<Vec<Value>> {
        let path = Self::fetch_hf(repo, file, revision).await?;
        Self::load_file(path)
    }

    /// Loads the records a dataset section points at, then samples them.
    ///
    /// Relative paths resolve against `base_dir`.
    pub async fn load_dataset(config: &DatasetConfig, base_dir: &Path) -> Result<Vec<Value>> {
        let records = match (&config.path, &config.repo, &config.file) {
            (Some(path), _, _) => Self::load_file(resolve(base_dir, path))?,
            (None, Some(repo), Some(file)) => {
                Self::load_hf(repo, file, config.revision.as_deref()).await?
            }
            (None, Some(repo), None) => bail!("dataset repo `{repo}` needs a `file` to load"),
            (None, None, _) => bail!("dataset needs either `path` or `repo` and `file`"),
        };

        let records = sample(records, config.sample_size, config.shuffle_seed);
        info!(records = records.len(), "dataset loaded");
        Ok(records)
    }
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Optionally shuffles `records` with a fixed seed, then keeps the first
/// `sample_size` of them.
pub fn sample(mut records: Vec<Value>, sample_size: Option<usize>, seed: Option<u64>) -> Vec<Value> {
    if let Some(seed) = seed {
        let mut rng = StdRng::seed_from_u64(seed);
        records.shuffle(&mut rng);
    }
    if let Some(sample_size) = sample_size {
        records.truncate(sample_size);
    }
    records
}

/// Turns raw records into conversations.
///
/// A record that is itself an array of strings is taken as the turn list.
/// Otherwise the turns are collected from the fields in `fields`.
pub fn to_conversations(records: &[Value], fields: &FieldMap) -> Result<Vec<Conversation>> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            record_turns(record, fields)
                .map(Conversation::from)
                .with_context(|| format!("record #{index}"))
        })
        .collect()
}

fn record_turns(record: &Value, fields: &FieldMap) -> Result<Vec<String>> {
    match record {
        Value::Array(items) => items.iter().map(turn_text).collect(),
        Value::Object(object) => {
            let mut turns = Vec::new();
            for field in &fields.turns {
                match object.get(field) {
                    Some(Value::Array(items)) => {
                        for item in items {
                            turns.push(turn_text(item)?);
                        }
                    }
                    Some(value) => turns.push(turn_text(value)?),
                    None => bail!("missing turn field `{field}`"),
                }
            }
            Ok(turns)
        }
        other => Err(anyhow!("expected an object or an array, found {other}")),
    }
}

fn turn_text(value: &Value) -> Result<String> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Null => bail!("turn is null"),
        other => Ok(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn seeded_sample_is_stable() {
        let records: Vec<Value> = (0..20).map(Value::from).collect();
        let first = sample(records.clone(), Some(5), Some(42));
        let second = sample(records, Some(5), Some(42));
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
    }

    #[test]
    fn sample_without_seed_keeps_order() {
        let records: Vec<Value> = (0..5).map(Value::from).collect();
        assert_eq!(
            sample(records, Some(2), None),
            vec![Value::from(0), Value::from(1)]
        );
    }

    #[test]
    fn record_fields_flatten_in_order() {
        let fields = FieldMap::new(["context", "question"]);
        let record = json!({"context": ["a", "b"], "question": "c"});
        assert_eq!(record_turns(&record, &fields).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn missing_field_is_an_error() {
        let record = json!({"other": "x"});
        assert!(record_turns(&record, &FieldMap::default()).is_err());
    }
}
