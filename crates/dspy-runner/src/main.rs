use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;

use dspy_runner::{
    DataLoader, LM, Orchestrator, RunnerConfig, format_entry, init_tracing_with,
    to_conversations, write_formatted,
};

/// Run batches of multi-turn conversations against a chat completion backend.
#[derive(Parser, Debug)]
#[command(name = "dspy-runner", version, about)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every conversation and print one JSON line per conversation.
    Run {
        /// YAML config file.
        #[arg(short, long)]
        config: PathBuf,

        /// Conversations to run instead of the config's dataset section.
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Normalize an API-Bank style dataset and write it to `dataset.output_path`.
    FormatDataset {
        /// YAML config file.
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let directive = if cli.verbose {
        "dspy_runner=debug"
    } else {
        "dspy_runner=info"
    };
    init_tracing_with(directive)?;

    match cli.command {
        Command::Run { config, input } => run(&config, input.as_deref()).await,
        Command::FormatDataset { config } => format_dataset(&config).await,
    }
}

async fn run(config_path: &Path, input: Option<&Path>) -> Result<()> {
    let config = RunnerConfig::load(config_path)?;
    let options = config.run_options()?;
    let lm = LM::from_config(&config.model)?;

    let dataset = config.dataset.clone().unwrap_or_default();
    let records = match input {
        Some(path) => DataLoader::load_file(path)?,
        None if config.dataset.is_some() => {
            DataLoader::load_dataset(&dataset, &config.base_dir).await?
        }
        None => return Err(anyhow!("no --input given and the config has no dataset")),
    };
    let conversations = to_conversations(&records, &dataset.fields)?;
    info!(
        conversations = conversations.len(),
        model = %lm.config.model,
        "starting run"
    );

    let orchestrator = Orchestrator::from_lm(lm);
    let results = orchestrator.run_detailed(&conversations, &options).await?;

    let mut out = BufWriter::new(io::stdout().lock());
    for (index, result) in results.iter().enumerate() {
        let line = json!({
            "index": index,
            "outputs": result.outputs,
            "failed_turns": result.failed_turns,
            "usage": result.usage,
        });
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

async fn format_dataset(config_path: &Path) -> Result<()> {
    let config = RunnerConfig::load(config_path)?;
    let dataset = config
        .dataset
        .as_ref()
        .context("config has no dataset section")?;
    let output_path = dataset
        .output_path
        .as_ref()
        .map(|path| config.resolve_path(path))
        .context("dataset.output_path is required")?;

    let records = DataLoader::load_dataset(dataset, &config.base_dir).await?;
    let entries: Vec<_> = records.iter().map(format_entry).collect();
    write_formatted(&output_path, &entries, dataset.indent)?;

    info!(
        entries = entries.len(),
        path = %output_path.display(),
        "formatted dataset written"
    );
    Ok(())
}
