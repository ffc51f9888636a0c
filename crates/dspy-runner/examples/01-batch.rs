/*
Script to run a handful of conversations through the offline dummy backend.

Run with:
```
cargo run --example 01-batch
```

Swap `provider: dummy` for `openai` (and export OPENAI_API_KEY) to hit a real model.
*/

use anyhow::Result;
use dspy_runner::{
    Conversation, LM, ModelConfig, Orchestrator, RunOptions, init_tracing,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let model = ModelConfig {
        provider: Some("dummy".to_string()),
        ..Default::default()
    };
    let orchestrator = Orchestrator::from_lm(LM::from_config(&model)?);

    let conversations = vec![
        Conversation::new(["What is the capital of France?", "And of Italy?"]),
        Conversation::single("Name a prime number."),
        Conversation::new(["Hi", "How are you?", "Bye"]),
    ];
    let options = RunOptions::builder()
        .batch_size(2)
        .system_message("Answer in one word.")
        .build();

    let outputs = orchestrator.run(&conversations, &options).await?;
    for (index, turns) in outputs.iter().enumerate() {
        println!("conversation {index}: {turns:?}");
    }

    Ok(())
}
