//! Interactive chat against a local Ollama server
//!
//! Reads prompts from stdin and streams each reply. Press Ctrl-C while a
//! reply is streaming to stop it; press it again at the prompt to quit.
//!
//! Set `OLLAMA_BASE_URL` / `OLLAMA_MODEL` to override the defaults and
//! `PARLEY_DATA_DIR` to keep chats on disk.

use futures::StreamExt;
use parley::prelude::*;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("parley=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = OllamaConfig::from_env()?;
    println!("Using model {} at {}", config.model, config.base_url);
    let backend = Arc::new(Ollama::from_config(config)?);

    let store: Arc<dyn RecordStore> = match std::env::var("PARLEY_DATA_DIR") {
        Ok(dir) => Arc::new(FileStore::new(dir)?),
        Err(_) => Arc::new(MemoryStore::new()),
    };
    let service = ChatService::with_defaults(backend, store);
    let chat = service.create_chat().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(prompt) = line else { break };
        if prompt.trim().is_empty() {
            continue;
        }

        let mut task = service.send_message(&chat.id, &prompt).await?;
        loop {
            tokio::select! {
                item = task.stream.next() => match item {
                    Some(Ok(text)) => {
                        print!("{}", text);
                        std::io::stdout().flush()?;
                    }
                    Some(Err(e)) => {
                        eprintln!("\n[error] {}", e);
                        break;
                    }
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    service.stop(&chat.id);
                    println!("\n[stopped]");
                }
            }
        }
        // Errors were already shown from the stream
        if let Ok(RelayOutcome::Cancelled { fragments, .. }) = task.outcome.await? {
            tracing::debug!(fragments, "Reply stopped");
        }
    }

    let history = service.messages(&chat.id).await?;
    println!("\n{} messages in chat {}", history.len(), chat.id);
    Ok(())
}
