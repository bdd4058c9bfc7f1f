//! # Quill — document Q&A assistant
//!
//! Usage:
//!   quill serve                 # Start the HTTP gateway
//!   quill ingest notes.txt      # Ingest a document into the knowledge base
//!   quill ask "What is ...?"    # One-shot question with streamed answer

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use quill_agent::TurnEvent;
use quill_core::config::QuillConfig;
use quill_core::types::{ConversationMessage, InvocationState, MessagePart};
use quill_gateway::AppState;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quill", version, about = "Document Q&A over a personal knowledge base")]
struct Cli {
    /// Path to config file (default: ~/.quill/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP gateway
    Serve {
        /// Port override
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Ingest a text file into the knowledge base
    Ingest {
        /// Path to the document
        file: PathBuf,
    },
    /// Ask one question and stream the answer to stdout
    Ask {
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "quill=debug,tower_http=debug" } else { "quill=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => QuillConfig::load_from(path)?,
        None => QuillConfig::load()?,
    };

    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.gateway.port = port;
            }
            println!("Quill v{}", env!("CARGO_PKG_VERSION"));
            println!("  API: http://{}:{}/api/chat", config.gateway.host, config.gateway.port);
            quill_gateway::start(&config).await
        }
        Command::Ingest { file } => {
            let text = std::fs::read_to_string(&file)?;
            let state = AppState::from_config(&config)?;
            let report = state.pipeline.ingest(&text).await?;
            println!("{}", report.message());
            Ok(())
        }
        Command::Ask { question } => {
            let state = AppState::from_config(&config)?;
            let mut events =
                state.agent.run_turn(vec![ConversationMessage::user_text(question)]);

            while let Some(event) = events.next().await {
                match event {
                    TurnEvent::TextDelta { delta } => {
                        print!("{delta}");
                        std::io::stdout().flush()?;
                    }
                    TurnEvent::ToolState { part } => {
                        if let MessagePart::ToolInvocation {
                            tool_name,
                            state: InvocationState::Call,
                            ..
                        } = part
                        {
                            eprintln!("[{tool_name}]");
                        }
                    }
                    TurnEvent::Finished { .. } => {
                        println!();
                    }
                    TurnEvent::Error { message } => {
                        anyhow::bail!("turn failed: {message}");
                    }
                }
            }
            Ok(())
        }
    }
}
