//! Conduit CLI - run demo tools through a request-scoped dispatcher

mod demo;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use conduit_core::prelude::*;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "conduit")]
#[command(about = "Request-scoped tool dispatch CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to conduit.toml plus CONDUIT_* variables)
    #[arg(long, global = true, env = "CONDUIT_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in tools
    Tools,
    /// Dispatch one tool and print its events and response
    Dispatch {
        /// Tool name
        tool: String,

        /// Parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,

        /// Subject the request acts for
        #[arg(long, default_value = "cli")]
        subject: String,

        /// Conversation id
        #[arg(long, default_value = "local")]
        conversation: String,
    },
    /// Version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("conduit {}", env!("CARGO_PKG_VERSION"));
            println!("conduit-core {}", conduit_core::VERSION);
        }
        Commands::Tools => {
            for tool in demo::tools() {
                let summary = ToolSummary::from(tool.as_ref());
                println!("{}", serde_json::to_string(&summary)?);
            }
        }
        Commands::Dispatch {
            tool,
            params,
            subject,
            conversation,
        } => {
            let config = load_config(cli.config)?;
            dispatch(config, &tool, &params, subject, conversation).await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<DispatchConfig> {
    let config = match path {
        Some(path) => DispatchConfig::load_from(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => DispatchConfig::load()?,
    };
    Ok(config)
}

async fn dispatch(
    config: DispatchConfig,
    tool: &str,
    params: &str,
    subject: String,
    conversation: String,
) -> Result<()> {
    let parameters = match serde_json::from_str::<Value>(params).context("parsing --params")? {
        Value::Object(map) => map,
        other => anyhow::bail!("--params must be a JSON object, got {}", other),
    };
    let input = ToolInput::new(tool, parameters)?;

    let (tx, mut rx) = event_channel(config.event_buffer);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!(error = %e, "Failed to render event"),
            }
        }
    });

    let factory = DispatcherFactory::new(config);
    let identity = IdentityContext::new(subject, conversation, Uuid::new_v4().to_string()).shared();
    let channel: SharedChannel = Arc::new(ChannelNotifier::new(tx));

    let response = factory
        .scoped(identity, channel, demo::tools(), |dispatcher| async move {
            dispatcher
                .dispatch(&input.tool_name, input.parameters)
                .await
        })
        .await?;

    // the scope has dropped the last sender, so the printer drains and exits
    printer.await.context("event printer task failed")?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}

