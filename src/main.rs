//! chatcore-cli: operator tooling for exercising the library without a real
//! platform adapter (SPEC_FULL.md §1.4).

use anyhow::{Context as _, Result};
use chatcore::adapter::{self, MockAdapter, OptsMap};
use chatcore::model::{CapabilityMatrix, Revive, ToPlain, WebhookRequest};
use chatcore::{Chat, Registry};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "chatcore-cli", version)]
#[command(about = "Operator tooling for the chatcore event router and outbound facade")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a declared capability matrix against the reflected defaults
    ValidateCapabilities {
        /// Adapter name the matrix is declared for
        #[arg(long)]
        adapter: String,
        /// Path to a JSON file holding a plain-encoded `CapabilityMatrix`
        matrix: PathBuf,
    },
    /// Replay a JSON webhook request against a `MockAdapter` and print the response
    ReplayWebhook {
        /// Adapter name to register the `MockAdapter` under
        #[arg(long, default_value = "mock")]
        adapter: String,
        /// Path to a JSON file holding a plain-encoded `WebhookRequest`
        request: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(run(cli.command))
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::ValidateCapabilities { adapter, matrix } => validate_capabilities(&adapter, &matrix),
        Command::ReplayWebhook { adapter, request } => replay_webhook(&adapter, &request).await,
    }
}

fn validate_capabilities(adapter_name: &str, matrix_path: &PathBuf) -> Result<()> {
    let raw = std::fs::read_to_string(matrix_path)
        .with_context(|| format!("reading {}", matrix_path.display()))?;
    let plain: serde_json::Value = serde_json::from_str(&raw).context("parsing capability matrix JSON")?;
    let matrix = CapabilityMatrix::revive(&plain).context("reviving capability matrix")?;

    // No live platform adapter is available from the CLI, so the declared
    // matrix is checked against `MockAdapter`'s fixed manifest as a
    // reference stand-in (spec.md §9: validation needs an adapter's
    // `implemented_capabilities` manifest, not just the matrix).
    let adapter = MockAdapter::new(adapter_name).with_capabilities(matrix);

    match adapter::validate_capabilities(adapter_name, &adapter) {
        Ok(()) => {
            tracing::info!(adapter = adapter_name, "capability matrix valid");
            println!("{adapter_name}: ok");
            Ok(())
        }
        Err(e) => {
            tracing::warn!(adapter = adapter_name, error = %e, "capability matrix invalid");
            println!("{adapter_name}: invalid ({e})");
            Err(e.into())
        }
    }
}

async fn replay_webhook(adapter_name: &str, request_path: &PathBuf) -> Result<()> {
    let raw = std::fs::read_to_string(request_path)
        .with_context(|| format!("reading {}", request_path.display()))?;
    let plain: serde_json::Value = serde_json::from_str(&raw).context("parsing webhook request JSON")?;
    let request = WebhookRequest::revive(&plain).context("reviving webhook request")?;

    let registry = Arc::new(Registry::new());
    registry.register_as(adapter_name, Arc::new(MockAdapter::new(adapter_name)));
    let chat = Chat::new("replay").with_adapters(registry);

    let (_chat, response) = chatcore::webhook::handle_request(chat, adapter_name, request, &OptsMap::new()).await;
    tracing::info!(adapter = adapter_name, status = response.status, "webhook replayed");
    println!("{}", serde_json::to_string_pretty(&response.to_plain())?);
    Ok(())
}
