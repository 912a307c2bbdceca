//! # chatgate
//!
//! Chat gateway binary: loads settings, starts logging and metrics, builds
//! the hosted and local backends, and serves until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chatgate_core::logging::{self, LogFormat};
use chatgate_llm::{BackendSet, OllamaBackend, OpenAiBackend};
use chatgate_server::config::ServerConfig;
use chatgate_server::server::GatewayServer;
use chatgate_settings::{ChatgateSettings, ProviderSettings};
use clap::Parser;

/// Real-time chat gateway with OpenAI → Ollama failover.
#[derive(Parser, Debug)]
#[command(name = "chatgate", about = "Real-time chat gateway")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (default `~/.chatgate/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit JSON log lines.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn apply(&self, settings: &mut ChatgateSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if self.log_json {
            settings.logging.json = true;
        }
    }
}

fn build_backends(providers: &ProviderSettings) -> BackendSet {
    let client = reqwest::Client::new();
    let hosted = OpenAiBackend::with_client(&providers.openai, client.clone());
    if !hosted.is_configured() {
        tracing::warn!("OPENAI_API_KEY not set, hosted prompts will fail over to Ollama");
    }
    let local = OllamaBackend::with_client(&providers.ollama, client);
    BackendSet::new(Arc::new(hosted), Arc::new(local))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings_path = args
        .config
        .clone()
        .unwrap_or_else(chatgate_settings::settings_path);
    let mut settings = chatgate_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;
    args.apply(&mut settings);

    let format = if settings.logging.json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    logging::init_subscriber(&settings.logging.level, format);

    let metrics_handle = chatgate_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;

    let backends = build_backends(&settings.providers);
    let config = ServerConfig::from(&settings.server);
    let shutdown_timeout = config.shutdown_timeout;
    let server = GatewayServer::new(
        config,
        backends,
        settings.providers.default_provider,
        metrics_handle,
    );

    let (addr, handle) = server
        .listen()
        .await
        .context("Failed to start server")?;
    tracing::info!(
        %addr,
        default_provider = settings.providers.default_provider.name(),
        hosted_model = %settings.providers.openai.model,
        local_model = %settings.providers.ollama.model,
        "chatgate ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server
        .shutdown()
        .graceful_shutdown(vec![handle], shutdown_timeout)
        .await;
    tracing::info!("Shutdown complete");
    Ok(())
}
