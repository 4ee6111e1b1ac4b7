use aks_exporter::app::build_http_app;
use aks_exporter::config::{Cli, Config};
use aks_exporter::exporter::Exporter;
use aks_exporter::logging;
use aks_exporter::server::{self, Timeouts};
use aks_exporter::state::AppState;
use anyhow::{Context, Result};
use clap::Parser;
use prometheus::Registry;
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::Dispatch;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let defaults = cli.defaults();
    let config = match Config::load(&cli.config, defaults.clone()) {
        Ok(config) => config,
        Err(e) => {
            let logger = logging::build_dispatch(&defaults.log);
            tracing::dispatcher::with_default(&logger, || {
                tracing::error!(error = %format!("{e:#}"), "Failed to load configuration");
            });
            return Err(e);
        }
    };

    let logger = logging::build_dispatch(&config.log);
    let result = run(config, logger.clone())
        .with_subscriber(logger.clone())
        .await;
    if let Err(e) = &result {
        tracing::dispatcher::with_default(&logger, || {
            tracing::error!(error = %format!("{e:#}"), "Exporter stopped with an error");
        });
    }
    result
}

async fn run(config: Config, logger: Dispatch) -> Result<()> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Version information"
    );
    let profile = if cfg!(debug_assertions) { "debug" } else { "release" };
    tracing::info!(
        target_os = std::env::consts::OS,
        target_arch = std::env::consts::ARCH,
        profile,
        "Build information"
    );

    let client = aks_cloud::build_client(config.exporter.aks.clone())
        .context("Failed to create AKS client")?;
    let exporter = Exporter::new(client, Handle::current(), logger.clone())
        .context("Failed to create exporter")?;

    let registry = Registry::new();
    registry
        .register(Box::new(exporter))
        .context("Failed to register exporter")?;

    let app = build_http_app(AppState { registry, logger });
    let address = config.server.listen_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to listen on {address}"))?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match server::wait_for_signal().await {
                Ok(()) => tracing::info!("Shutdown started"),
                Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signals"),
            }
            shutdown.cancel();
        }
        .with_current_subscriber()
    });

    server::serve(listener, app, shutdown, Timeouts::default()).await
}
