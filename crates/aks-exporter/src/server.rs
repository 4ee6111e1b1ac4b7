use anyhow::Context;
use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder as HyperAcceptor;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;

/// Time a client gets to send the request headers.
pub const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(3);
/// Time open connections get to finish after shutdown starts.
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub header_read: Duration,
    pub shutdown_grace: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            header_read: HEADER_READ_TIMEOUT,
            shutdown_grace: SHUTDOWN_GRACE_PERIOD,
        }
    }
}

/// Serve `app` until `shutdown` is cancelled, then stop accepting and drain
/// open connections for at most `timeouts.shutdown_grace`.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
    timeouts: Timeouts,
) -> anyhow::Result<()> {
    let address = listener.local_addr().context("Failed to read listen address")?;
    tracing::info!(address = %address, "Server started");

    let mut acceptor = HyperAcceptor::new(TokioExecutor::new());
    acceptor
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(timeouts.header_read);
    let graceful = GracefulShutdown::new();

    loop {
        let (stream, remote) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            },
            _ = shutdown.cancelled() => break,
        };

        let service = TowerToHyperService::new(app.clone());
        let connection = acceptor.serve_connection_with_upgrades(TokioIo::new(stream), service);
        let connection = graceful.watch(connection.into_owned());
        tokio::spawn(
            async move {
                if let Err(e) = connection.await {
                    tracing::debug!(remote = %remote, error = %e, "Connection closed with an error");
                }
            }
            .with_current_subscriber(),
        );
    }

    drop(listener);
    tracing::debug!("Start shutdown of the server");
    match tokio::time::timeout(timeouts.shutdown_grace, graceful.shutdown()).await {
        Ok(()) => tracing::info!("Server stopped"),
        Err(_) => tracing::warn!(
            grace_period_secs = timeouts.shutdown_grace.as_secs(),
            "Graceful shutdown timed out, dropping open connections"
        ),
    }
    Ok(())
}

/// Resolve once SIGINT or SIGTERM is received.
pub async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
