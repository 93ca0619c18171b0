use std::sync::Arc;

use anyhow::Context;
use clap::Parser as _;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use ethwatch::api::{self, SharedParser};
use ethwatch::config::Config;
use ethwatch::logging::init_tracing;
use ethwatch::{EthParser, EthRpcClient, IngestLoop, LogNotifier, MemoryState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse().validate()?;
    init_tracing(&config.log_config())?;

    let source = EthRpcClient::new(config.rpc_url.clone(), config.http_client_config())
        .with_context(|| format!("create RPC client for {}", config.rpc_url))?;
    let state = Arc::new(MemoryState::new());
    let ingest = IngestLoop::new(state.clone(), source, LogNotifier, config.loop_config());
    let handle = ingest.handle();
    let ingest_task = tokio::spawn(ingest.run());

    let parser: SharedParser = Arc::new(EthParser::new(state, handle.clone()));

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("bind {}", config.listen))?;
    tracing::info!(addr = %config.listen, rpc_url = %config.rpc_url, "HTTP API listening");

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(api::serve(listener, parser.clone(), async move {
        let _ = stop_rx.await;
    }));

    tokio::select! {
        _ = shutdown_signal() => {
            tracing::info!("shutting down");
        }
        res = &mut server => {
            parser.shutdown();
            res.context("HTTP server task panicked")?
                .context("HTTP server failed")?;
            anyhow::bail!("HTTP server exited unexpectedly");
        }
    }

    parser.shutdown();
    let _ = stop_tx.send(());

    match tokio::time::timeout(config.shutdown_grace(), server).await {
        Ok(joined) => joined
            .context("HTTP server task panicked")?
            .context("HTTP server failed")?,
        Err(_) => tracing::warn!(
            grace_secs = config.shutdown_grace_secs,
            "HTTP server did not drain in time"
        ),
    }

    // the loop exits at its next wake-up; don't hold the process for a full interval
    if tokio::time::timeout(config.shutdown_grace(), handle.stopped()).await.is_err() {
        ingest_task.abort();
    }

    tracing::info!("server exiting");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
