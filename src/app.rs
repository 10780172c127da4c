use sharefetch::config::Config;
use sharefetch::engine::CopyEngine;
use sharefetch::source::{LocalResolver, LocalTreeWalker};
use sharefetch::Pipeline;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::Cli;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub async fn run(cli: Cli) -> Result<(), AnyError> {
    if cli.print_config {
        // Shown as-is, even when it would not pass validation
        let config = Config::load_unvalidated(cli.config.clone(), |config| cli.apply(config))?;
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let config = Config::load_with_overrides(cli.config.clone(), |config| cli.apply(config))?;

    info!(
        roots = config.roots.len(),
        concurrency = config.dispatch.concurrency,
        workers = config.dispatch.worker_count(),
        output = %config.output.directory.display(),
        "Starting sharefetch"
    );

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_token.cancel();
    });

    let pipeline = Pipeline::new(
        Arc::new(config),
        Arc::new(LocalTreeWalker::new()),
        Arc::new(LocalResolver::new()),
        Arc::new(CopyEngine::new()),
        cancel,
    );

    let summary = pipeline.run().await?;
    for root in &summary.roots {
        info!(
            root = %root.root,
            walks = root.walks,
            completed = root.completed,
            "Root summary"
        );
    }
    if summary.metrics.tasks_failed > 0 {
        warn!(failed = summary.metrics.tasks_failed, "Some downloads failed before succeeding on a re-walk");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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
    info!("Shutdown signal received");
}
