use action_runtime::actions::default_actions;
use action_runtime::config::Config;
use action_runtime::framework::TypedError;
use action_runtime::initializers::{ActionsInitializer, ProcessInitializer, SessionInitializer};
use action_runtime::lifecycle::{setup_tracing, Orchestrator};
use action_runtime::servers::WebServer;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), TypedError> {
    let config = Config::from_env()?;
    setup_tracing(&config.logger);

    info!(name = %config.process.name, "Starting");

    let mut orchestrator = Orchestrator::new();
    orchestrator.register(Arc::new(ProcessInitializer::new(config.process.name.clone())))?;
    orchestrator.register(Arc::new(ActionsInitializer::new(default_actions())))?;
    orchestrator.register(Arc::new(SessionInitializer::new(&config.session)))?;
    if config.server.web.enabled {
        orchestrator.register(Arc::new(WebServer::new(&config)))?;
    }

    if let Err(e) = orchestrator.boot().await {
        error!(error = %e, "Boot failed");
        return Err(e);
    }

    shutdown_signal().await;

    orchestrator.shutdown().await.inspect_err(|e| error!(error = %e, "Shutdown incomplete"))
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        () = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
