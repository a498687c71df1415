//! bankmeter service
//!
//! - Loads `bankmeter.yaml` (or the path in argv[1] / `BANKMETER_CONFIG`)
//! - Builds the meter registry, attaches `application=bankapp`, binds timing
//! - Serves `/actuator/health` and the Prometheus scrape endpoint
//!
//! Startup fails with a non-zero exit if metrics cannot be wired.

use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use bankmeter_core::error::{MetricsError, Result};
use bankmeter_service::{app_state, config, router};

const DEFAULT_LOG_FILTER: &str = "bankmeter_core=info,bankmeter_service=info";

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    fmt().with_env_filter(filter).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(
                code = e.code().as_str(),
                error = %e,
                "bankmeter-service startup failed"
            );
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let explicit = std::env::args().nth(1).or_else(|| std::env::var(config::CONFIG_ENV).ok());
    let cfg = config::load(explicit.as_deref())?;
    let listen = cfg.server.listen_addr()?;

    let state = app_state::AppState::new(cfg)?;
    let app = router::build_router(state);

    tracing::info!(%listen, "bankmeter-service starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| MetricsError::Internal(format!("bind {listen} failed: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| MetricsError::Internal(format!("server failed: {e}")))?;

    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
}
