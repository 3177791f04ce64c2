//! SSO HTTP server.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use discourse_sso::{MemoryNonceStore, NonceStore, SsoError, SsoProvider};
use discourse_sso_telemetry::{log_listening, log_nonce_sweep, log_shutdown, MetricsRegistry};
use tokio::net::TcpListener;
use tokio::signal;

use crate::api::{create_router, AppState};
use crate::auth::{Authenticator, StaticUserDirectory, UserDirectoryError};
use crate::config::ServerConfig;

/// Exit status for a process stopped by an unrecoverable runtime error.
pub const EXIT_RUNTIME_ERROR: u8 = 1;

/// Exit status for invalid configuration detected at startup.
pub const EXIT_CONFIG_ERROR: u8 = 2;

/// Map a startup or serve error to the process exit status.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    if let Some(e) = err.downcast_ref::<SsoError>() {
        if e.is_startup_fatal() {
            return EXIT_CONFIG_ERROR;
        }
    }
    if err.downcast_ref::<UserDirectoryError>().is_some() {
        return EXIT_CONFIG_ERROR;
    }
    EXIT_RUNTIME_ERROR
}

/// Build the provider, user directory and shared state from configuration.
pub fn build_state(config: &ServerConfig, metrics: Arc<MetricsRegistry>) -> anyhow::Result<AppState> {
    let store: Arc<dyn NonceStore> = Arc::new(MemoryNonceStore::new());

    let provider = SsoProvider::builder()
        .secret(config.sso_secret.clone())
        .local_auth_url(config.local_auth_url.clone())
        .discourse_url(config.discourse_url.clone())
        .auth_source(config.auth_source.clone())
        .nonce_ttl(config.nonce_ttl)
        .nonce_store(store)
        .build()?;

    let directory = match &config.users_file {
        Some(path) => {
            let directory = StaticUserDirectory::load(path)
                .with_context(|| format!("failed to load users from {}", path.display()))?;
            tracing::info!(users = directory.len(), path = %path.display(), "loaded user directory");
            directory
        }
        None => {
            tracing::warn!("no user directory configured; every login will be rejected");
            StaticUserDirectory::empty()
        }
    };
    let authenticator: Arc<dyn Authenticator> = Arc::new(directory);

    Ok(AppState {
        provider: Arc::new(provider),
        authenticator,
        metrics,
    })
}

/// Run the SSO server until a shutdown signal arrives.
pub async fn run(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    // Start expired nonce sweep task
    let sweep_store = Arc::clone(state.provider.store());
    let sweep_metrics = Arc::clone(&state.metrics);
    let sweep_interval = config.sweep_interval;
    let sweeper = tokio::spawn(async move {
        run_nonce_sweep(sweep_store, sweep_metrics, sweep_interval).await;
    });

    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    log_listening!(address = %config.listen_addr, "SSO server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    log_shutdown!("SSO server stopped");

    Ok(())
}

/// Periodically drops nonce entries whose TTL has elapsed. Entries are also
/// rejected on read once expired; this only bounds memory for handshakes
/// that are never completed.
async fn run_nonce_sweep(
    store: Arc<dyn NonceStore>,
    metrics: Arc<MetricsRegistry>,
    every: Duration,
) {
    let mut interval = tokio::time::interval(every);
    interval.tick().await; // skip immediate first tick

    loop {
        interval.tick().await;
        sweep_once(store.as_ref(), &metrics);
    }
}

/// One sweep pass. Returns the number of entries removed.
pub fn sweep_once(store: &dyn NonceStore, metrics: &MetricsRegistry) -> usize {
    let expired = store.purge_expired();
    let pending = store.len();
    metrics.record_sweep(expired, pending);
    if expired > 0 {
        log_nonce_sweep!(expired, pending, "swept expired SSO nonces");
    }
    expired
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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
