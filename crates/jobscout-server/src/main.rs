mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use jobscout_client::{ClientSettings, JobSearchClient};
use jobscout_core::AppConfig;
use jobscout_engine::{
    AlertChannel, CredentialHolder, EngineSettings, EngineState, StateStore, Sweeper,
};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

/// Longest wait for an in-flight sweep to finish after a shutdown signal.
const SWEEP_DRAIN_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(jobscout_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::info!(env = %config.env, data_dir = %config.data_dir.display(), "starting jobscout");

    let engine = Arc::new(build_engine(&config).await?);

    let client = JobSearchClient::new(&config.api_url, ClientSettings::from_app_config(&config))?;
    let alerts = AlertChannel::from_webhook_url(
        config.alert_webhook_url.as_deref(),
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let sweeper = Arc::new(Sweeper::new(Arc::clone(&engine), client, alerts));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let sweep_task = tokio::spawn(sweeper.run_forever(shutdown_rx));

    let mut scheduler = scheduler::build_scheduler(Arc::clone(&engine)).await?;

    let auth = AuthState::from_tokens(
        &config.admin_tokens,
        matches!(config.env, jobscout_core::Environment::Development),
    )?;
    let app = build_app(
        AppState {
            engine: Arc::clone(&engine),
        },
        auth,
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "snapshot API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_tx.send(true).ok();
    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = %e, "scheduler shutdown failed");
    }
    match tokio::time::timeout(SWEEP_DRAIN_TIMEOUT, sweep_task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "sweep loop task failed"),
        Err(_) => {
            tracing::warn!("sweep still running at shutdown; flushing state without it");
            engine.flush_all().await;
        }
    }
    Ok(())
}

/// Restores engine state from the data dir with the configured locations
/// and credential.
async fn build_engine(config: &AppConfig) -> anyhow::Result<EngineState> {
    let locations = match &config.locations_path {
        Some(path) => jobscout_core::load_locations(path)?,
        None => jobscout_core::default_locations(),
    };
    tracing::info!(targets = locations.len(), "locations loaded");

    let credential = CredentialHolder::new(config.auth_token.as_deref());
    if let Some(path) = &config.credential_file {
        credential.refresh_from_file(path).await?;
    }
    if let Some(fingerprint) = credential.fingerprint().await {
        tracing::info!(%fingerprint, "credential: loaded");
    } else {
        tracing::warn!("credential: none configured; locations will be skipped until one is supplied");
    }

    let engine = EngineState::restore(
        EngineSettings::from_app_config(config),
        locations,
        credential,
        StateStore::new(&config.data_dir),
    )
    .await?;
    Ok(engine)
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
            Ok(mut signal) => {
                signal.recv().await;
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
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
