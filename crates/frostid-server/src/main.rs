mod config;
mod routes;
mod telemetry;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use frostid::{
    CoordinationProvider, EnvProvider, HostnameProvider, IdGenerator, WorkerIdProvider,
};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use crate::config::{CliArgs, ProviderKind, ServerConfig};
use crate::routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;
    telemetry::init();

    let provider = build_provider(&config)?;
    let ip = instance_ip(&config)?;
    info!(ip = %ip, port = %config.port, app = %config.app_name, "resolving worker identity");

    let mut generator = IdGenerator::new(&ip, &config.port, &config.app_name, provider);
    // Identity acquisition may block on the coordination service; keep it
    // off the runtime's core threads, and finish before accepting traffic.
    let generator = tokio::task::spawn_blocking(move || generator.init().map(|()| generator))
        .await
        .context("worker identity task panicked")??;

    let state = AppState {
        generator: Arc::new(generator),
        max_batch_ids: config.max_batch_ids,
    };
    let app = routes::router(state);

    let listener = TcpListener::bind(&config.server_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server_addr))?;
    info!(addr = %config.server_addr, "id service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("service shut down cleanly");
    Ok(())
}

fn build_provider(config: &ServerConfig) -> anyhow::Result<WorkerIdProvider> {
    let provider = match config.worker_id_provider {
        ProviderKind::Environment => {
            WorkerIdProvider::Env(EnvProvider::from_env(&config.worker_id_env_name)?)
        }
        ProviderKind::Hostname => WorkerIdProvider::Hostname(HostnameProvider::from_os()?),
        ProviderKind::Zookeeper => WorkerIdProvider::Coordination(CoordinationProvider::zookeeper(
            &config.zookeeper_conn_string,
        )?),
    };
    Ok(provider)
}

fn instance_ip(config: &ServerConfig) -> anyhow::Result<String> {
    if let Some(ip) = &config.instance_ip {
        return Ok(ip.clone());
    }
    let ip = local_ip_address::local_ip().context("failed to autodetect a non-loopback ip")?;
    Ok(ip.to_string())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C"),
        () = terminate => info!("received SIGTERM"),
    }
    info!("shutting down gracefully");
}
