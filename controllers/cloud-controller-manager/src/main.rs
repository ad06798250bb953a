//! BinaryLane Cloud Controller Manager
//!
//! Runs two controllers against the BinaryLane API:
//! - Service: one load balancer per `type: LoadBalancer` Service
//! - Node: node initialization, load balancer backends and pod CIDR routes
//!
//! Configuration comes from environment variables, see `config` and
//! `cloud_provider::config`.

mod backoff;
mod config;
mod controller;
mod error;
mod health;
mod reconciler;
mod test_utils;
mod watcher;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use cloud_provider::{CloudConfig, PROVIDER_NAME, ProviderRegistry, register_builtin_providers};
use controller::Controller;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // kube and reqwest both use rustls; pick the ring provider once for the process
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        error!("Failed to install rustls crypto provider: {:?}", e);
    }

    info!("Starting BinaryLane Cloud Controller Manager");

    let cloud_config = CloudConfig::from_env()?;
    let controller_config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Cluster name: {}", controller_config.cluster_name);
    info!("  Region: {}", cloud_config.region);
    info!("  API URL: {}", cloud_config.api_url);
    info!(
        "  Cluster CIDR: {}",
        cloud_config
            .cluster_cidr
            .map(|c| c.to_string())
            .unwrap_or_else(|| "not set".to_string())
    );
    info!("  Health probes: {}", controller_config.health_addr);

    let mut registry = ProviderRegistry::new();
    register_builtin_providers(&mut registry);
    let cloud = registry.build(PROVIDER_NAME, cloud_config)?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    let controller = Controller::new(cloud, controller_config, shutdown).await?;
    controller.run().await?;

    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
