//! Main controller implementation.
//!
//! `Controller` validates the BinaryLane token, builds the reconciler and runs
//! the Service and Node watchers next to the probe server until one of them
//! stops or shutdown is requested.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::health::{self, HealthState};
use crate::reconciler::Reconciler;
use crate::watcher::Watcher;
use cloud_provider::Cloud;
use cloud_provider::config::ENV_ACCESS_TOKEN;
use kube::Client;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

type Task = JoinHandle<Result<(), ControllerError>>;

pub struct Controller {
    service_watcher: Task,
    node_watcher: Task,
    health_server: Task,
    shutdown: CancellationToken,
}

impl Controller {
    /// Creates a new controller instance and starts its background tasks.
    pub async fn new(
        cloud: Cloud,
        config: ControllerConfig,
        shutdown: CancellationToken,
    ) -> Result<Self, ControllerError> {
        info!("Initializing BinaryLane cloud controller manager");

        // Probes come up first so liveness holds while we validate
        let health = HealthState::default();
        let health_server = {
            let state = health.clone();
            let token = shutdown.clone();
            let addr = config.health_addr;
            tokio::spawn(async move { health::serve(addr, state, token).await })
        };

        info!("Validating BinaryLane token and connectivity...");
        cloud.validate().await.map_err(|e| {
            error!("Failed to validate BinaryLane token: {}", e);
            error!("Please ensure:");
            error!("  1. {} is set to a valid API token", ENV_ACCESS_TOKEN);
            error!("  2. The BinaryLane API is reachable at {}", cloud.config().api_url);
            ControllerError::Cloud(e)
        })?;
        info!("BinaryLane token validated");

        let kube_client = Client::try_default().await?;

        let reconciler = Reconciler::new(kube_client, &cloud, config, shutdown.clone())?;
        if reconciler.routes.is_none() {
            warn!("No cluster CIDR configured, route management is disabled");
        }

        let watcher = Arc::new(Watcher::new(Arc::new(reconciler), shutdown.clone()));

        let service_watcher = {
            let watcher = watcher.clone();
            tokio::spawn(async move { watcher.watch_services().await })
        };
        let node_watcher = {
            let watcher = watcher.clone();
            tokio::spawn(async move { watcher.watch_nodes().await })
        };

        health.set_ready(true);

        Ok(Self {
            service_watcher,
            node_watcher,
            health_server,
            shutdown,
        })
    }

    /// Runs until any task exits, then stops the others
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("BinaryLane cloud controller manager running");

        let result = tokio::select! {
            result = &mut self.service_watcher => flatten("Service watcher", result),
            result = &mut self.node_watcher => flatten("Node watcher", result),
            result = &mut self.health_server => flatten("Health server", result),
        };

        self.shutdown.cancel();
        for (name, task) in [
            ("Service watcher", self.service_watcher),
            ("Node watcher", self.node_watcher),
            ("Health server", self.health_server),
        ] {
            if task.is_finished() {
                continue;
            }
            if let Err(e) = flatten(name, task.await) {
                warn!("{} stopped with error: {}", name, e);
            }
        }

        info!("BinaryLane cloud controller manager stopped");
        result
    }
}

fn flatten(
    name: &str,
    result: Result<Result<(), ControllerError>, tokio::task::JoinError>,
) -> Result<(), ControllerError> {
    result
        .map_err(|e| ControllerError::Watch(format!("{} panicked: {}", name, e)))?
        .map_err(|e| ControllerError::Watch(format!("{} error: {}", name, e)))
}
