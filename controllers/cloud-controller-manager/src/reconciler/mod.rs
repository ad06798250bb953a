//! Reconciliation logic for Services and Nodes.
//!
//! This module is organized by watched resource:
//! - `service`: load balancers for `type: LoadBalancer` Services
//! - `node`: node metadata and load balancer backend membership
//! - `routes`: pod CIDR routes, synchronised from the node reconciler

pub mod node;
pub mod routes;
pub mod service;

#[cfg(test)]
mod node_test;

use crate::backoff::FibonacciBackoff;
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use cloud_provider::{Cloud, CloudError, Instances, LoadBalancers, Routes, with_cancellation};
use k8s_openapi::api::core::v1::{Node, Service};
use kube::api::ListParams;
use kube::{Api, Client};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub const FIELD_MANAGER: &str = "binarylane-cloud-controller-manager";

/// Requeue delays on repeated failures: 5 seconds up to 5 minutes
const BACKOFF_MIN_SECONDS: u64 = 5;
const BACKOFF_MAX_SECONDS: u64 = 300;

/// Backoff state for a resource
#[derive(Debug, Clone)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

impl BackoffState {
    fn new() -> Self {
        Self {
            backoff: FibonacciBackoff::new(BACKOFF_MIN_SECONDS, BACKOFF_MAX_SECONDS),
            error_count: 0,
        }
    }

    fn increment_error(&mut self) {
        self.error_count += 1;
    }

    fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Reconciles Services and Nodes against the BinaryLane provider.
pub struct Reconciler {
    pub(crate) client: Client,
    pub(crate) node_api: Api<Node>,
    pub(crate) service_api: Api<Service>,
    pub(crate) instances: Instances,
    pub(crate) load_balancers: LoadBalancers,
    pub(crate) routes: Option<Routes>,
    pub(crate) config: ControllerConfig,
    shutdown: CancellationToken,
    route_sync: tokio::sync::Mutex<()>,
    /// Error count tracking per resource (kind/namespace/name -> BackoffState)
    backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl Reconciler {
    pub fn new(
        client: Client,
        cloud: &Cloud,
        config: ControllerConfig,
        shutdown: CancellationToken,
    ) -> Result<Self, ControllerError> {
        let instances = cloud.instances().ok_or_else(|| {
            ControllerError::InvalidConfig("provider does not support instances".to_string())
        })?;
        let load_balancers = cloud.load_balancer().ok_or_else(|| {
            ControllerError::InvalidConfig("provider does not support load balancers".to_string())
        })?;

        Ok(Self {
            node_api: Api::all(client.clone()),
            service_api: Api::all(client.clone()),
            client,
            instances,
            load_balancers,
            routes: cloud.routes(),
            config,
            shutdown,
            route_sync: tokio::sync::Mutex::new(()),
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Run a provider operation bounded by the operation timeout and the shutdown token
    pub(crate) async fn call<T, F>(&self, operation: F) -> Result<T, ControllerError>
    where
        F: Future<Output = Result<T, CloudError>>,
    {
        Ok(with_cancellation(&self.shutdown, Some(self.config.operation_timeout), operation).await?)
    }

    pub(crate) fn cluster_name(&self) -> &str {
        &self.config.cluster_name
    }

    pub(crate) fn resync(&self) -> Duration {
        self.config.resync_interval
    }

    /// Nodes that may serve load balancer traffic
    pub(crate) async fn backend_nodes(&self) -> Result<Vec<Node>, ControllerError> {
        let nodes = self.node_api.list(&ListParams::default()).await?;
        Ok(nodes.items.into_iter().filter(node::is_load_balancer_backend).collect())
    }

    /// Get the Fibonacci backoff duration for a resource based on its error count
    ///
    /// Returns (backoff, error_count)
    pub fn get_backoff_for_resource(&self, resource_key: &str) -> (Duration, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(resource_key.to_string())
                    .or_insert_with(BackoffState::new);
                (state.backoff.next_backoff(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                (Duration::from_secs(BACKOFF_MAX_SECONDS), 0)
            }
        }
    }

    /// Increment error count for a resource
    pub fn increment_error(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states
                .entry(resource_key.to_string())
                .or_insert_with(BackoffState::new)
                .increment_error();
        }
    }

    /// Reset error count for a resource (on successful reconciliation)
    pub fn reset_error(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(state) = states.get_mut(resource_key) {
                state.reset();
            }
        }
    }
}
