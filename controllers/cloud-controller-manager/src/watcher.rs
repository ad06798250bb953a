//! Kubernetes resource watchers.
//!
//! Both watchers go through the generic `watch_resource()` helper, which runs
//! a kube_runtime::Controller with reconnection, per-object backoff and
//! graceful shutdown on the shared cancellation token.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use futures::StreamExt;
use futures::future::BoxFuture;
use k8s_openapi::api::core::v1::{Node, Service};
use kube::{Api, Resource, ResourceExt};
use kube_runtime::controller::{Action, Config as ControllerConfig};
use kube_runtime::{Controller, watcher};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

type ReconcileFn<K> =
    fn(Arc<Reconciler>, Arc<K>) -> BoxFuture<'static, Result<Action, ControllerError>>;

/// Backoff bookkeeping key: `Kind/namespace/name`
fn resource_key<K>(obj: &K) -> String
where
    K: Resource,
    K::DynamicType: Default,
{
    let dt = K::DynamicType::default();
    let kind = K::kind(&dt);
    match obj.meta().namespace.as_deref() {
        Some(ns) => format!("{}/{}/{}", kind, ns, obj.name_any()),
        None => format!("{}/{}", kind, obj.name_any()),
    }
}

/// Run a controller for `K` until `shutdown` is cancelled
async fn watch_resource<K>(
    api: Api<K>,
    reconciler: Arc<Reconciler>,
    reconcile_fn: ReconcileFn<K>,
    resource_name: &'static str,
    shutdown: CancellationToken,
) -> Result<(), ControllerError>
where
    K: Resource + Clone + Send + Sync + Debug + serde::de::DeserializeOwned + 'static,
    K::DynamicType: Default + Eq + Hash + Clone + Debug + Unpin,
{
    info!("Starting {} watcher", resource_name);

    // Requeue failing objects with their own Fibonacci backoff
    let error_policy = |obj: Arc<K>, error: &ControllerError, ctx: Arc<Reconciler>| {
        let key = resource_key(obj.as_ref());
        ctx.increment_error(&key);
        let (backoff, error_count) = ctx.get_backoff_for_resource(&key);
        error!(
            "Reconciliation error for {} (attempt {}), retrying in {:?}: {}",
            key, error_count, backoff, error
        );
        Action::requeue(backoff)
    };

    let reconcile = move |obj: Arc<K>, ctx: Arc<Reconciler>| async move {
        let key = resource_key(obj.as_ref());
        debug!("Reconciling {}", key);
        let action = reconcile_fn(ctx.clone(), obj).await?;
        ctx.reset_error(&key);
        Ok::<Action, ControllerError>(action)
    };

    // Debounce batches bursts of updates to the same object
    let controller_config = ControllerConfig::default()
        .debounce(Duration::from_secs(5))
        .concurrency(3);

    Controller::new(api, watcher::Config::default())
        .with_config(controller_config)
        .graceful_shutdown_on(shutdown.cancelled_owned())
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => debug!("Reconciled {} {}", resource_name, obj.name),
                Err(e) => error!("Controller error for {}: {}", resource_name, e),
            }
        })
        .await;

    info!("{} watcher stopped", resource_name);
    Ok(())
}

/// Watches Services and Nodes cluster-wide.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    shutdown: CancellationToken,
}

impl Watcher {
    pub fn new(reconciler: Arc<Reconciler>, shutdown: CancellationToken) -> Self {
        Self {
            reconciler,
            shutdown,
        }
    }

    pub async fn watch_services(&self) -> Result<(), ControllerError> {
        let api: Api<Service> = self.reconciler.service_api.clone();
        watch_resource(
            api,
            self.reconciler.clone(),
            |ctx, service| Box::pin(async move { ctx.reconcile_service(&service).await }),
            "Service",
            self.shutdown.clone(),
        )
        .await
    }

    pub async fn watch_nodes(&self) -> Result<(), ControllerError> {
        let api: Api<Node> = self.reconciler.node_api.clone();
        watch_resource(
            api,
            self.reconciler.clone(),
            |ctx, node| Box::pin(async move { ctx.reconcile_node(&node).await }),
            "Node",
            self.shutdown.clone(),
        )
        .await
    }
}
