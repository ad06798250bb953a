//! Service reconciliation: one BinaryLane load balancer per `type: LoadBalancer` Service.
//!
//! The load balancer id lives in the Service's id annotation. A finalizer keeps
//! the Service around until its load balancer is gone.

use crate::error::ControllerError;
use crate::reconciler::{FIELD_MANAGER, Reconciler};
use cloud_provider::load_balancer::ANNOTATION_LOAD_BALANCER_ID;
use k8s_openapi::api::core::v1::{LoadBalancerStatus, Service};
use kube::Api;
use kube::api::{Patch, PatchParams};
use kube_runtime::controller::Action;
use serde_json::{Value, json};
use tracing::{debug, info};

pub const LOAD_BALANCER_FINALIZER: &str = "binarylane.com/load-balancer-cleanup";

pub fn wants_load_balancer(service: &Service) -> bool {
    service
        .spec
        .as_ref()
        .and_then(|s| s.type_.as_deref())
        .is_some_and(|t| t == "LoadBalancer")
}

pub fn has_finalizer(service: &Service) -> bool {
    service
        .metadata
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|s| s == LOAD_BALANCER_FINALIZER))
}

/// Merge patch adding the cleanup finalizer, `None` when already present
pub fn add_finalizer_patch(service: &Service) -> Option<Value> {
    if has_finalizer(service) {
        return None;
    }
    let mut finalizers = service.metadata.finalizers.clone().unwrap_or_default();
    finalizers.push(LOAD_BALANCER_FINALIZER.to_string());
    Some(json!({ "metadata": { "finalizers": finalizers } }))
}

/// Merge patch removing the cleanup finalizer and the id annotation
pub fn release_patch(service: &Service) -> Value {
    let finalizers: Vec<String> = service
        .metadata
        .finalizers
        .as_ref()
        .map(|f| f.iter().filter(|s| *s != LOAD_BALANCER_FINALIZER).cloned().collect())
        .unwrap_or_default();
    json!({
        "metadata": {
            "finalizers": finalizers,
            "annotations": { ANNOTATION_LOAD_BALANCER_ID: Value::Null },
        }
    })
}

/// Merge patch recording `id` in the annotation, `None` when it already matches
pub fn id_annotation_patch(service: &Service, id: u64) -> Option<Value> {
    let current = service
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(ANNOTATION_LOAD_BALANCER_ID));
    let wanted = id.to_string();
    if current.map(|v| v.trim()) == Some(wanted.as_str()) {
        return None;
    }
    Some(json!({ "metadata": { "annotations": { ANNOTATION_LOAD_BALANCER_ID: wanted } } }))
}

/// Status subresource patch, `None` when `status.loadBalancer` already matches
pub fn status_patch(service: &Service, status: &LoadBalancerStatus) -> Option<Value> {
    let current = service.status.as_ref().and_then(|s| s.load_balancer.as_ref());
    if current == Some(status) {
        return None;
    }
    Some(json!({ "status": { "loadBalancer": status } }))
}

impl Reconciler {
    pub async fn reconcile_service(&self, service: &Service) -> Result<Action, ControllerError> {
        let name = service.metadata.name.as_deref().unwrap_or_default();
        let namespace = service.metadata.namespace.as_deref().unwrap_or("default");
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);

        let deleting = service.metadata.deletion_timestamp.is_some();
        if deleting || !wants_load_balancer(service) {
            if !has_finalizer(service) {
                return Ok(Action::await_change());
            }

            info!("Releasing load balancer of Service {}/{}", namespace, name);
            self.call(
                self.load_balancers
                    .ensure_load_balancer_deleted(self.cluster_name(), service),
            )
            .await?;

            api.patch(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&release_patch(service)))
                .await?;
            return Ok(Action::await_change());
        }

        if let Some(patch) = add_finalizer_patch(service) {
            debug!("Adding finalizer to Service {}/{}", namespace, name);
            api.patch(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
                .await?;
        }

        let nodes = self.backend_nodes().await?;
        let ensured = self
            .call(
                self.load_balancers
                    .ensure_load_balancer(self.cluster_name(), service, &nodes),
            )
            .await?;

        if let Some(patch) = id_annotation_patch(service, ensured.id) {
            info!(
                "Service {}/{} is served by load balancer {}",
                namespace, name, ensured.id
            );
            api.patch(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
                .await?;
        }

        if let Some(patch) = status_patch(service, &ensured.status) {
            api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
                .await?;
        }

        Ok(Action::requeue(self.resync()))
    }
}
