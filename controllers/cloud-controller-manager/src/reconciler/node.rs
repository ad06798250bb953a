//! Node reconciliation.
//!
//! Projects the node's BinaryLane server onto the Node object (provider id,
//! topology labels, addresses), then brings load balancer backends and pod
//! routes in line with the current node set.

use crate::error::ControllerError;
use crate::reconciler::{FIELD_MANAGER, Reconciler};
use crate::reconciler::service::wants_load_balancer;
use cloud_provider::load_balancer::load_balancer_id;
use cloud_provider::{InstanceMetadata, NodeIdentity};
use k8s_openapi::api::core::v1::{Node, NodeAddress};
use kube::api::{ListParams, Patch, PatchParams};
use kube_runtime::controller::Action;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

pub const LABEL_REGION: &str = "topology.kubernetes.io/region";
pub const LABEL_ZONE: &str = "topology.kubernetes.io/zone";
pub const LABEL_INSTANCE_TYPE: &str = "node.kubernetes.io/instance-type";
pub const LABEL_EXCLUDE_FROM_LOAD_BALANCERS: &str =
    "node.kubernetes.io/exclude-from-external-load-balancers";
/// Set by the kubelet when started with `--cloud-provider=external`
pub const TAINT_UNINITIALIZED: &str = "node.cloudprovider.kubernetes.io/uninitialized";

/// Whether the node may receive load balancer traffic
pub fn is_load_balancer_backend(node: &Node) -> bool {
    if node.metadata.deletion_timestamp.is_some() {
        return false;
    }
    let unschedulable = node
        .spec
        .as_ref()
        .and_then(|s| s.unschedulable)
        .unwrap_or(false);
    let excluded = node
        .metadata
        .labels
        .as_ref()
        .is_some_and(|l| l.contains_key(LABEL_EXCLUDE_FROM_LOAD_BALANCERS));
    !unschedulable && !excluded
}

/// Merge patch applying instance metadata to the node, `None` when nothing changes
///
/// The provider id is only written when the node has none.
pub fn node_metadata_patch(node: &Node, metadata: &InstanceMetadata) -> Option<Value> {
    let mut wanted = vec![
        (LABEL_REGION, metadata.region.as_str()),
        (LABEL_ZONE, metadata.zone.as_str()),
        (LABEL_INSTANCE_TYPE, metadata.instance_type.as_str()),
    ];
    wanted.extend(
        metadata
            .additional_labels
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str())),
    );

    let current = node.metadata.labels.as_ref();
    let mut labels = Map::new();
    for (key, value) in wanted.into_iter().filter(|(_, v)| !v.is_empty()) {
        if current.and_then(|l| l.get(key)).map(String::as_str) != Some(value) {
            labels.insert(key.to_string(), json!(value));
        }
    }

    let spec = node.spec.as_ref();
    let mut spec_patch = Map::new();
    let has_provider_id = spec
        .and_then(|s| s.provider_id.as_deref())
        .is_some_and(|p| !p.is_empty());
    if !has_provider_id {
        spec_patch.insert("providerID".to_string(), json!(metadata.provider_id));
    }

    let taints = spec.and_then(|s| s.taints.as_ref());
    if taints.is_some_and(|t| t.iter().any(|t| t.key == TAINT_UNINITIALIZED)) {
        let remaining: Vec<_> = taints
            .into_iter()
            .flatten()
            .filter(|t| t.key != TAINT_UNINITIALIZED)
            .collect();
        spec_patch.insert("taints".to_string(), json!(remaining));
    }

    let mut patch = Map::new();
    if !labels.is_empty() {
        patch.insert("metadata".to_string(), json!({ "labels": labels }));
    }
    if !spec_patch.is_empty() {
        patch.insert("spec".to_string(), Value::Object(spec_patch));
    }
    (!patch.is_empty()).then(|| Value::Object(patch))
}

/// Status patch replacing `status.addresses`, `None` when they already match
pub fn node_addresses_patch(node: &Node, addresses: &[NodeAddress]) -> Option<Value> {
    let current = node
        .status
        .as_ref()
        .and_then(|s| s.addresses.as_deref())
        .unwrap_or_default();
    if current == addresses {
        return None;
    }
    Some(json!({ "status": { "addresses": addresses } }))
}

impl Reconciler {
    pub async fn reconcile_node(&self, node: &Node) -> Result<Action, ControllerError> {
        let name = node.metadata.name.as_deref().unwrap_or_default();
        if node.metadata.deletion_timestamp.is_some() {
            debug!("Node {} is being deleted", name);
            return Ok(Action::await_change());
        }

        let identity = NodeIdentity::from(node);
        if !self.call(self.instances.instance_exists(&identity)).await? {
            warn!("Node {} has no BinaryLane server", name);
            return Ok(Action::requeue(self.resync()));
        }
        if self.call(self.instances.instance_shutdown(&identity)).await? {
            warn!("Server of node {} is shut down", name);
            return Ok(Action::requeue(self.resync()));
        }

        let metadata = self.call(self.instances.instance_metadata(&identity)).await?;
        if let Some(patch) = node_metadata_patch(node, &metadata) {
            info!("Initializing node {} as {}", name, metadata.provider_id);
            self.node_api
                .patch(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
                .await?;
        }
        if let Some(patch) = node_addresses_patch(node, &metadata.node_addresses) {
            debug!("Updating addresses of node {}", name);
            self.node_api
                .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
                .await?;
        }

        let mut failures = Vec::new();
        if let Err(e) = self.sync_load_balancers().await {
            failures.push(e.to_string());
        }
        if let Err(e) = self.sync_routes().await {
            failures.push(e.to_string());
        }
        if !failures.is_empty() {
            return Err(ControllerError::Reconciliation(failures.join("; ")));
        }

        Ok(Action::requeue(self.resync()))
    }

    /// Align the backends of every annotated load balancer with the backend nodes
    pub(crate) async fn sync_load_balancers(&self) -> Result<(), ControllerError> {
        let services = self.service_api.list(&ListParams::default()).await?;
        let nodes = self.backend_nodes().await?;

        let mut failures = Vec::new();
        for service in services
            .items
            .iter()
            .filter(|s| wants_load_balancer(s) && s.metadata.deletion_timestamp.is_none())
        {
            let key = format!(
                "{}/{}",
                service.metadata.namespace.as_deref().unwrap_or_default(),
                service.metadata.name.as_deref().unwrap_or_default()
            );
            match load_balancer_id(service) {
                // not created yet, the Service reconciler owns that
                Ok(None) => continue,
                Ok(Some(_)) => {}
                Err(e) => {
                    failures.push(format!("{}: {}", key, e));
                    continue;
                }
            }

            if let Err(e) = self
                .call(
                    self.load_balancers
                        .update_load_balancer(self.cluster_name(), service, &nodes),
                )
                .await
            {
                warn!("Failed to update load balancer backends of {}: {}", key, e);
                failures.push(format!("{}: {}", key, e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ControllerError::Reconciliation(format!(
                "load balancer backends: {}",
                failures.join("; ")
            )))
        }
    }
}
