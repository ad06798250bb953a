//! Pod CIDR routes.
//!
//! Every node's pod CIDR gets a VPC route towards that node. Cluster routes
//! inside the cluster CIDR that no longer belong to a node are removed; routes
//! outside it, or through routers that are not cluster nodes, are left alone.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use cloud_provider::{CloudError, Route};
use ipnetwork::IpNetwork;
use k8s_openapi::api::core::v1::Node;
use kube::api::ListParams;
use std::collections::HashSet;
use std::net::IpAddr;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RoutePlan {
    pub to_create: Vec<Route>,
    pub to_delete: Vec<Route>,
}

impl RoutePlan {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }
}

/// Pod CIDRs of a node, `spec.podCIDRs` first, `spec.podCIDR` as fallback
pub fn pod_cidrs(node: &Node) -> Vec<String> {
    let Some(spec) = node.spec.as_ref() else {
        return Vec::new();
    };
    match spec.pod_cidrs.as_ref().filter(|c| !c.is_empty()) {
        Some(cidrs) => cidrs.clone(),
        None => spec.pod_cidr.iter().filter(|c| !c.is_empty()).cloned().collect(),
    }
}

/// `inner` lies entirely inside `outer`
pub fn within(outer: IpNetwork, inner: IpNetwork) -> bool {
    outer.contains(inner.network()) && inner.prefix() >= outer.prefix()
}

fn route_key(node: &str, network: IpNetwork) -> (String, IpAddr, u8) {
    (node.to_string(), network.network(), network.prefix())
}

/// Work out which routes to add and remove so that each node's pod CIDRs
/// inside `cluster_cidr` are routed to it
pub fn plan_route_changes(existing: &[Route], nodes: &[Node], cluster_cidr: IpNetwork) -> RoutePlan {
    let mut plan = RoutePlan::default();

    let mut desired = HashSet::new();
    for node in nodes.iter().filter(|n| n.metadata.deletion_timestamp.is_none()) {
        let Some(name) = node.metadata.name.as_deref() else {
            continue;
        };
        for cidr in pod_cidrs(node) {
            match cidr.parse::<IpNetwork>() {
                Ok(network) if within(cluster_cidr, network) => {
                    if desired.insert(route_key(name, network)) {
                        plan.to_create.push(Route::new(name, cidr));
                    }
                }
                Ok(_) => debug!("Pod CIDR {} of node {} is outside {}", cidr, name, cluster_cidr),
                Err(e) => warn!("Node {} has an invalid pod CIDR {}: {}", name, cidr, e),
            }
        }
    }

    let mut present = HashSet::new();
    for route in existing {
        // router not resolved to a cluster node: not ours to manage
        if route.target_node.parse::<IpAddr>().is_ok() {
            continue;
        }
        let Ok(network) = route.destination_cidr.parse::<IpNetwork>() else {
            continue;
        };
        if !within(cluster_cidr, network) {
            continue;
        }
        let key = route_key(&route.target_node, network);
        if desired.contains(&key) {
            present.insert(key);
        } else {
            plan.to_delete.push(route.clone());
        }
    }

    plan.to_create.retain(|route| {
        route
            .destination_cidr
            .parse::<IpNetwork>()
            .map(|network| !present.contains(&route_key(&route.target_node, network)))
            .unwrap_or(false)
    });
    plan
}

/// Route creation failures that retrying cannot fix, such as a node whose
/// server is gone or has no address in the VPC
pub fn is_unroutable(error: &ControllerError) -> bool {
    match error {
        ControllerError::Cloud(CloudError::NotInVpc(_) | CloudError::NoPrivateAddress(_)) => true,
        ControllerError::Cloud(e) => e.is_not_found(),
        _ => false,
    }
}

impl Reconciler {
    /// Bring VPC routes in line with the nodes' pod CIDRs. A no-op without a cluster CIDR.
    pub(crate) async fn sync_routes(&self) -> Result<(), ControllerError> {
        let Some(routes) = self.routes.as_ref() else {
            return Ok(());
        };
        // route tables are replaced wholesale, one sync at a time
        let _guard = self.route_sync.lock().await;

        let nodes = self.node_api.list(&ListParams::default()).await?.items;
        let existing = self.call(routes.list_routes(self.cluster_name())).await?;
        let plan = plan_route_changes(&existing, &nodes, routes.cluster_cidr());
        if plan.is_empty() {
            return Ok(());
        }

        let mut failures = Vec::new();
        for route in &plan.to_create {
            info!("Creating route {} via {}", route.destination_cidr, route.target_node);
            match self.call(routes.create_route(self.cluster_name(), route)).await {
                Ok(()) => {}
                Err(e) if is_unroutable(&e) => warn!("Skipping route {}: {}", route.name, e),
                Err(e) => failures.push(format!("create {}: {}", route.name, e)),
            }
        }
        for route in &plan.to_delete {
            info!("Deleting route {} via {}", route.destination_cidr, route.target_node);
            if let Err(e) = self.call(routes.delete_route(self.cluster_name(), route)).await {
                failures.push(format!("delete {}: {}", route.name, e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ControllerError::Reconciliation(format!("routes: {}", failures.join("; "))))
        }
    }
}
