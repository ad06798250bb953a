//! Route Reconciler: pod CIDR routes inside BinaryLane VPCs.
//!
//! A route sends a node's pod CIDR to that node's private IPv4 address. VPC
//! route tables can only be replaced as a whole, so create and delete both
//! read the current list, edit it, and write it back. Two writers editing the
//! same VPC concurrently can lose one of the edits; callers are expected to
//! serialise route changes per cluster.

use crate::directory::ServerDirectory;
use crate::error::CloudError;
use crate::network::NetworkMembership;
use binarylane_client::{RouteEntry, UpdateVpcRequest, Vpc};
use ipnetwork::IpNetwork;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// A pod CIDR route as seen by the cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: String,
    pub target_node: String,
    pub destination_cidr: String,
}

impl Route {
    pub fn new(target_node: impl Into<String>, destination_cidr: impl Into<String>) -> Self {
        let target_node = target_node.into();
        let destination_cidr = destination_cidr.into();
        Self {
            name: format!("{}-{}", target_node, destination_cidr),
            target_node,
            destination_cidr,
        }
    }
}

/// A server belongs to the cluster when its name starts with the cluster name.
/// An empty cluster name matches every server.
pub fn is_cluster_server(server_name: &str, cluster_name: &str) -> bool {
    server_name.starts_with(cluster_name)
}

pub fn route_description(node_name: &str) -> String {
    format!("Kubernetes route for node {}", node_name)
}

#[derive(Clone)]
pub struct Routes {
    directory: ServerDirectory,
    cluster_cidr: IpNetwork,
}

impl Routes {
    pub fn new(directory: ServerDirectory, cluster_cidr: IpNetwork) -> Self {
        Self {
            directory,
            cluster_cidr,
        }
    }

    /// Pod network of the cluster
    pub fn cluster_cidr(&self) -> IpNetwork {
        self.cluster_cidr
    }

    /// List the routes of every VPC a cluster server belongs to.
    ///
    /// Routers that are not a cluster server's private address keep the raw
    /// address as their node name, so manually added entries stay visible.
    pub async fn list_routes(&self, cluster_name: &str) -> Result<Vec<Route>, CloudError> {
        let servers = self.directory.list_all().await?;

        let mut node_by_router: HashMap<String, String> = HashMap::new();
        let mut vpc_ids = BTreeSet::new();
        for server in servers.iter().filter(|s| is_cluster_server(&s.name, cluster_name)) {
            let membership = NetworkMembership::of(server);
            let Some(vpc_id) = membership.vpc_id else {
                continue;
            };
            vpc_ids.insert(vpc_id);
            if let Some(ip) = membership.private_ipv4() {
                node_by_router
                    .entry(ip.to_string())
                    .or_insert_with(|| server.name.clone());
            }
        }

        if vpc_ids.is_empty() {
            debug!("No cluster servers in a VPC, no routes to list");
            return Ok(Vec::new());
        }

        let mut routes = Vec::new();
        for vpc_id in vpc_ids {
            let vpc = match self.directory.client().get_vpc(vpc_id).await {
                Ok(vpc) => vpc,
                Err(e) if e.is_not_found() => {
                    warn!("VPC {} of a cluster server no longer exists, skipping", vpc_id);
                    continue;
                }
                Err(e) => return Err(CloudError::api(format!("get VPC {}", vpc_id))(e)),
            };

            routes.extend(vpc.route_entries.iter().map(|entry| {
                let node = node_by_router
                    .get(&entry.router)
                    .cloned()
                    .unwrap_or_else(|| entry.router.clone());
                Route::new(node, entry.destination.clone())
            }));
        }

        Ok(routes)
    }

    /// Add a route through the target node's private address. Existing routes are left alone.
    pub async fn create_route(&self, cluster_name: &str, route: &Route) -> Result<(), CloudError> {
        let server = self.directory.find_by_name(&route.target_node).await?;
        let membership = NetworkMembership::of(&server);

        let vpc_id = membership
            .vpc_id
            .ok_or_else(|| CloudError::NotInVpc(route.target_node.clone()))?;
        let router = membership
            .private_ipv4()
            .ok_or_else(|| CloudError::NoPrivateAddress(route.target_node.clone()))?;

        let vpc = self.fetch_vpc(vpc_id).await?;
        if vpc
            .route_entries
            .iter()
            .any(|e| e.matches(router, &route.destination_cidr))
        {
            debug!(
                "Route {} via {} already present in VPC {} (cluster {})",
                route.destination_cidr, router, vpc_id, cluster_name
            );
            return Ok(());
        }

        let mut route_entries = vpc.route_entries.clone();
        route_entries.push(RouteEntry {
            router: router.to_string(),
            destination: route.destination_cidr.clone(),
            description: Some(route_description(&route.target_node)),
        });

        info!(
            "Adding route {} via {} ({}) to VPC {}",
            route.destination_cidr, router, route.target_node, vpc_id
        );
        self.replace_routes(&vpc, route_entries).await
    }

    /// Remove a route. Routes to missing nodes or VPCs count as already removed.
    pub async fn delete_route(&self, cluster_name: &str, route: &Route) -> Result<(), CloudError> {
        let server = match self.directory.find_by_name(&route.target_node).await {
            Ok(server) => server,
            Err(e) if e.is_not_found() => {
                debug!("Node {} of route {} is gone, nothing to delete", route.target_node, route.name);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let membership = NetworkMembership::of(&server);
        let Some((vpc_id, router)) = membership.route_target() else {
            debug!("Node {} has no VPC address, nothing to delete", route.target_node);
            return Ok(());
        };

        let vpc = match self.fetch_vpc(vpc_id).await {
            Ok(vpc) => vpc,
            Err(e) if e.is_not_found() => {
                warn!("VPC {} not found while deleting route {}", vpc_id, route.name);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let before = vpc.route_entries.len();
        let route_entries: Vec<RouteEntry> = vpc
            .route_entries
            .iter()
            .filter(|e| !e.matches(router, &route.destination_cidr))
            .cloned()
            .collect();
        if route_entries.len() == before {
            debug!(
                "Route {} via {} not present in VPC {} (cluster {})",
                route.destination_cidr, router, vpc_id, cluster_name
            );
            return Ok(());
        }

        info!(
            "Removing route {} via {} ({}) from VPC {}",
            route.destination_cidr, router, route.target_node, vpc_id
        );
        self.replace_routes(&vpc, route_entries).await
    }

    async fn fetch_vpc(&self, vpc_id: u64) -> Result<Vpc, CloudError> {
        match self.directory.client().get_vpc(vpc_id).await {
            Ok(vpc) => Ok(vpc),
            Err(e) if e.is_not_found() => Err(CloudError::VpcNotFound(vpc_id)),
            Err(e) => Err(CloudError::api(format!("get VPC {}", vpc_id))(e)),
        }
    }

    async fn replace_routes(&self, vpc: &Vpc, route_entries: Vec<RouteEntry>) -> Result<(), CloudError> {
        let request = UpdateVpcRequest {
            name: vpc.name.clone(),
            route_entries,
        };
        self.directory
            .client()
            .update_vpc(vpc.id, &request)
            .await
            .map_err(CloudError::api(format!("update routes of VPC {}", vpc.id)))?;
        Ok(())
    }
}
