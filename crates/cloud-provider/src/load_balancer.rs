//! Load Balancer Reconciler.
//!
//! The load balancer backing a service is identified by the id stored in the
//! service's `binarylane-loadbalancer-id` annotation. The annotation is owned by
//! the caller: `ensure_load_balancer` returns the id and the caller persists it.
//!
//! `ensure_load_balancer` overwrites the whole configuration including the
//! backend list, while `update_load_balancer` only diffs backend membership.
//! Without an annotation, a load balancer already carrying the service's name
//! is adopted instead of creating a second one.
//!
//! Membership changes are read, diff, write with no version check. Two writers
//! for the same load balancer, or an overwrite racing a membership diff, can
//! lose one side's backends until the next reconcile.

use crate::directory::{NodeIdentity, ServerDirectory};
use crate::error::CloudError;
use binarylane_client::{ForwardingRule, HealthCheck, LoadBalancer, LoadBalancerRequest};
use k8s_openapi::api::core::v1::{LoadBalancerIngress, LoadBalancerStatus, Node, Service};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

pub const ANNOTATION_LOAD_BALANCER_ID: &str = "service.beta.kubernetes.io/binarylane-loadbalancer-id";
pub const ANNOTATION_PROTOCOL: &str = "service.beta.kubernetes.io/binarylane-loadbalancer-protocol";
pub const ANNOTATION_HEALTH_CHECK_PATH: &str =
    "service.beta.kubernetes.io/binarylane-loadbalancer-healthcheck-path";
pub const ANNOTATION_HEALTH_CHECK_PROTOCOL: &str =
    "service.beta.kubernetes.io/binarylane-loadbalancer-healthcheck-protocol";

pub const DEFAULT_PROTOCOL: &str = "http";
pub const DEFAULT_HEALTH_CHECK_PATH: &str = "/";

/// Result of `ensure_load_balancer`: the id to persist and the status to publish
#[derive(Debug, Clone, PartialEq)]
pub struct EnsuredLoadBalancer {
    pub id: u64,
    pub status: LoadBalancerStatus,
}

fn annotation<'a>(service: &'a Service, key: &str) -> Option<&'a str> {
    service
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(key))
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

fn service_key(service: &Service) -> String {
    format!(
        "{}/{}",
        service.metadata.namespace.as_deref().unwrap_or_default(),
        service.metadata.name.as_deref().unwrap_or_default()
    )
}

/// Load balancer id from the service annotation. A missing or empty annotation is `None`.
pub fn load_balancer_id(service: &Service) -> Result<Option<u64>, CloudError> {
    annotation(service, ANNOTATION_LOAD_BALANCER_ID)
        .map(|raw| {
            raw.trim().parse::<u64>().map_err(|e| CloudError::InvalidAnnotation {
                annotation: ANNOTATION_LOAD_BALANCER_ID.to_string(),
                message: format!("'{}' is not a load balancer id: {}", raw, e),
            })
        })
        .transpose()
}

/// `k8s-<cluster>-<namespace>-<service>`
pub fn load_balancer_name(cluster_name: &str, service: &Service) -> String {
    format!(
        "k8s-{}-{}-{}",
        cluster_name,
        service.metadata.namespace.as_deref().unwrap_or_default(),
        service.metadata.name.as_deref().unwrap_or_default()
    )
}

pub fn build_forwarding_rules(service: &Service) -> Vec<ForwardingRule> {
    let protocol = annotation(service, ANNOTATION_PROTOCOL).unwrap_or(DEFAULT_PROTOCOL);
    vec![ForwardingRule {
        entry_protocol: protocol.to_lowercase(),
    }]
}

pub fn build_health_check(service: &Service) -> HealthCheck {
    HealthCheck {
        protocol: annotation(service, ANNOTATION_HEALTH_CHECK_PROTOCOL)
            .unwrap_or(DEFAULT_PROTOCOL)
            .to_string(),
        path: annotation(service, ANNOTATION_HEALTH_CHECK_PATH)
            .unwrap_or(DEFAULT_HEALTH_CHECK_PATH)
            .to_string(),
    }
}

/// Backend ids to add and to remove, each sorted and free of duplicates
pub fn diff_server_ids(current: &[u64], desired: &[u64]) -> (Vec<u64>, Vec<u64>) {
    let current: BTreeSet<u64> = current.iter().copied().collect();
    let desired: BTreeSet<u64> = desired.iter().copied().collect();
    (
        desired.difference(&current).copied().collect(),
        current.difference(&desired).copied().collect(),
    )
}

/// Ingress for the load balancer's address. Still pending (no address) is an empty status.
pub fn load_balancer_status(load_balancer: &LoadBalancer) -> LoadBalancerStatus {
    let ingress = Some(load_balancer.ip.as_str())
        .filter(|ip| !ip.is_empty())
        .map(|ip| {
            vec![LoadBalancerIngress {
                ip: Some(ip.to_string()),
                ..Default::default()
            }]
        });
    LoadBalancerStatus { ingress }
}

#[derive(Clone)]
pub struct LoadBalancers {
    directory: ServerDirectory,
    region: String,
}

impl LoadBalancers {
    pub fn new(directory: ServerDirectory, region: impl Into<String>) -> Self {
        Self {
            directory,
            region: region.into(),
        }
    }

    /// Status of the service's load balancer, or `None` when it does not exist.
    ///
    /// No annotation means no API call. A load balancer deleted out of band reads as absent.
    pub async fn get_load_balancer(
        &self,
        _cluster_name: &str,
        service: &Service,
    ) -> Result<Option<LoadBalancerStatus>, CloudError> {
        let Some(id) = load_balancer_id(service)? else {
            return Ok(None);
        };

        match self.directory.client().get_load_balancer(id).await {
            Ok(load_balancer) => Ok(Some(load_balancer_status(&load_balancer))),
            Err(e) if e.is_not_found() => {
                debug!("Load balancer {} of service {} no longer exists", id, service_key(service));
                Ok(None)
            }
            Err(e) => Err(CloudError::api(format!("get load balancer {}", id))(e)),
        }
    }

    pub fn get_load_balancer_name(&self, cluster_name: &str, service: &Service) -> String {
        load_balancer_name(cluster_name, service)
    }

    /// Create the load balancer, or overwrite the annotated one with the desired state
    pub async fn ensure_load_balancer(
        &self,
        cluster_name: &str,
        service: &Service,
        nodes: &[Node],
    ) -> Result<EnsuredLoadBalancer, CloudError> {
        let existing = load_balancer_id(service)?;
        let request = LoadBalancerRequest {
            name: load_balancer_name(cluster_name, service),
            region: Some(self.region.clone()),
            forwarding_rules: build_forwarding_rules(service),
            health_check: Some(build_health_check(service)),
            server_ids: self.resolve_server_ids(nodes).await?,
        };
        let client = self.directory.client();

        let load_balancer = match existing {
            Some(id) => match client.update_load_balancer(id, &request).await {
                Ok(load_balancer) => {
                    debug!("Updated load balancer {} ({})", id, request.name);
                    load_balancer
                }
                Err(e) if e.is_not_found() => {
                    warn!(
                        "Load balancer {} of service {} was deleted, creating a replacement",
                        id,
                        service_key(service)
                    );
                    self.adopt_or_create(&request).await?
                }
                Err(e) => return Err(CloudError::api(format!("update load balancer {}", id))(e)),
            },
            None => self.adopt_or_create(&request).await?,
        };

        Ok(EnsuredLoadBalancer {
            id: load_balancer.id,
            status: load_balancer_status(&load_balancer),
        })
    }

    /// Bring backend membership of the annotated load balancer in line with `nodes`
    pub async fn update_load_balancer(
        &self,
        _cluster_name: &str,
        service: &Service,
        nodes: &[Node],
    ) -> Result<(), CloudError> {
        let id = load_balancer_id(service)?
            .ok_or_else(|| CloudError::MissingLoadBalancerId(service_key(service)))?;
        let client = self.directory.client();

        let current = match client.get_load_balancer(id).await {
            Ok(load_balancer) => load_balancer,
            Err(e) if e.is_not_found() => return Err(CloudError::LoadBalancerNotFound(id)),
            Err(e) => return Err(CloudError::api(format!("get load balancer {}", id))(e)),
        };
        let desired = self.resolve_server_ids(nodes).await?;

        let (to_add, to_remove) = diff_server_ids(&current.server_ids, &desired);
        if to_add.is_empty() && to_remove.is_empty() {
            debug!("Load balancer {} backends already up to date", id);
            return Ok(());
        }

        // Not rolled back if the removal below fails; the next diff picks up the rest
        if !to_add.is_empty() {
            info!("Adding servers {:?} to load balancer {}", to_add, id);
            client
                .add_servers_to_load_balancer(id, &to_add)
                .await
                .map_err(CloudError::api(format!("add servers to load balancer {}", id)))?;
        }
        if !to_remove.is_empty() {
            info!("Removing servers {:?} from load balancer {}", to_remove, id);
            client
                .remove_servers_from_load_balancer(id, &to_remove)
                .await
                .map_err(CloudError::api(format!("remove servers from load balancer {}", id)))?;
        }
        Ok(())
    }

    /// Delete the annotated load balancer. Missing annotation or resource is success.
    pub async fn ensure_load_balancer_deleted(
        &self,
        _cluster_name: &str,
        service: &Service,
    ) -> Result<(), CloudError> {
        let Some(id) = load_balancer_id(service)? else {
            return Ok(());
        };

        match self.directory.client().delete_load_balancer(id).await {
            Ok(()) => {
                info!("Deleted load balancer {} of service {}", id, service_key(service));
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!("Load balancer {} already deleted", id);
                Ok(())
            }
            Err(e) => Err(CloudError::api(format!("delete load balancer {}", id))(e)),
        }
    }

    /// Overwrite the load balancer named `request.name` if there is one, else create it.
    /// Duplicate names adopt the lowest id.
    async fn adopt_or_create(&self, request: &LoadBalancerRequest) -> Result<LoadBalancer, CloudError> {
        let client = self.directory.client();
        let adoptable = client
            .list_load_balancers()
            .await
            .map_err(CloudError::api("list load balancers"))?
            .into_iter()
            .filter(|lb| lb.name == request.name)
            .map(|lb| lb.id)
            .min();

        let Some(id) = adoptable else {
            return self.create(request).await;
        };
        info!("Adopting load balancer {} ({})", id, request.name);
        client
            .update_load_balancer(id, request)
            .await
            .map_err(CloudError::api(format!("update load balancer {}", id)))
    }

    async fn create(&self, request: &LoadBalancerRequest) -> Result<LoadBalancer, CloudError> {
        let load_balancer = self
            .directory
            .client()
            .create_load_balancer(request)
            .await
            .map_err(CloudError::api(format!("create load balancer {}", request.name)))?;
        info!("Created load balancer {} ({})", load_balancer.id, request.name);
        Ok(load_balancer)
    }

    /// Server ids of `nodes` in node order, skipping nodes that fail to resolve.
    ///
    /// Errors only when no node resolved and a lookup failed for a reason other
    /// than a missing server, so an API outage never empties the backend list.
    async fn resolve_server_ids(&self, nodes: &[Node]) -> Result<Vec<u64>, CloudError> {
        let mut ids = Vec::with_capacity(nodes.len());
        let mut last_failure = None;
        for node in nodes {
            let identity = NodeIdentity::from(node);
            match self.directory.resolve(&identity).await {
                Ok(server) => {
                    if !ids.contains(&server.id) {
                        ids.push(server.id);
                    }
                }
                Err(e) => {
                    warn!("Skipping node {} as load balancer backend: {}", identity.name, e);
                    if !e.is_not_found() {
                        last_failure = Some(e);
                    }
                }
            }
        }
        match last_failure {
            Some(e) if ids.is_empty() => Err(e),
            _ => Ok(ids),
        }
    }
}
