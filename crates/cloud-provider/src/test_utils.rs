//! Test utilities for the cloud provider
//!
//! Builders for servers, VPCs, nodes and services used across the unit tests.

#[cfg(test)]
use crate::directory::ServerDirectory;
#[cfg(test)]
use binarylane_client::{MockBinaryLaneClient, Network, NetworkType, Region, RouteEntry, Server, Size, Vpc};
#[cfg(test)]
use k8s_openapi::api::core::v1::{Node, NodeSpec, Service, ServiceSpec};
#[cfg(test)]
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
#[cfg(test)]
use std::collections::BTreeMap;
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
pub fn directory_for(mock: &MockBinaryLaneClient) -> ServerDirectory {
    ServerDirectory::new(Arc::new(mock.clone()))
}

/// Helper to create a bare server in region `syd`
#[cfg(test)]
pub fn test_server(id: u64, name: &str) -> Server {
    Server {
        id,
        name: name.to_string(),
        region: Region {
            slug: "syd".to_string(),
            name: "Sydney".to_string(),
        },
        size: Size {
            slug: "std-1vcpu".to_string(),
        },
        ..Default::default()
    }
}

#[cfg(test)]
pub fn test_network(ip: &str, network_type: NetworkType) -> Network {
    Network {
        ip_address: ip.to_string(),
        network_type,
        netmask: None,
        gateway: None,
    }
}

/// Helper to create a server joined to `vpc_id` with one private and one public v4 address
#[cfg(test)]
pub fn vpc_member(id: u64, name: &str, vpc_id: u64, private_ip: &str) -> Server {
    let mut server = test_server(id, name);
    server.vpc_id = Some(vpc_id);
    server.networks.v4 = vec![
        test_network(&format!("203.0.113.{}", id % 250 + 1), NetworkType::Public),
        test_network(private_ip, NetworkType::Private),
    ];
    server
}

#[cfg(test)]
pub fn test_vpc(id: u64, entries: &[(&str, &str)]) -> Vpc {
    Vpc {
        id,
        name: format!("vpc-{}", id),
        ip_range: Some("10.240.0.0/16".to_string()),
        route_entries: entries
            .iter()
            .map(|(router, destination)| RouteEntry {
                router: router.to_string(),
                destination: destination.to_string(),
                description: None,
            })
            .collect(),
    }
}

#[cfg(test)]
pub fn test_node(name: &str, provider_id: Option<&str>) -> Node {
    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: Some(NodeSpec {
            provider_id: provider_id.map(|p| p.to_string()),
            ..Default::default()
        }),
        status: None,
    }
}

/// Helper to create a `LoadBalancer` service with the given annotations
#[cfg(test)]
pub fn test_service(namespace: &str, name: &str, annotations: &[(&str, &str)]) -> Service {
    let annotations: BTreeMap<String, String> = annotations
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            annotations: (!annotations.is_empty()).then_some(annotations),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some("LoadBalancer".to_string()),
            ..Default::default()
        }),
        status: None,
    }
}
