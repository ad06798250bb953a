//! Network membership of a server: classified addresses and VPC.

use binarylane_client::{Network, NetworkType, Server};
use k8s_openapi::api::core::v1::NodeAddress;

pub const NODE_HOSTNAME: &str = "Hostname";
pub const NODE_INTERNAL_IP: &str = "InternalIP";
pub const NODE_EXTERNAL_IP: &str = "ExternalIP";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressScope {
    /// Private address, reachable inside the VPC
    Internal,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpFamily {
    V4,
    V6,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedAddress {
    pub address: String,
    pub scope: AddressScope,
    pub family: IpFamily,
}

/// Addresses (v4 first, then v6, each in API order) and VPC of one server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkMembership {
    pub vpc_id: Option<u64>,
    pub addresses: Vec<ClassifiedAddress>,
}

impl NetworkMembership {
    pub fn of(server: &Server) -> Self {
        fn classify(networks: &[Network], family: IpFamily) -> impl Iterator<Item = ClassifiedAddress> + '_ {
            networks.iter().map(move |n| ClassifiedAddress {
                address: n.ip_address.clone(),
                scope: match n.network_type {
                    NetworkType::Private => AddressScope::Internal,
                    NetworkType::Public => AddressScope::External,
                },
                family,
            })
        }

        let addresses = classify(&server.networks.v4, IpFamily::V4)
            .chain(classify(&server.networks.v6, IpFamily::V6))
            .collect();

        Self {
            vpc_id: server.vpc_id,
            addresses,
        }
    }

    pub fn with_scope(&self, scope: AddressScope) -> impl Iterator<Item = &ClassifiedAddress> {
        self.addresses.iter().filter(move |a| a.scope == scope)
    }

    /// First private IPv4 address: the next hop used for routes
    pub fn private_ipv4(&self) -> Option<&str> {
        self.with_scope(AddressScope::Internal)
            .find(|a| a.family == IpFamily::V4)
            .map(|a| a.address.as_str())
    }

    /// VPC id together with the route next hop, if the server can act as one
    pub fn route_target(&self) -> Option<(u64, &str)> {
        Some((self.vpc_id?, self.private_ipv4()?))
    }

    /// Node addresses as reported to Kubernetes: hostname, internal, then external
    pub fn node_addresses(&self, hostname: &str) -> Vec<NodeAddress> {
        let mut result = vec![NodeAddress {
            type_: NODE_HOSTNAME.to_string(),
            address: hostname.to_string(),
        }];
        result.extend(self.with_scope(AddressScope::Internal).map(|a| NodeAddress {
            type_: NODE_INTERNAL_IP.to_string(),
            address: a.address.clone(),
        }));
        result.extend(self.with_scope(AddressScope::External).map(|a| NodeAddress {
            type_: NODE_EXTERNAL_IP.to_string(),
            address: a.address.clone(),
        }));
        result
    }
}
