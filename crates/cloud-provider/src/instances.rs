//! Instance metadata: what a BinaryLane server tells Kubernetes about its node.

use crate::directory::{NodeIdentity, ServerDirectory, format_provider_id};
use crate::error::CloudError;
use crate::network::NetworkMembership;
use k8s_openapi::api::core::v1::NodeAddress;
use std::collections::BTreeMap;
use tracing::debug;

/// Label carrying the physical host a server runs on
pub const HOST_LABEL: &str = "binarylane.com/host";

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceMetadata {
    pub provider_id: String,
    pub node_addresses: Vec<NodeAddress>,
    /// Size slug of the server
    pub instance_type: String,
    pub zone: String,
    pub region: String,
    pub additional_labels: BTreeMap<String, String>,
}

#[derive(Clone)]
pub struct Instances {
    directory: ServerDirectory,
}

impl Instances {
    pub fn new(directory: ServerDirectory) -> Self {
        Self { directory }
    }

    /// Whether the node still has a server. Absence is `false`, not an error.
    pub async fn instance_exists(&self, node: &NodeIdentity) -> Result<bool, CloudError> {
        match self.directory.resolve(node).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => {
                debug!("No server for node {}: {}", node.name, e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn instance_shutdown(&self, node: &NodeIdentity) -> Result<bool, CloudError> {
        let server = self.directory.resolve(node).await?;
        Ok(server.status.is_shutdown())
    }

    pub async fn instance_metadata(&self, node: &NodeIdentity) -> Result<InstanceMetadata, CloudError> {
        let server = self.directory.resolve(node).await?;
        let membership = NetworkMembership::of(&server);

        let mut additional_labels = BTreeMap::new();
        if let Some(host) = server.host.as_ref().filter(|h| !h.display_name.is_empty()) {
            additional_labels.insert(HOST_LABEL.to_string(), host.display_name.clone());
        }

        Ok(InstanceMetadata {
            provider_id: format_provider_id(server.id),
            node_addresses: membership.node_addresses(&server.name),
            instance_type: server.size.slug.clone(),
            zone: server.region.slug.clone(),
            region: server.region.slug.clone(),
            additional_labels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use binarylane_client::{Host, MockBinaryLaneClient, MockOperation, ServerStatus};

    #[tokio::test]
    async fn test_instance_exists() {
        let mock = MockBinaryLaneClient::new("http://test");
        mock.add_server(test_server(1, "node-1"));
        let instances = Instances::new(directory_for(&mock));

        assert!(instances.instance_exists(&NodeIdentity::new("node-1")).await.unwrap());
        assert!(!instances.instance_exists(&NodeIdentity::new("node-2")).await.unwrap());
        assert!(
            !instances
                .instance_exists(&NodeIdentity::new("node-1").with_provider_id("binarylane://99"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_instance_exists_propagates_transport_errors() {
        let mock = MockBinaryLaneClient::new("http://test");
        mock.fail_on(MockOperation::ListServers, "timeout");
        let instances = Instances::new(directory_for(&mock));

        assert!(instances.instance_exists(&NodeIdentity::new("node-1")).await.is_err());
    }

    #[tokio::test]
    async fn test_instance_shutdown() {
        let mock = MockBinaryLaneClient::new("http://test");
        for (id, status) in [(1, ServerStatus::Active), (2, ServerStatus::Off), (3, ServerStatus::Archive)] {
            let mut server = test_server(id, &format!("node-{}", id));
            server.status = status;
            mock.add_server(server);
        }
        let instances = Instances::new(directory_for(&mock));

        assert!(!instances.instance_shutdown(&NodeIdentity::new("node-1")).await.unwrap());
        assert!(instances.instance_shutdown(&NodeIdentity::new("node-2")).await.unwrap());
        assert!(instances.instance_shutdown(&NodeIdentity::new("node-3")).await.unwrap());
    }

    #[tokio::test]
    async fn test_instance_metadata() {
        let mock = MockBinaryLaneClient::new("http://test");
        let mut server = vpc_member(42, "node-1", 7, "10.240.0.4");
        server.host = Some(Host {
            display_name: "hv-12".to_string(),
        });
        mock.add_server(server);
        mock.add_server(test_server(43, "node-2"));
        let instances = Instances::new(directory_for(&mock));

        let metadata = instances.instance_metadata(&NodeIdentity::new("node-1")).await.unwrap();
        assert_eq!(metadata.provider_id, "binarylane://42");
        assert_eq!(metadata.instance_type, "std-1vcpu");
        assert_eq!(metadata.zone, "syd");
        assert_eq!(metadata.region, "syd");
        assert_eq!(metadata.additional_labels.get(HOST_LABEL).map(String::as_str), Some("hv-12"));
        let types: Vec<&str> = metadata.node_addresses.iter().map(|a| a.type_.as_str()).collect();
        assert_eq!(types, vec!["Hostname", "InternalIP", "ExternalIP"]);

        let metadata = instances.instance_metadata(&NodeIdentity::new("node-2")).await.unwrap();
        assert!(metadata.additional_labels.is_empty());
    }
}
