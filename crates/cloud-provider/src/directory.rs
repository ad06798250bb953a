//! Server Directory: maps a Kubernetes node onto its BinaryLane server.
//!
//! Resolution order is always the same:
//! 1. a `binarylane://<id>` provider handle is fetched by id;
//! 2. an absent or unparseable handle falls back to an exact name match.
//!
//! Once a handle parses, a not-found from the id fetch is final. A server that
//! was deleted must not resolve to some other server sharing the node's name.

use crate::error::CloudError;
use binarylane_client::{BinaryLaneClientTrait, Server};
use k8s_openapi::api::core::v1::Node;
use std::sync::Arc;
use tracing::debug;

/// Scheme of provider handles owned by this provider
pub const PROVIDER_ID_PREFIX: &str = "binarylane://";

/// What the cluster knows about a node: an optional provider handle and its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub provider_id: Option<String>,
    pub name: String,
}

impl NodeIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            provider_id: None,
            name: name.into(),
        }
    }

    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }
}

impl From<&Node> for NodeIdentity {
    fn from(node: &Node) -> Self {
        Self {
            provider_id: node
                .spec
                .as_ref()
                .and_then(|s| s.provider_id.clone())
                .filter(|p| !p.is_empty()),
            name: node.metadata.name.clone().unwrap_or_default(),
        }
    }
}

/// Parse `binarylane://<id>`. Anything else (other schemes, non-numeric ids) is `None`.
pub fn parse_provider_id(provider_id: &str) -> Option<u64> {
    provider_id
        .strip_prefix(PROVIDER_ID_PREFIX)
        .filter(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|id| id.parse().ok())
}

pub fn format_provider_id(server_id: u64) -> String {
    format!("{}{}", PROVIDER_ID_PREFIX, server_id)
}

/// Shared node-to-server resolver injected into every component
#[derive(Clone)]
pub struct ServerDirectory {
    client: Arc<dyn BinaryLaneClientTrait>,
}

impl ServerDirectory {
    pub fn new(client: Arc<dyn BinaryLaneClientTrait>) -> Self {
        Self { client }
    }

    pub(crate) fn client(&self) -> &dyn BinaryLaneClientTrait {
        self.client.as_ref()
    }

    /// Resolve a node to its server, provider handle first, name second
    pub async fn resolve(&self, node: &NodeIdentity) -> Result<Server, CloudError> {
        if let Some(handle) = node.provider_id.as_deref() {
            match parse_provider_id(handle) {
                Some(id) => return self.get_by_id(id).await,
                None => debug!(
                    "Provider ID '{}' of node {} is not a BinaryLane handle, falling back to name lookup",
                    handle, node.name
                ),
            }
        }
        self.find_by_name(&node.name).await
    }

    /// Fetch a server by id; an upstream 404 becomes `ServerNotFound`
    pub async fn get_by_id(&self, id: u64) -> Result<Server, CloudError> {
        match self.client.get_server(id).await {
            Ok(server) => Ok(server),
            Err(e) if e.is_not_found() => Err(CloudError::ServerNotFound(format_provider_id(id))),
            Err(e) => Err(CloudError::api(format!("get server {}", id))(e)),
        }
    }

    /// Find a server whose name equals `name` exactly.
    ///
    /// Duplicate names resolve to the lowest server id so the answer does not
    /// depend on the API's listing order.
    pub async fn find_by_name(&self, name: &str) -> Result<Server, CloudError> {
        let servers = self
            .client
            .list_servers(Some(name))
            .await
            .map_err(CloudError::api(format!("list servers named {}", name)))?;

        servers
            .into_iter()
            .filter(|s| s.name == name)
            .min_by_key(|s| s.id)
            .ok_or_else(|| CloudError::ServerNotFound(name.to_string()))
    }

    /// Every server visible to the account, in API order
    pub async fn list_all(&self) -> Result<Vec<Server>, CloudError> {
        self.client
            .list_servers(None)
            .await
            .map_err(CloudError::api("list servers"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use binarylane_client::{MockBinaryLaneClient, MockCall, MockOperation};

    #[test]
    fn test_parse_provider_id() {
        assert_eq!(parse_provider_id("binarylane://123"), Some(123));
        assert_eq!(parse_provider_id("badscheme://123"), None);
        assert_eq!(parse_provider_id("binarylane://"), None);
        assert_eq!(parse_provider_id("binarylane://abc"), None);
        assert_eq!(parse_provider_id("binarylane://+5"), None);
        assert_eq!(parse_provider_id("123"), None);
        assert_eq!(format_provider_id(42), "binarylane://42");
    }

    #[test]
    fn test_identity_from_node() {
        let node = test_node("worker-1", Some("binarylane://9"));
        let identity = NodeIdentity::from(&node);
        assert_eq!(identity.name, "worker-1");
        assert_eq!(identity.provider_id.as_deref(), Some("binarylane://9"));

        let node = test_node("worker-2", Some(""));
        assert_eq!(NodeIdentity::from(&node).provider_id, None);
    }

    #[tokio::test]
    async fn test_valid_handle_never_lists_by_name() {
        let mock = MockBinaryLaneClient::new("http://test");
        mock.add_server(test_server(123, "node-1"));
        let directory = directory_for(&mock);

        let node = NodeIdentity::new("node-1").with_provider_id("binarylane://123");
        let server = directory.resolve(&node).await.unwrap();

        assert_eq!(server.id, 123);
        assert_eq!(mock.calls(), vec![MockCall::GetServer(123)]);
    }

    #[tokio::test]
    async fn test_foreign_or_missing_handle_falls_back_to_name() {
        let mock = MockBinaryLaneClient::new("http://test");
        mock.add_server(test_server(5, "node-1"));
        let directory = directory_for(&mock);

        let node = NodeIdentity::new("node-1").with_provider_id("badscheme://123");
        assert_eq!(directory.resolve(&node).await.unwrap().id, 5);

        let node = NodeIdentity::new("node-1");
        assert_eq!(directory.resolve(&node).await.unwrap().id, 5);

        assert!(mock.calls_of(MockOperation::GetServer).is_empty());
        assert_eq!(mock.calls_of(MockOperation::ListServers).len(), 2);
    }

    #[tokio::test]
    async fn test_deleted_handle_does_not_fall_back() {
        let mock = MockBinaryLaneClient::new("http://test");
        mock.add_server(test_server(5, "node-1"));
        let directory = directory_for(&mock);

        let node = NodeIdentity::new("node-1").with_provider_id("binarylane://99");
        let err = directory.resolve(&node).await.unwrap_err();

        assert!(matches!(err, CloudError::ServerNotFound(_)));
        assert!(mock.calls_of(MockOperation::ListServers).is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_names_pick_lowest_id() {
        let mock = MockBinaryLaneClient::new("http://test");
        mock.add_server(test_server(9, "node-1"));
        mock.add_server(test_server(3, "node-1"));
        mock.add_server(test_server(1, "node-10"));
        let directory = directory_for(&mock);

        let server = directory.find_by_name("node-1").await.unwrap();
        assert_eq!(server.id, 3);
    }

    #[tokio::test]
    async fn test_transport_error_is_wrapped() {
        let mock = MockBinaryLaneClient::new("http://test");
        mock.fail_on(MockOperation::ListServers, "503 Service Unavailable");
        let directory = directory_for(&mock);

        let err = directory.find_by_name("node-1").await.unwrap_err();
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("list servers named node-1"));
    }
}
