//! BinaryLane API models
//!
//! These models match the BinaryLane v2 REST API response and request bodies.
//! Only the fields the cloud controller reads are modelled; unknown fields are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pagination links returned alongside list responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub pages: Pages,
}

/// Page navigation URLs. `next` is absent on the last page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pages {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
}

/// List metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    pub total: u64,
}

/// A list response body that can be drained page by page.
pub trait Paginated {
    type Item;

    /// Whether the API advertised another page after this one
    fn has_next(&self) -> bool;

    /// Consume the page, yielding its items in API order
    fn into_items(self) -> Vec<Self::Item>;
}

/// Server lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    New,
    #[default]
    Active,
    Off,
    Archive,
    #[serde(other)]
    Unknown,
}

impl ServerStatus {
    /// Powered off or archived servers are considered shut down
    pub fn is_shutdown(self) -> bool {
        matches!(self, Self::Off | Self::Archive)
    }
}

/// Region reference embedded in servers and load balancers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub slug: String,
    #[serde(default)]
    pub name: String,
}

/// Server size (plan) reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub slug: String,
}

/// Physical host a server is placed on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    #[serde(default)]
    pub display_name: String,
}

/// Whether an address is reachable from the internet or only inside a VPC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Public,
    Private,
}

/// A single address assigned to a server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub ip_address: String,
    #[serde(rename = "type")]
    pub network_type: NetworkType,
    // The API returns either a dotted mask or a prefix length here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netmask: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
}

/// Addresses of a server, split by IP family
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Networks {
    #[serde(default)]
    pub v4: Vec<Network>,
    #[serde(default)]
    pub v6: Vec<Network>,
}

/// BinaryLane server (compute instance)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub status: ServerStatus,
    #[serde(default)]
    pub region: Region,
    #[serde(default)]
    pub size: Size,
    #[serde(default)]
    pub networks: Networks,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<Host>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// `GET /servers` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServersResponse {
    pub servers: Vec<Server>,
    #[serde(default)]
    pub links: Option<Links>,
    #[serde(default)]
    pub meta: Option<Meta>,
}

impl Paginated for ServersResponse {
    type Item = Server;

    fn has_next(&self) -> bool {
        self.links.as_ref().is_some_and(|l| l.pages.next.is_some())
    }

    fn into_items(self) -> Vec<Server> {
        self.servers
    }
}

/// `GET /servers/{id}` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerResponse {
    pub server: Server,
}

/// Static route inside a VPC: traffic for `destination` is forwarded to `router`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub router: String,
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RouteEntry {
    /// Router and destination together identify an entry
    pub fn matches(&self, router: &str, destination: &str) -> bool {
        self.router == router && self.destination == destination
    }
}

/// BinaryLane virtual private cloud
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vpc {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_range: Option<String>,
    #[serde(default)]
    pub route_entries: Vec<RouteEntry>,
}

/// `GET /vpcs/{id}` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VpcResponse {
    pub vpc: Vpc,
}

/// `PUT /vpcs/{id}` body. The route list replaces the existing one wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateVpcRequest {
    pub name: String,
    pub route_entries: Vec<RouteEntry>,
}

/// Load balancer forwarding rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardingRule {
    pub entry_protocol: String,
}

/// Load balancer health check configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub protocol: String,
    pub path: String,
}

/// BinaryLane load balancer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
    #[serde(default)]
    pub forwarding_rules: Vec<ForwardingRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
    #[serde(default)]
    pub server_ids: Vec<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Request body for creating or replacing a load balancer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forwarding_rules: Vec<ForwardingRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
    #[serde(default)]
    pub server_ids: Vec<u64>,
}

/// `GET /load_balancers` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadBalancersResponse {
    pub load_balancers: Vec<LoadBalancer>,
    #[serde(default)]
    pub links: Option<Links>,
    #[serde(default)]
    pub meta: Option<Meta>,
}

impl Paginated for LoadBalancersResponse {
    type Item = LoadBalancer;

    fn has_next(&self) -> bool {
        self.links.as_ref().is_some_and(|l| l.pages.next.is_some())
    }

    fn into_items(self) -> Vec<LoadBalancer> {
        self.load_balancers
    }
}

/// `GET|POST|PUT /load_balancers[/{id}]` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadBalancerResponse {
    pub load_balancer: LoadBalancer,
}

/// Body of the add/remove backend server calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerIdsRequest {
    pub server_ids: Vec<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_deserializes_api_payload() {
        let body = serde_json::json!({
            "id": 123,
            "name": "node-1",
            "status": "off",
            "region": {"slug": "syd", "name": "Sydney"},
            "size": {"slug": "std-2vcpu"},
            "networks": {
                "v4": [
                    {"ip_address": "43.229.63.57", "type": "public", "netmask": "255.255.255.0"},
                    {"ip_address": "10.240.0.10", "type": "private", "netmask": 24}
                ],
                "v6": []
            },
            "vpc_id": 100,
            "host": {"display_name": "physical-host-01"},
            "created_at": "2024-01-01T00:00:00Z",
            "disk": 40
        });

        let server: Server = serde_json::from_value(body).unwrap();
        assert_eq!(server.id, 123);
        assert!(server.status.is_shutdown());
        assert_eq!(server.networks.v4[1].network_type, NetworkType::Private);
        assert_eq!(server.vpc_id, Some(100));
        assert_eq!(server.host.unwrap().display_name, "physical-host-01");
    }

    #[test]
    fn test_unknown_server_status_is_tolerated() {
        let server: Server = serde_json::from_value(serde_json::json!({
            "id": 1,
            "name": "node-1",
            "status": "migrating"
        }))
        .unwrap();
        assert_eq!(server.status, ServerStatus::Unknown);
        assert!(!server.status.is_shutdown());
    }

    #[test]
    fn test_pagination_has_next() {
        let page: ServersResponse = serde_json::from_value(serde_json::json!({
            "servers": [],
            "links": {"pages": {"next": "https://api.binarylane.com.au/v2/servers?page=2"}},
            "meta": {"total": 4}
        }))
        .unwrap();
        assert!(page.has_next());

        let last: ServersResponse = serde_json::from_value(serde_json::json!({
            "servers": [],
            "meta": {"total": 4}
        }))
        .unwrap();
        assert!(!last.has_next());
    }

    #[test]
    fn test_load_balancer_request_omits_empty_optionals() {
        let request = LoadBalancerRequest {
            name: "k8s-test-default-web".to_string(),
            region: None,
            forwarding_rules: vec![],
            health_check: None,
            server_ids: vec![],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"name": "k8s-test-default-web", "server_ids": []})
        );
    }
}
