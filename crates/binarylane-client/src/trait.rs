//! BinaryLaneClient trait for mocking
//!
//! Every component of the cloud provider talks to BinaryLane through this trait,
//! so the concrete HTTP client can be swapped for `MockBinaryLaneClient` in tests.

use crate::error::BinaryLaneError;
use crate::models::*;

/// Trait for BinaryLane API client operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait BinaryLaneClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    /// Validate the API token
    async fn validate_token(&self) -> Result<(), BinaryLaneError>;

    // Servers

    /// List servers across all pages, optionally filtered by hostname on the API side
    async fn list_servers(&self, hostname: Option<&str>) -> Result<Vec<Server>, BinaryLaneError>;
    async fn get_server(&self, id: u64) -> Result<Server, BinaryLaneError>;

    // VPCs
    async fn get_vpc(&self, id: u64) -> Result<Vpc, BinaryLaneError>;
    /// Replace the VPC's name and entire route list
    async fn update_vpc(&self, id: u64, request: &UpdateVpcRequest) -> Result<Vpc, BinaryLaneError>;

    // Load balancers
    async fn list_load_balancers(&self) -> Result<Vec<LoadBalancer>, BinaryLaneError>;
    async fn get_load_balancer(&self, id: u64) -> Result<LoadBalancer, BinaryLaneError>;
    async fn create_load_balancer(&self, request: &LoadBalancerRequest) -> Result<LoadBalancer, BinaryLaneError>;
    /// Replace the whole load balancer configuration, including backend membership
    async fn update_load_balancer(&self, id: u64, request: &LoadBalancerRequest) -> Result<LoadBalancer, BinaryLaneError>;
    async fn delete_load_balancer(&self, id: u64) -> Result<(), BinaryLaneError>;
    async fn add_servers_to_load_balancer(&self, id: u64, server_ids: &[u64]) -> Result<(), BinaryLaneError>;
    async fn remove_servers_from_load_balancer(&self, id: u64, server_ids: &[u64]) -> Result<(), BinaryLaneError>;
}
