//! BinaryLane API client
//!
//! Implements the subset of the BinaryLane v2 REST API used by the cloud controller:
//! servers, VPC route tables and load balancers.

use crate::common::HttpClient;
use crate::error::BinaryLaneError;
use crate::models::*;
use crate::binarylane_trait::BinaryLaneClientTrait;
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::debug;

/// Public BinaryLane API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.binarylane.com.au/v2";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// BinaryLane API client
pub struct BinaryLaneClient {
    http: HttpClient,
}

impl BinaryLaneClient {
    /// Create a new BinaryLane client
    ///
    /// # Arguments
    /// * `base_url` - API base URL including the version segment (e.g., "https://api.binarylane.com.au/v2")
    /// * `token` - API access token
    pub fn new(base_url: String, token: String) -> Result<Self, BinaryLaneError> {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(BinaryLaneError::InvalidRequest(format!(
                "base URL must be http(s): {}",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!(
                "binarylane-cloud-controller-manager/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            http: HttpClient::new(client, base_url, token),
        })
    }

    /// Create a client against the public API endpoint
    pub fn with_token(token: String) -> Result<Self, BinaryLaneError> {
        Self::new(DEFAULT_BASE_URL.to_string(), token)
    }
}

#[async_trait::async_trait]
impl BinaryLaneClientTrait for BinaryLaneClient {
    fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Validate the API token by fetching the account the token belongs to.
    async fn validate_token(&self) -> Result<(), BinaryLaneError> {
        debug!("Validating BinaryLane token and connectivity");
        let _: serde_json::Value = self.http.get("/account").await?;
        debug!("Token validated successfully");
        Ok(())
    }

    async fn list_servers(&self, hostname: Option<&str>) -> Result<Vec<Server>, BinaryLaneError> {
        let filters: Vec<(&str, &str)> = hostname.map(|h| ("hostname", h)).into_iter().collect();
        self.http
            .fetch_all_pages::<ServersResponse>("/servers", &filters)
            .await
    }

    async fn get_server(&self, id: u64) -> Result<Server, BinaryLaneError> {
        let response: ServerResponse = self
            .http
            .get(&format!("/servers/{}", id))
            .await
            .map_err(|e| match e {
                BinaryLaneError::NotFound(_) => BinaryLaneError::NotFound(format!("Server {} not found", id)),
                other => other,
            })?;
        Ok(response.server)
    }

    async fn get_vpc(&self, id: u64) -> Result<Vpc, BinaryLaneError> {
        let response: VpcResponse = self
            .http
            .get(&format!("/vpcs/{}", id))
            .await
            .map_err(|e| match e {
                BinaryLaneError::NotFound(_) => BinaryLaneError::NotFound(format!("VPC {} not found", id)),
                other => other,
            })?;
        Ok(response.vpc)
    }

    async fn update_vpc(&self, id: u64, request: &UpdateVpcRequest) -> Result<Vpc, BinaryLaneError> {
        debug!(
            "Replacing route table of VPC {} with {} entries",
            id,
            request.route_entries.len()
        );
        let response: VpcResponse = self
            .http
            .send_json(Method::PUT, &format!("/vpcs/{}", id), request)
            .await?;
        Ok(response.vpc)
    }

    async fn list_load_balancers(&self) -> Result<Vec<LoadBalancer>, BinaryLaneError> {
        self.http
            .fetch_all_pages::<LoadBalancersResponse>("/load_balancers", &[])
            .await
    }

    async fn get_load_balancer(&self, id: u64) -> Result<LoadBalancer, BinaryLaneError> {
        let response: LoadBalancerResponse = self
            .http
            .get(&format!("/load_balancers/{}", id))
            .await
            .map_err(|e| match e {
                BinaryLaneError::NotFound(_) => {
                    BinaryLaneError::NotFound(format!("Load balancer {} not found", id))
                }
                other => other,
            })?;
        Ok(response.load_balancer)
    }

    async fn create_load_balancer(&self, request: &LoadBalancerRequest) -> Result<LoadBalancer, BinaryLaneError> {
        let response: LoadBalancerResponse = self
            .http
            .send_json(Method::POST, "/load_balancers", request)
            .await?;
        Ok(response.load_balancer)
    }

    async fn update_load_balancer(&self, id: u64, request: &LoadBalancerRequest) -> Result<LoadBalancer, BinaryLaneError> {
        let response: LoadBalancerResponse = self
            .http
            .send_json(Method::PUT, &format!("/load_balancers/{}", id), request)
            .await?;
        Ok(response.load_balancer)
    }

    async fn delete_load_balancer(&self, id: u64) -> Result<(), BinaryLaneError> {
        self.http
            .send_empty::<()>(Method::DELETE, &format!("/load_balancers/{}", id), None)
            .await
    }

    async fn add_servers_to_load_balancer(&self, id: u64, server_ids: &[u64]) -> Result<(), BinaryLaneError> {
        let body = ServerIdsRequest {
            server_ids: server_ids.to_vec(),
        };
        self.http
            .send_empty(Method::POST, &format!("/load_balancers/{}/servers", id), Some(&body))
            .await
    }

    async fn remove_servers_from_load_balancer(&self, id: u64, server_ids: &[u64]) -> Result<(), BinaryLaneError> {
        let body = ServerIdsRequest {
            server_ids: server_ids.to_vec(),
        };
        self.http
            .send_empty(Method::DELETE, &format!("/load_balancers/{}/servers", id), Some(&body))
            .await
    }
}
