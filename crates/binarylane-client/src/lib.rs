//! BinaryLane REST API Client
//!
//! A Rust client library for the parts of the BinaryLane v2 API a Kubernetes
//! cloud controller needs: servers, VPC route tables and load balancers.
//!
//! # Example
//!
//! ```no_run
//! use binarylane_client::{BinaryLaneClient, BinaryLaneClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = BinaryLaneClient::with_token("your-api-token".to_string())?;
//!
//! // Look servers up by hostname (all pages are drained)
//! let servers = client.list_servers(Some("worker-1")).await?;
//!
//! // Inspect a VPC route table
//! if let Some(vpc_id) = servers.first().and_then(|s| s.vpc_id) {
//!     let vpc = client.get_vpc(vpc_id).await?;
//!     println!("{} routes", vpc.route_entries.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Pagination**: list endpoints are drained page by page
//! - **Not-found detection**: HTTP 404 maps to `BinaryLaneError::NotFound`
//! - **Mocking**: `MockBinaryLaneClient` behind the `test-util` feature

pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod binarylane_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use binarylane_trait::BinaryLaneClientTrait;
pub use client::{BinaryLaneClient, DEFAULT_BASE_URL};
pub use common::HttpClient;
pub use error::BinaryLaneError;
pub use models::*;
#[cfg(feature = "test-util")]
pub use mock::{MockBinaryLaneClient, MockCall, MockOperation};
