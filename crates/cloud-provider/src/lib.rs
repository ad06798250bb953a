//! BinaryLane cloud provider
//!
//! Reconciles a Kubernetes cluster's network reachability against BinaryLane:
//! pod CIDR routes inside VPCs and load balancers for `LoadBalancer` services.
//!
//! Components, leaves first:
//! - `directory`: resolves a node to its server (provider handle, then name)
//! - `network`: classifies a server's addresses and VPC membership
//! - `routes`: lists, creates and deletes VPC routes
//! - `load_balancer`: gets, ensures, updates and deletes load balancers
//! - `zones`: reports the configured region
//!
//! Nothing here runs in the background. Every operation is a single call chain
//! against the API and is safe to repeat.
//!
//! # Example
//!
//! ```no_run
//! use cloud_provider::{CloudConfig, ProviderRegistry, PROVIDER_NAME, register_builtin_providers};
//!
//! # async fn example() -> Result<(), cloud_provider::CloudError> {
//! let mut registry = ProviderRegistry::new();
//! register_builtin_providers(&mut registry);
//!
//! let cloud = registry.build(PROVIDER_NAME, CloudConfig::from_env()?)?;
//! if let Some(routes) = cloud.routes() {
//!     for route in routes.list_routes("prod").await? {
//!         println!("{} -> {}", route.destination_cidr, route.target_node);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod cloud;
pub mod config;
pub mod directory;
pub mod error;
pub mod instances;
pub mod load_balancer;
pub mod network;
pub mod routes;
pub mod zones;

#[cfg(test)]
mod routes_test;
#[cfg(test)]
mod test_utils;

pub use cancel::with_cancellation;
pub use cloud::{Cloud, PROVIDER_NAME, ProviderFactory, ProviderRegistry, register_builtin_providers};
pub use config::CloudConfig;
pub use directory::{NodeIdentity, ServerDirectory, format_provider_id, parse_provider_id};
pub use error::CloudError;
pub use instances::{HOST_LABEL, InstanceMetadata, Instances};
pub use load_balancer::{EnsuredLoadBalancer, LoadBalancers};
pub use network::NetworkMembership;
pub use routes::{Route, Routes};
pub use zones::{Zone, Zones};
