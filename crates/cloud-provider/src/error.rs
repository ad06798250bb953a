//! Cloud provider errors.
//!
//! Not-found outcomes are kept distinct from transport failures so callers can
//! decide per operation whether absence is fatal, a boolean, or a no-op.

use binarylane_client::BinaryLaneError;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by the cloud provider core
#[derive(Debug, Error)]
pub enum CloudError {
    /// Upstream API failure, wrapped with the operation and target it belonged to
    #[error("{context}: {source}")]
    Api {
        context: String,
        source: BinaryLaneError,
    },

    /// No server matches the node identity
    #[error("server not found: {0}")]
    ServerNotFound(String),

    #[error("VPC {0} not found")]
    VpcNotFound(u64),

    #[error("load balancer {0} not found")]
    LoadBalancerNotFound(u64),

    /// Routing through a server outside any VPC is not representable
    #[error("server {0} is not in a VPC")]
    NotInVpc(String),

    #[error("server {0} has no private IP")]
    NoPrivateAddress(String),

    /// The operation needs a load balancer id annotation that the service lacks
    #[error("load balancer ID not found in annotations of service {0}")]
    MissingLoadBalancerId(String),

    #[error("invalid value for annotation {annotation}: {message}")]
    InvalidAnnotation { annotation: String, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation did not complete within {0:?}")]
    DeadlineExceeded(Duration),
}

impl CloudError {
    /// Build a `map_err` adapter that wraps an upstream error with context.
    ///
    /// ```ignore
    /// client.get_vpc(id).await.map_err(CloudError::api(format!("get VPC {}", id)))?;
    /// ```
    pub fn api(context: impl Into<String>) -> impl FnOnce(BinaryLaneError) -> CloudError {
        let context = context.into();
        move |source| CloudError::Api { context, source }
    }

    /// True for the core's own not-found kinds and for wrapped upstream 404s
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ServerNotFound(_) | Self::VpcNotFound(_) | Self::LoadBalancerNotFound(_) => true,
            Self::Api { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}
