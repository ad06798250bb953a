//! Controller-specific error types.
//!
//! This module defines error types specific to the cloud controller manager
//! that are not covered by the provider's own errors.

use cloud_provider::CloudError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the cloud controller manager.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// BinaryLane provider error
    #[error("Cloud provider error: {0}")]
    Cloud(#[from] CloudError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Some steps of a reconcile failed; the rest were applied
    #[error("Reconciliation failed: {0}")]
    Reconciliation(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Probe server failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
