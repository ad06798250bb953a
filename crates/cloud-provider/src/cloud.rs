//! Provider construction and capability accessors.
//!
//! Providers are registered explicitly into a `ProviderRegistry` by the entry
//! point and built by name from a `CloudConfig`. There is no global registry.

use crate::config::CloudConfig;
use crate::directory::ServerDirectory;
use crate::error::CloudError;
use crate::instances::Instances;
use crate::load_balancer::LoadBalancers;
use crate::routes::Routes;
use crate::zones::Zones;
use binarylane_client::{BinaryLaneClient, BinaryLaneClientTrait};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub const PROVIDER_NAME: &str = "binarylane";

/// The BinaryLane cloud provider
#[derive(Clone)]
pub struct Cloud {
    config: CloudConfig,
    client: Arc<dyn BinaryLaneClientTrait>,
    directory: ServerDirectory,
}

impl std::fmt::Debug for Cloud {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cloud")
            .field("config", &self.config)
            .field("api_url", &self.client.base_url())
            .finish()
    }
}

impl Cloud {
    /// Build a provider talking to the real BinaryLane API
    pub fn new(config: CloudConfig) -> Result<Self, CloudError> {
        let client = BinaryLaneClient::new(config.api_url.clone(), config.access_token.clone())
            .map_err(CloudError::api("create BinaryLane client"))?;
        Ok(Self::from_client(config, Arc::new(client)))
    }

    /// Build a provider over any client implementation (e.g. `MockBinaryLaneClient`)
    pub fn from_client(config: CloudConfig, client: Arc<dyn BinaryLaneClientTrait>) -> Self {
        let directory = ServerDirectory::new(Arc::clone(&client));
        Self {
            config,
            client,
            directory,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }

    pub fn config(&self) -> &CloudConfig {
        &self.config
    }

    /// Check that the configured token is accepted by the API
    pub async fn validate(&self) -> Result<(), CloudError> {
        self.client
            .validate_token()
            .await
            .map_err(CloudError::api("validate BinaryLane token"))
    }

    pub fn server_directory(&self) -> &ServerDirectory {
        &self.directory
    }

    pub fn instances(&self) -> Option<Instances> {
        Some(Instances::new(self.directory.clone()))
    }

    /// Route management, only when a cluster CIDR is configured
    pub fn routes(&self) -> Option<Routes> {
        self.config
            .cluster_cidr
            .map(|cidr| Routes::new(self.directory.clone(), cidr))
    }

    pub fn load_balancer(&self) -> Option<LoadBalancers> {
        Some(LoadBalancers::new(self.directory.clone(), self.config.region.clone()))
    }

    pub fn zones(&self) -> Option<Zones> {
        Some(Zones::new(self.config.region.clone()))
    }
}

pub type ProviderFactory = fn(CloudConfig) -> Result<Cloud, CloudError>;

/// Provider factories by name
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, factory: ProviderFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn build(&self, name: &str, config: CloudConfig) -> Result<Cloud, CloudError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| CloudError::InvalidConfig(format!("unknown cloud provider '{}'", name)))?;
        info!("Building cloud provider {}", name);
        factory(config)
    }
}

/// Register the providers shipped with this crate
pub fn register_builtin_providers(registry: &mut ProviderRegistry) {
    registry.register(PROVIDER_NAME, Cloud::new);
}
