//! Provider configuration loaded from the environment.

use crate::error::CloudError;
use binarylane_client::DEFAULT_BASE_URL;
use ipnetwork::IpNetwork;
use tracing::warn;

pub const ENV_ACCESS_TOKEN: &str = "BINARYLANE_ACCESS_TOKEN";
/// Older deployments set the token under this name
pub const ENV_LEGACY_API_TOKEN: &str = "BINARYLANE_API_TOKEN";
pub const ENV_REGION: &str = "BINARYLANE_REGION";
pub const ENV_API_URL: &str = "BINARYLANE_API_URL";
pub const ENV_CLUSTER_CIDR: &str = "CLUSTER_CIDR";

pub const DEFAULT_REGION: &str = "default";

/// Configuration of the BinaryLane provider
#[derive(Clone)]
pub struct CloudConfig {
    pub access_token: String,
    /// Region slug reported for zones and used for new load balancers
    pub region: String,
    pub api_url: String,
    /// Pod network of the cluster. Route management is only offered when set.
    pub cluster_cidr: Option<IpNetwork>,
}

impl std::fmt::Debug for CloudConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudConfig")
            .field("access_token", &"<redacted>")
            .field("region", &self.region)
            .field("api_url", &self.api_url)
            .field("cluster_cidr", &self.cluster_cidr)
            .finish()
    }
}

impl CloudConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self, CloudError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CloudError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let access_token = get(ENV_ACCESS_TOKEN)
            .or_else(|| get(ENV_LEGACY_API_TOKEN))
            .ok_or_else(|| {
                CloudError::InvalidConfig(format!("{} environment variable is required", ENV_ACCESS_TOKEN))
            })?;

        let region = get(ENV_REGION).unwrap_or_else(|| {
            warn!(
                "{} not set, using region '{}'",
                ENV_REGION, DEFAULT_REGION
            );
            DEFAULT_REGION.to_string()
        });

        let api_url = get(ENV_API_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let cluster_cidr = get(ENV_CLUSTER_CIDR)
            .map(|raw| {
                raw.parse::<IpNetwork>().map_err(|e| {
                    CloudError::InvalidConfig(format!("{} '{}' is not a CIDR: {}", ENV_CLUSTER_CIDR, raw, e))
                })
            })
            .transpose()?;

        Ok(Self {
            access_token,
            region,
            api_url,
            cluster_cidr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CloudConfig::from_lookup(lookup(&[(ENV_ACCESS_TOKEN, "tok")])).unwrap();
        assert_eq!(config.access_token, "tok");
        assert_eq!(config.region, DEFAULT_REGION);
        assert_eq!(config.api_url, DEFAULT_BASE_URL);
        assert!(config.cluster_cidr.is_none());
    }

    #[test]
    fn test_legacy_token_is_accepted() {
        let config = CloudConfig::from_lookup(lookup(&[(ENV_LEGACY_API_TOKEN, "old")])).unwrap();
        assert_eq!(config.access_token, "old");

        let config = CloudConfig::from_lookup(lookup(&[
            (ENV_ACCESS_TOKEN, "new"),
            (ENV_LEGACY_API_TOKEN, "old"),
        ]))
        .unwrap();
        assert_eq!(config.access_token, "new");
    }

    #[test]
    fn test_missing_token_is_invalid() {
        let err = CloudConfig::from_lookup(lookup(&[(ENV_ACCESS_TOKEN, "  ")])).unwrap_err();
        assert!(matches!(err, CloudError::InvalidConfig(_)));
    }

    #[test]
    fn test_cluster_cidr_is_parsed() {
        let config = CloudConfig::from_lookup(lookup(&[
            (ENV_ACCESS_TOKEN, "tok"),
            (ENV_REGION, "syd"),
            (ENV_CLUSTER_CIDR, "10.244.0.0/16"),
        ]))
        .unwrap();
        assert_eq!(config.region, "syd");
        assert_eq!(config.cluster_cidr.unwrap().to_string(), "10.244.0.0/16");

        let err = CloudConfig::from_lookup(lookup(&[
            (ENV_ACCESS_TOKEN, "tok"),
            (ENV_CLUSTER_CIDR, "not-a-cidr"),
        ]))
        .unwrap_err();
        assert!(matches!(err, CloudError::InvalidConfig(_)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = CloudConfig::from_lookup(lookup(&[(ENV_ACCESS_TOKEN, "secret")])).unwrap();
        assert!(!format!("{:?}", config).contains("secret"));
    }
}
