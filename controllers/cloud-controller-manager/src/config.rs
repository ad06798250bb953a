//! Controller configuration from environment variables.

use crate::error::ControllerError;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_CLUSTER_NAME: &str = "kubernetes";
pub const DEFAULT_HEALTH_ADDR: &str = "0.0.0.0:10258";
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Prefix of the cluster's server names; also part of load balancer names
    pub cluster_name: String,
    pub health_addr: SocketAddr,
    /// Upper bound for a single provider operation
    pub operation_timeout: Duration,
    /// Periodic requeue of every Service and Node
    pub resync_interval: Duration,
}

impl ControllerConfig {
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let seconds = |key: &str, default: u64| -> Result<Duration, ControllerError> {
            match get(key) {
                None => Ok(Duration::from_secs(default)),
                Some(raw) => match raw.parse::<u64>() {
                    Ok(0) | Err(_) => Err(ControllerError::InvalidConfig(format!(
                        "{} must be a positive number of seconds, got '{}'",
                        key, raw
                    ))),
                    Ok(secs) => Ok(Duration::from_secs(secs)),
                },
            }
        };

        let health_raw = get("HEALTH_BIND_ADDRESS").unwrap_or_else(|| DEFAULT_HEALTH_ADDR.to_string());
        let health_addr = health_raw.parse().map_err(|e| {
            ControllerError::InvalidConfig(format!("HEALTH_BIND_ADDRESS '{}': {}", health_raw, e))
        })?;

        Ok(Self {
            cluster_name: get("CLUSTER_NAME").unwrap_or_else(|| DEFAULT_CLUSTER_NAME.to_string()),
            health_addr,
            operation_timeout: seconds("OPERATION_TIMEOUT_SECS", DEFAULT_OPERATION_TIMEOUT_SECS)?,
            resync_interval: seconds("RESYNC_INTERVAL_SECS", DEFAULT_RESYNC_INTERVAL_SECS)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.cluster_name, "kubernetes");
        assert_eq!(config.health_addr.port(), 10258);
        assert_eq!(config.operation_timeout, Duration::from_secs(60));
        assert_eq!(config.resync_interval, Duration::from_secs(300));
    }

    #[test]
    fn test_overrides() {
        let config = ControllerConfig::from_lookup(|key| match key {
            "CLUSTER_NAME" => Some("prod".to_string()),
            "HEALTH_BIND_ADDRESS" => Some("127.0.0.1:9000".to_string()),
            "RESYNC_INTERVAL_SECS" => Some("30".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.cluster_name, "prod");
        assert_eq!(config.health_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.resync_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_values() {
        for (key, value) in [
            ("OPERATION_TIMEOUT_SECS", "0"),
            ("RESYNC_INTERVAL_SECS", "soon"),
            ("HEALTH_BIND_ADDRESS", "not-an-address"),
        ] {
            let result = ControllerConfig::from_lookup(|k| (k == key).then(|| value.to_string()));
            assert!(
                matches!(result, Err(ControllerError::InvalidConfig(_))),
                "{} = {}",
                key,
                value
            );
        }
    }
}
