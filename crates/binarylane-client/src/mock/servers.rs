//! Server operations for MockBinaryLaneClient

use super::{MockBinaryLaneClient, MockCall, lock};
use crate::error::BinaryLaneError;
use crate::models::Server;

pub fn list_servers(client: &MockBinaryLaneClient, hostname: Option<&str>) -> Result<Vec<Server>, BinaryLaneError> {
    client.record(MockCall::ListServers {
        hostname: hostname.map(str::to_string),
    })?;

    Ok(lock(&client.servers)
        .iter()
        .filter(|s| hostname.is_none_or(|h| s.name == h))
        .cloned()
        .collect())
}

pub fn get_server(client: &MockBinaryLaneClient, id: u64) -> Result<Server, BinaryLaneError> {
    client.record(MockCall::GetServer(id))?;

    lock(&client.servers)
        .iter()
        .find(|s| s.id == id)
        .cloned()
        .ok_or_else(|| BinaryLaneError::NotFound(format!("Server {} not found", id)))
}
