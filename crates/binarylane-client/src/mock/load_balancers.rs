//! Load balancer operations for MockBinaryLaneClient

use super::{MockBinaryLaneClient, MockCall, lock};
use crate::error::BinaryLaneError;
use crate::models::{LoadBalancer, LoadBalancerRequest, Region};

fn not_found(id: u64) -> BinaryLaneError {
    BinaryLaneError::NotFound(format!("Load balancer {} not found", id))
}

pub fn list_load_balancers(client: &MockBinaryLaneClient) -> Result<Vec<LoadBalancer>, BinaryLaneError> {
    client.record(MockCall::ListLoadBalancers)?;
    Ok(lock(&client.load_balancers).values().cloned().collect())
}

pub fn get_load_balancer(client: &MockBinaryLaneClient, id: u64) -> Result<LoadBalancer, BinaryLaneError> {
    client.record(MockCall::GetLoadBalancer(id))?;
    lock(&client.load_balancers)
        .get(&id)
        .cloned()
        .ok_or_else(|| not_found(id))
}

pub fn create_load_balancer(client: &MockBinaryLaneClient, request: &LoadBalancerRequest) -> Result<LoadBalancer, BinaryLaneError> {
    client.record(MockCall::CreateLoadBalancer(request.clone()))?;

    let id = client.next_id();
    let load_balancer = LoadBalancer {
        id,
        name: request.name.clone(),
        ip: format!("203.0.113.{}", id % 250 + 1),
        status: "new".to_string(),
        region: request.region.clone().map(|slug| Region {
            slug,
            name: String::new(),
        }),
        forwarding_rules: request.forwarding_rules.clone(),
        health_check: request.health_check.clone(),
        server_ids: request.server_ids.clone(),
        created_at: None,
    };
    lock(&client.load_balancers).insert(id, load_balancer.clone());
    Ok(load_balancer)
}

pub fn update_load_balancer(client: &MockBinaryLaneClient, id: u64, request: &LoadBalancerRequest) -> Result<LoadBalancer, BinaryLaneError> {
    client.record(MockCall::UpdateLoadBalancer {
        id,
        request: request.clone(),
    })?;

    let mut load_balancers = lock(&client.load_balancers);
    let load_balancer = load_balancers.get_mut(&id).ok_or_else(|| not_found(id))?;
    load_balancer.name = request.name.clone();
    load_balancer.region = request.region.clone().map(|slug| Region {
        slug,
        name: String::new(),
    });
    load_balancer.forwarding_rules = request.forwarding_rules.clone();
    load_balancer.health_check = request.health_check.clone();
    load_balancer.server_ids = request.server_ids.clone();
    Ok(load_balancer.clone())
}

pub fn delete_load_balancer(client: &MockBinaryLaneClient, id: u64) -> Result<(), BinaryLaneError> {
    client.record(MockCall::DeleteLoadBalancer(id))?;
    lock(&client.load_balancers)
        .remove(&id)
        .map(|_| ())
        .ok_or_else(|| not_found(id))
}

pub fn add_servers(client: &MockBinaryLaneClient, id: u64, server_ids: &[u64]) -> Result<(), BinaryLaneError> {
    client.record(MockCall::AddServers {
        id,
        server_ids: server_ids.to_vec(),
    })?;

    let mut load_balancers = lock(&client.load_balancers);
    let load_balancer = load_balancers.get_mut(&id).ok_or_else(|| not_found(id))?;
    for server_id in server_ids {
        if !load_balancer.server_ids.contains(server_id) {
            load_balancer.server_ids.push(*server_id);
        }
    }
    Ok(())
}

pub fn remove_servers(client: &MockBinaryLaneClient, id: u64, server_ids: &[u64]) -> Result<(), BinaryLaneError> {
    client.record(MockCall::RemoveServers {
        id,
        server_ids: server_ids.to_vec(),
    })?;

    let mut load_balancers = lock(&client.load_balancers);
    let load_balancer = load_balancers.get_mut(&id).ok_or_else(|| not_found(id))?;
    load_balancer.server_ids.retain(|s| !server_ids.contains(s));
    Ok(())
}
