//! VPC operations for MockBinaryLaneClient

use super::{MockBinaryLaneClient, MockCall, lock};
use crate::error::BinaryLaneError;
use crate::models::{UpdateVpcRequest, Vpc};

pub fn get_vpc(client: &MockBinaryLaneClient, id: u64) -> Result<Vpc, BinaryLaneError> {
    client.record(MockCall::GetVpc(id))?;

    lock(&client.vpcs)
        .get(&id)
        .cloned()
        .ok_or_else(|| BinaryLaneError::NotFound(format!("VPC {} not found", id)))
}

pub fn update_vpc(client: &MockBinaryLaneClient, id: u64, request: &UpdateVpcRequest) -> Result<Vpc, BinaryLaneError> {
    client.record(MockCall::UpdateVpc {
        id,
        request: request.clone(),
    })?;

    let mut vpcs = lock(&client.vpcs);
    let vpc = vpcs
        .get_mut(&id)
        .ok_or_else(|| BinaryLaneError::NotFound(format!("VPC {} not found", id)))?;
    vpc.name = request.name.clone();
    vpc.route_entries = request.route_entries.clone();
    Ok(vpc.clone())
}
