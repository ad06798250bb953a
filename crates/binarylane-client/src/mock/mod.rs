//! Mock BinaryLaneClient for unit testing
//!
//! This module provides a mock implementation of BinaryLaneClientTrait that can be used
//! in unit tests without talking to the real API.
//!
//! The mock is organized into resource-specific modules:
//! - `servers.rs` - server listing and lookup
//! - `vpcs.rs` - VPC route tables
//! - `load_balancers.rs` - load balancers and backend membership
//!
//! Every trait call is appended to a call log so tests can assert which remote
//! operations were (or were not) issued.

mod load_balancers;
mod servers;
mod vpcs;

use crate::binarylane_trait::BinaryLaneClientTrait;
use crate::error::BinaryLaneError;
use crate::models::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A remote call observed by the mock, with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    ValidateToken,
    ListServers { hostname: Option<String> },
    GetServer(u64),
    GetVpc(u64),
    UpdateVpc { id: u64, request: UpdateVpcRequest },
    ListLoadBalancers,
    GetLoadBalancer(u64),
    CreateLoadBalancer(LoadBalancerRequest),
    UpdateLoadBalancer { id: u64, request: LoadBalancerRequest },
    DeleteLoadBalancer(u64),
    AddServers { id: u64, server_ids: Vec<u64> },
    RemoveServers { id: u64, server_ids: Vec<u64> },
}

impl MockCall {
    /// Operation kind of this call, used for failure injection and filtering
    pub fn operation(&self) -> MockOperation {
        match self {
            Self::ValidateToken => MockOperation::ValidateToken,
            Self::ListServers { .. } => MockOperation::ListServers,
            Self::GetServer(_) => MockOperation::GetServer,
            Self::GetVpc(_) => MockOperation::GetVpc,
            Self::UpdateVpc { .. } => MockOperation::UpdateVpc,
            Self::ListLoadBalancers => MockOperation::ListLoadBalancers,
            Self::GetLoadBalancer(_) => MockOperation::GetLoadBalancer,
            Self::CreateLoadBalancer(_) => MockOperation::CreateLoadBalancer,
            Self::UpdateLoadBalancer { .. } => MockOperation::UpdateLoadBalancer,
            Self::DeleteLoadBalancer(_) => MockOperation::DeleteLoadBalancer,
            Self::AddServers { .. } => MockOperation::AddServers,
            Self::RemoveServers { .. } => MockOperation::RemoveServers,
        }
    }
}

/// Operation kinds of `BinaryLaneClientTrait`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    ValidateToken,
    ListServers,
    GetServer,
    GetVpc,
    UpdateVpc,
    ListLoadBalancers,
    GetLoadBalancer,
    CreateLoadBalancer,
    UpdateLoadBalancer,
    DeleteLoadBalancer,
    AddServers,
    RemoveServers,
}

/// Mock BinaryLaneClient for testing
///
/// Stores resources in memory. Clones share the same state, so a test can keep
/// one handle for assertions while the code under test owns another.
#[derive(Clone)]
pub struct MockBinaryLaneClient {
    pub(crate) base_url: String,
    // Insertion order is kept so list results mimic API ordering
    pub(crate) servers: Arc<Mutex<Vec<Server>>>,
    pub(crate) vpcs: Arc<Mutex<BTreeMap<u64, Vpc>>>,
    pub(crate) load_balancers: Arc<Mutex<BTreeMap<u64, LoadBalancer>>>,
    pub(crate) failures: Arc<Mutex<HashMap<MockOperation, String>>>,
    pub(crate) calls: Arc<Mutex<Vec<MockCall>>>,
    pub(crate) next_id: Arc<Mutex<u64>>,
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockBinaryLaneClient {
    /// Create a new mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            servers: Arc::new(Mutex::new(Vec::new())),
            vpcs: Arc::new(Mutex::new(BTreeMap::new())),
            load_balancers: Arc::new(Mutex::new(BTreeMap::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(Mutex::new(1000)),
        }
    }

    /// Add a server to the mock store (for test setup)
    pub fn add_server(&self, server: Server) {
        lock(&self.servers).push(server);
    }

    /// Remove a server, simulating out-of-band deletion
    pub fn remove_server(&self, id: u64) {
        lock(&self.servers).retain(|s| s.id != id);
    }

    /// Add a VPC to the mock store (for test setup)
    pub fn add_vpc(&self, vpc: Vpc) {
        lock(&self.vpcs).insert(vpc.id, vpc);
    }

    /// Add a load balancer to the mock store (for test setup)
    pub fn add_load_balancer(&self, load_balancer: LoadBalancer) {
        lock(&self.load_balancers).insert(load_balancer.id, load_balancer);
    }

    /// Make every subsequent call of `operation` fail with an API error
    pub fn fail_on(&self, operation: MockOperation, message: impl Into<String>) {
        lock(&self.failures).insert(operation, message.into());
    }

    /// Current state of a VPC
    pub fn vpc(&self, id: u64) -> Option<Vpc> {
        lock(&self.vpcs).get(&id).cloned()
    }

    /// Current state of a load balancer
    pub fn load_balancer(&self, id: u64) -> Option<LoadBalancer> {
        lock(&self.load_balancers).get(&id).cloned()
    }

    /// Every call observed so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// Calls of a single operation kind, in order
    pub fn calls_of(&self, operation: MockOperation) -> Vec<MockCall> {
        lock(&self.calls)
            .iter()
            .filter(|c| c.operation() == operation)
            .cloned()
            .collect()
    }

    /// Forget the call log (e.g. after test setup)
    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Record a call and return the injected failure for it, if any
    pub(crate) fn record(&self, call: MockCall) -> Result<(), BinaryLaneError> {
        let operation = call.operation();
        lock(&self.calls).push(call);
        match lock(&self.failures).get(&operation) {
            Some(message) => Err(BinaryLaneError::Api(message.clone())),
            None => Ok(()),
        }
    }

    /// Generate next ID
    pub(crate) fn next_id(&self) -> u64 {
        let mut id = lock(&self.next_id);
        let current = *id;
        *id += 1;
        current
    }
}

#[async_trait::async_trait]
impl BinaryLaneClientTrait for MockBinaryLaneClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn validate_token(&self) -> Result<(), BinaryLaneError> {
        self.record(MockCall::ValidateToken)
    }

    // Servers - delegated to servers module
    async fn list_servers(&self, hostname: Option<&str>) -> Result<Vec<Server>, BinaryLaneError> {
        servers::list_servers(self, hostname)
    }

    async fn get_server(&self, id: u64) -> Result<Server, BinaryLaneError> {
        servers::get_server(self, id)
    }

    // VPCs - delegated to vpcs module
    async fn get_vpc(&self, id: u64) -> Result<Vpc, BinaryLaneError> {
        vpcs::get_vpc(self, id)
    }

    async fn update_vpc(&self, id: u64, request: &UpdateVpcRequest) -> Result<Vpc, BinaryLaneError> {
        vpcs::update_vpc(self, id, request)
    }

    // Load balancers - delegated to load_balancers module
    async fn list_load_balancers(&self) -> Result<Vec<LoadBalancer>, BinaryLaneError> {
        load_balancers::list_load_balancers(self)
    }

    async fn get_load_balancer(&self, id: u64) -> Result<LoadBalancer, BinaryLaneError> {
        load_balancers::get_load_balancer(self, id)
    }

    async fn create_load_balancer(&self, request: &LoadBalancerRequest) -> Result<LoadBalancer, BinaryLaneError> {
        load_balancers::create_load_balancer(self, request)
    }

    async fn update_load_balancer(&self, id: u64, request: &LoadBalancerRequest) -> Result<LoadBalancer, BinaryLaneError> {
        load_balancers::update_load_balancer(self, id, request)
    }

    async fn delete_load_balancer(&self, id: u64) -> Result<(), BinaryLaneError> {
        load_balancers::delete_load_balancer(self, id)
    }

    async fn add_servers_to_load_balancer(&self, id: u64, server_ids: &[u64]) -> Result<(), BinaryLaneError> {
        load_balancers::add_servers(self, id, server_ids)
    }

    async fn remove_servers_from_load_balancer(&self, id: u64, server_ids: &[u64]) -> Result<(), BinaryLaneError> {
        load_balancers::remove_servers(self, id, server_ids)
    }
}
