//! Zone Reporter. BinaryLane has no zones below the region, so every node
//! reports the configured region as both failure domain and region.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub failure_domain: String,
    pub region: String,
}

#[derive(Debug, Clone)]
pub struct Zones {
    region: String,
}

impl Zones {
    pub fn new(region: impl Into<String>) -> Self {
        Self { region: region.into() }
    }

    pub fn get_zone(&self) -> Zone {
        Zone {
            failure_domain: self.region.clone(),
            region: self.region.clone(),
        }
    }

    pub fn get_zone_by_provider_id(&self, _provider_id: &str) -> Zone {
        self.get_zone()
    }

    pub fn get_zone_by_node_name(&self, _node_name: &str) -> Zone {
        self.get_zone()
    }
}
