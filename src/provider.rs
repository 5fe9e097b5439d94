use std::collections::HashMap;

use async_trait::async_trait;
use itertools::Itertools;

pub type RegionId = String;
pub type InstanceId = String;

/// Read-only view of the compute instances visible to one account.
#[async_trait]
pub trait InstanceProvider {
    async fn list_regions(&self) -> anyhow::Result<Vec<RegionId>>;
    async fn list_instances(&self, region: &str) -> anyhow::Result<Vec<Instance>>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Instance {
    pub id: InstanceId,
    pub public_address: Option<String>,
    pub tags: HashMap<String, String>,
}

impl Instance {
    pub fn name(&self) -> Option<&str> {
        self.tags.get("Name").map(String::as_str)
    }
}

/// Keeps the regions whose name contains `filter`, in the order the provider returned them.
pub fn filter_regions(regions: impl IntoIterator<Item = RegionId>, filter: &str) -> Vec<RegionId> {
    regions
        .into_iter()
        .filter(|region| region.contains(filter))
        .collect_vec()
}
