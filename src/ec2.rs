use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_ec2::{model, Client};
use aws_types::SdkConfig;
use futures::TryStreamExt;
use itertools::Itertools;
use log::{debug, info};

use crate::{
    provider::{Instance, InstanceProvider, RegionId},
    utils,
};

pub struct Ec2Provider {
    config: SdkConfig,
}

impl Ec2Provider {
    pub fn new(config: SdkConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl InstanceProvider for Ec2Provider {
    async fn list_regions(&self) -> anyhow::Result<Vec<RegionId>> {
        info!("loading regions");
        let client = Client::new(&self.config);
        let response = client
            .describe_regions()
            .send()
            .await
            .context("failed to list ec2 regions")?;

        Ok(enabled_regions(response.regions().unwrap_or_default()))
    }

    async fn list_instances(&self, region: &str) -> anyhow::Result<Vec<Instance>> {
        let client = utils::regional_client(&self.config, region);
        let reservations = client
            .describe_instances()
            .into_paginator()
            .items()
            .send()
            .try_collect::<Vec<_>>()
            .await
            .with_context(|| format!("failed to list instances in {}", region))?;

        let instances = reservations
            .iter()
            .flat_map(|reservation| reservation.instances().unwrap_or_default())
            .filter_map(to_instance)
            .collect_vec();
        debug!("{} instances in {}", instances.len(), region);
        Ok(instances)
    }
}

/// Regions the account can query; opt-in regions that are not enabled are skipped.
fn enabled_regions(regions: &[model::Region]) -> Vec<RegionId> {
    regions
        .iter()
        .filter(|region| region.opt_in_status() != Some("not-opted-in"))
        .filter_map(|region| region.region_name().map(|name| name.to_owned()))
        .collect_vec()
}

fn to_instance(instance: &model::Instance) -> Option<Instance> {
    Some(Instance {
        id: instance.instance_id()?.to_owned(),
        public_address: instance.public_ip_address().map(|address| address.to_owned()),
        tags: instance
            .tags()
            .unwrap_or_default()
            .iter()
            .filter_map(|tag| {
                Some((
                    tag.key()?.to_owned(),
                    tag.value().unwrap_or_default().to_owned(),
                ))
            })
            .collect(),
    })
}
