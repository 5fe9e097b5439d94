use std::collections::BTreeMap;

use log::{debug, info};
use serde::Serialize;

use crate::{
    concurrent::{ConcurrentLoader, DEFAULT_CONCURRENCY},
    provider::{filter_regions, Instance, InstanceId, InstanceProvider},
};

pub const DEFAULT_REGION_FILTER: &str = "us-";
pub const DEFAULT_SSH_USER: &str = "ubuntu";
pub const DEFAULT_SSH_PRIVATE_KEY_FILE: &str = "~/.ssh/id_rsa";

/// The dynamic inventory document printed for `--list`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InventoryDocument {
    #[serde(rename = "_meta")]
    pub meta: Meta,
    pub webservers: Group,
    #[serde(rename = "otherHosts")]
    pub other_hosts: Group,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Meta {
    pub hostvars: BTreeMap<InstanceId, HostVars>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Group {
    pub hosts: Vec<InstanceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vars: Option<ConnectionVars>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HostVars {
    pub ansible_host: String,
    #[serde(flatten)]
    pub connection: ConnectionVars,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConnectionVars {
    pub ansible_ssh_user: String,
    pub ansible_ssh_private_key_file: String,
}

impl Default for ConnectionVars {
    fn default() -> Self {
        Self {
            ansible_ssh_user: DEFAULT_SSH_USER.to_string(),
            ansible_ssh_private_key_file: DEFAULT_SSH_PRIVATE_KEY_FILE.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventorySettings {
    pub region_filter: String,
    pub connection: ConnectionVars,
    pub concurrency: usize,
}

impl Default for InventorySettings {
    fn default() -> Self {
        Self {
            region_filter: DEFAULT_REGION_FILTER.to_string(),
            connection: ConnectionVars::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl InventoryDocument {
    /// Adds `instance` to `webservers`. An instance without a public address gets an
    /// empty `ansible_host`.
    pub fn record_host(&mut self, instance: &Instance, connection: &ConnectionVars) {
        // Name tag does not take part in grouping.
        let tag_name = instance.name().unwrap_or_default();
        debug!("recording {} ({:?})", instance.id, tag_name);

        let previous = self.meta.hostvars.insert(
            instance.id.clone(),
            HostVars {
                ansible_host: instance.public_address.clone().unwrap_or_default(),
                connection: connection.clone(),
            },
        );
        if previous.is_none() {
            self.webservers.hosts.push(instance.id.clone());
        }
    }

    pub fn host_vars(&self, id: &str) -> Option<&HostVars> {
        self.meta.hostvars.get(id)
    }
}

pub async fn build_inventory<P>(
    provider: &P,
    settings: &InventorySettings,
) -> anyhow::Result<InventoryDocument>
where
    P: InstanceProvider + Sync + ?Sized,
{
    let regions = filter_regions(provider.list_regions().await?, &settings.region_filter);
    info!(
        "{} regions match {:?}",
        regions.len(),
        settings.region_filter
    );

    let mut loader = ConcurrentLoader::new(settings.concurrency);
    for region in regions {
        loader.spawn_region_loader(provider, region).await;
    }

    let mut document = InventoryDocument::default();
    for loaded in loader.collect().await? {
        info!("{} loaded, {} instances", loaded.region, loaded.instances.len());
        for instance in loaded.instances.iter() {
            document.record_host(instance, &settings.connection);
        }
    }

    document.other_hosts.vars = Some(settings.connection.clone());
    Ok(document)
}
