//! Resource naming and ARM identifier derivation.
//!
//! All Azure-side names are derived here, deterministically, from the
//! cluster spec plus a short random suffix drawn once at creation time.
//! The derived topology is persisted to the state file so a later destroy
//! reconstructs every identifier without re-rolling the suffix.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::spec::ClusterSpec;

/// Length of the random lowercase suffix appended to resource names
pub const SUFFIX_LEN: usize = 4;

/// The set of Azure resource names and address prefixes for one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceTopology {
    /// Base resource group holding the network and the cluster object
    pub resource_group: String,
    /// Cluster-scoped resource group managed for the cluster's own nodes
    pub cluster_resource_group: String,
    /// Virtual network name
    pub virtual_network: String,
    /// Master subnet name
    pub master_subnet: String,
    /// Worker subnet name
    pub worker_subnet: String,
    /// Virtual network address space
    pub vnet_cidr: String,
    /// Master subnet address prefix
    pub master_subnet_cidr: String,
    /// Worker subnet address prefix
    pub worker_subnet_cidr: String,
}

impl ResourceTopology {
    /// Derive the full topology from a spec and a name suffix.
    ///
    /// Pure: same spec and suffix always produce the same topology.
    pub fn derive(spec: &ClusterSpec, suffix: &str) -> Self {
        Self {
            resource_group: format!("aro-rg-{suffix}"),
            cluster_resource_group: format!("{}-rg", spec.name),
            virtual_network: format!("aro-vnet-{suffix}"),
            master_subnet: format!("master-subnet-{suffix}"),
            worker_subnet: format!("workers-subnet-{suffix}"),
            vnet_cidr: spec.vnet_cidr.clone(),
            master_subnet_cidr: spec.master_subnet_cidr.clone(),
            worker_subnet_cidr: spec.worker_subnet_cidr.clone(),
        }
    }

    /// ARM resource ID of the cluster-scoped resource group.
    pub fn cluster_resource_group_id(&self, subscription_id: &str) -> String {
        format!(
            "/subscriptions/{subscription_id}/resourcegroups/{}",
            self.cluster_resource_group
        )
    }

    /// ARM resource ID of the master subnet.
    pub fn master_subnet_id(&self, subscription_id: &str) -> String {
        self.subnet_id(subscription_id, &self.master_subnet)
    }

    /// ARM resource ID of the worker subnet.
    pub fn worker_subnet_id(&self, subscription_id: &str) -> String {
        self.subnet_id(subscription_id, &self.worker_subnet)
    }

    fn subnet_id(&self, subscription_id: &str, subnet: &str) -> String {
        format!(
            "/subscriptions/{subscription_id}/resourceGroups/{}/providers/Microsoft.Network/virtualNetworks/{}/subnets/{subnet}",
            self.resource_group, self.virtual_network
        )
    }
}

/// A provisioned cluster: enough to poll, fetch credentials, and delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterHandle {
    /// Cluster resource name
    pub name: String,
    /// Resource group the cluster resource lives in
    pub resource_group: String,
}

/// Generate a random lowercase suffix for resource names.
pub fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| rng.gen_range(b'a'..=b'z') as char)
        .collect()
}
