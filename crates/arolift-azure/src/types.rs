//! ARO wire types
//!
//! Request and response bodies for the `Microsoft.RedHatOpenShift` resource
//! provider. Field names follow the ARM JSON casing exactly; the create body
//! matches what the Azure portal and SDKs submit for a public ARO cluster.

use serde::{Deserialize, Serialize};

use arolift_common::spec::ClusterSpec;
use arolift_common::topology::ResourceTopology;

use crate::credentials::AzureCredentials;

/// PUT body for an `openShiftClusters` create-or-update call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterCreateBody {
    /// Azure region
    pub location: String,
    /// Cluster properties
    pub properties: OpenShiftClusterProperties,
}

/// The `properties` envelope of an ARO cluster resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenShiftClusterProperties {
    pub cluster_profile: ClusterProfile,
    pub master_profile: MasterProfile,
    pub worker_profiles: Vec<WorkerProfile>,
    pub service_principal_profile: ServicePrincipalProfile,
    pub apiserver_profile: ApiserverProfile,
}

/// Cluster-wide settings: domain, version, FIPS, pull secret
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterProfile {
    pub domain: String,
    pub fips_validated_modules: String,
    pub pull_secret: String,
    pub resource_group_id: String,
    pub version: String,
}

/// Control plane placement and sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterProfile {
    pub encryption_at_host: String,
    pub subnet_id: String,
    pub vm_size: String,
}

/// Worker pool placement and sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerProfile {
    pub count: u32,
    #[serde(rename = "diskSizeGB")]
    pub disk_size_gb: u32,
    pub name: String,
    pub subnet_id: String,
    pub vm_size: String,
}

/// Service principal handed to the cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipalProfile {
    pub client_id: String,
    pub client_secret: String,
}

/// API server exposure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiserverProfile {
    pub visibility: String,
}

impl ClusterCreateBody {
    /// Build the create body from a validated spec and its derived topology.
    pub fn from_spec(
        spec: &ClusterSpec,
        topology: &ResourceTopology,
        credentials: &AzureCredentials,
    ) -> Self {
        let subscription = &credentials.subscription_id;
        Self {
            location: spec.region.clone(),
            properties: OpenShiftClusterProperties {
                cluster_profile: ClusterProfile {
                    domain: spec.domain.clone(),
                    fips_validated_modules: enabled_flag(spec.fips),
                    pull_secret: spec.pull_secret.clone(),
                    resource_group_id: topology.cluster_resource_group_id(subscription),
                    version: spec.version.clone(),
                },
                master_profile: MasterProfile {
                    encryption_at_host: "Enabled".to_string(),
                    subnet_id: topology.master_subnet_id(subscription),
                    vm_size: spec.master_vm_size.clone(),
                },
                worker_profiles: vec![WorkerProfile {
                    count: spec.workers,
                    disk_size_gb: spec.worker_disk_size_gb,
                    name: "worker".to_string(),
                    subnet_id: topology.worker_subnet_id(subscription),
                    vm_size: spec.worker_vm_size.clone(),
                }],
                service_principal_profile: ServicePrincipalProfile {
                    client_id: credentials.client_id.clone(),
                    client_secret: credentials.client_secret.clone(),
                },
                apiserver_profile: ApiserverProfile {
                    visibility: "Public".to_string(),
                },
            },
        }
    }
}

fn enabled_flag(on: bool) -> String {
    if on { "Enabled" } else { "Disabled" }.to_string()
}

/// Admin access material fetched after a successful create
#[derive(Debug, Clone, PartialEq)]
pub struct AdminCredentials {
    /// Admin kubeconfig contents (already base64-decoded)
    pub kubeconfig: String,
    /// kubeadmin user name
    pub kubeadmin_username: String,
    /// kubeadmin password
    pub kubeadmin_password: String,
}

/// Response of `listAdminCredentials`: a base64-encoded kubeconfig
#[derive(Debug, Deserialize)]
pub struct AdminKubeconfigResponse {
    /// Base64-encoded kubeconfig
    pub kubeconfig: String,
}

/// Response of `listCredentials`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeadminCredentialsResponse {
    pub kubeadmin_username: String,
    pub kubeadmin_password: String,
}

/// Response of the `openshiftversions` listing
#[derive(Debug, Deserialize)]
pub struct OpenShiftVersionList {
    /// The page of versions (pagination is not needed for this endpoint)
    pub value: Vec<OpenShiftVersionEntry>,
}

/// One entry of the `openshiftversions` listing
#[derive(Debug, Deserialize)]
pub struct OpenShiftVersionEntry {
    /// The entry's properties envelope
    pub properties: OpenShiftVersionProperties,
}

/// Properties of one supported version
#[derive(Debug, Deserialize)]
pub struct OpenShiftVersionProperties {
    /// The version string, e.g. "4.13.23"
    pub version: String,
}
