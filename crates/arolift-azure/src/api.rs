//! Provider API surfaces
//!
//! The three collaborator seams the orchestrator depends on, as
//! `async_trait` traits, plus their ARM-backed implementations. Tests of
//! the orchestrator substitute fakes for these traits; nothing above this
//! module knows about HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;

use arolift_common::topology::ClusterHandle;
use arolift_common::{Error, Result};

use crate::client::ArmClient;
use crate::types::{
    AdminCredentials, AdminKubeconfigResponse, ClusterCreateBody, KubeadminCredentialsResponse,
    OpenShiftVersionList,
};

/// API version for `Microsoft.Resources` resource groups
pub const RESOURCE_API_VERSION: &str = "2021-04-01";
/// API version for `Microsoft.Network` virtual networks and subnets
pub const NETWORK_API_VERSION: &str = "2023-09-01";
/// API version for `Microsoft.RedHatOpenShift` clusters
pub const ARO_API_VERSION: &str = "2023-11-22";

/// Resource group lifecycle operations
#[async_trait]
pub trait ResourceGroupsApi: Send + Sync {
    /// Create or update a resource group in the given region.
    async fn create_or_update(&self, name: &str, region: &str) -> Result<()>;

    /// Delete a resource group and everything in it.
    async fn delete(&self, name: &str) -> Result<()>;
}

/// Virtual network and subnet lifecycle operations
#[async_trait]
pub trait VirtualNetworksApi: Send + Sync {
    /// Create or update a virtual network with the given address space.
    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        region: &str,
        address_prefix: &str,
    ) -> Result<()>;

    /// Create or update one subnet inside an existing virtual network.
    async fn create_subnet(
        &self,
        resource_group: &str,
        virtual_network: &str,
        name: &str,
        address_prefix: &str,
    ) -> Result<()>;

    /// Delete a virtual network (subnets go with it).
    async fn delete(&self, resource_group: &str, name: &str) -> Result<()>;
}

/// ARO cluster lifecycle operations
#[async_trait]
pub trait OpenShiftClustersApi: Send + Sync {
    /// Versions the resource provider offers in a region.
    async fn list_supported_versions(&self, region: &str) -> Result<Vec<String>>;

    /// Submit a cluster create and wait until the provider reports done.
    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        body: &ClusterCreateBody,
    ) -> Result<ClusterHandle>;

    /// Delete a cluster and wait for completion.
    async fn delete(&self, resource_group: &str, name: &str) -> Result<()>;

    /// Fetch the admin kubeconfig and kubeadmin credentials.
    async fn admin_credentials(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<AdminCredentials>;
}

/// `Microsoft.Resources` implementation of [`ResourceGroupsApi`]
pub struct ArmResourceGroups {
    arm: Arc<ArmClient>,
}

impl ArmResourceGroups {
    /// Wrap an ARM client.
    pub fn new(arm: Arc<ArmClient>) -> Self {
        Self { arm }
    }

    fn path(&self, name: &str) -> String {
        format!(
            "/subscriptions/{}/resourcegroups/{name}",
            self.arm.subscription_id()
        )
    }
}

#[async_trait]
impl ResourceGroupsApi for ArmResourceGroups {
    async fn create_or_update(&self, name: &str, region: &str) -> Result<()> {
        self.arm
            .put(
                "resource-group/create",
                &self.path(name),
                RESOURCE_API_VERSION,
                &json!({ "location": region }),
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.arm
            .delete("resource-group/delete", &self.path(name), RESOURCE_API_VERSION)
            .await
    }
}

/// `Microsoft.Network` implementation of [`VirtualNetworksApi`]
pub struct ArmVirtualNetworks {
    arm: Arc<ArmClient>,
}

impl ArmVirtualNetworks {
    /// Wrap an ARM client.
    pub fn new(arm: Arc<ArmClient>) -> Self {
        Self { arm }
    }

    fn vnet_path(&self, resource_group: &str, name: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{resource_group}/providers/Microsoft.Network/virtualNetworks/{name}",
            self.arm.subscription_id()
        )
    }
}

#[async_trait]
impl VirtualNetworksApi for ArmVirtualNetworks {
    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        region: &str,
        address_prefix: &str,
    ) -> Result<()> {
        let body = json!({
            "location": region,
            "properties": {
                "addressSpace": { "addressPrefixes": [address_prefix] }
            }
        });
        self.arm
            .put(
                "virtual-network/create",
                &self.vnet_path(resource_group, name),
                NETWORK_API_VERSION,
                &body,
            )
            .await?;
        Ok(())
    }

    async fn create_subnet(
        &self,
        resource_group: &str,
        virtual_network: &str,
        name: &str,
        address_prefix: &str,
    ) -> Result<()> {
        let path = format!(
            "{}/subnets/{name}",
            self.vnet_path(resource_group, virtual_network)
        );
        let body = json!({
            "properties": { "addressPrefix": address_prefix }
        });
        self.arm
            .put("subnet/create", &path, NETWORK_API_VERSION, &body)
            .await?;
        Ok(())
    }

    async fn delete(&self, resource_group: &str, name: &str) -> Result<()> {
        self.arm
            .delete(
                "virtual-network/delete",
                &self.vnet_path(resource_group, name),
                NETWORK_API_VERSION,
            )
            .await
    }
}

/// `Microsoft.RedHatOpenShift` implementation of [`OpenShiftClustersApi`]
pub struct ArmOpenShiftClusters {
    arm: Arc<ArmClient>,
}

impl ArmOpenShiftClusters {
    /// Wrap an ARM client.
    pub fn new(arm: Arc<ArmClient>) -> Self {
        Self { arm }
    }

    fn cluster_path(&self, resource_group: &str, name: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{resource_group}/providers/Microsoft.RedHatOpenShift/openShiftClusters/{name}",
            self.arm.subscription_id()
        )
    }
}

#[async_trait]
impl OpenShiftClustersApi for ArmOpenShiftClusters {
    async fn list_supported_versions(&self, region: &str) -> Result<Vec<String>> {
        let path = format!(
            "/subscriptions/{}/providers/Microsoft.RedHatOpenShift/locations/{region}/openshiftversions",
            self.arm.subscription_id()
        );
        let body = self
            .arm
            .get("cluster/versions", &path, ARO_API_VERSION)
            .await?;
        let list: OpenShiftVersionList = serde_json::from_value(body)?;
        Ok(list.value.into_iter().map(|v| v.properties.version).collect())
    }

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        body: &ClusterCreateBody,
    ) -> Result<ClusterHandle> {
        let payload = serde_json::to_value(body)?;
        self.arm
            .put(
                "cluster/create",
                &self.cluster_path(resource_group, name),
                ARO_API_VERSION,
                &payload,
            )
            .await?;
        Ok(ClusterHandle {
            name: name.to_string(),
            resource_group: resource_group.to_string(),
        })
    }

    async fn delete(&self, resource_group: &str, name: &str) -> Result<()> {
        self.arm
            .delete(
                "cluster/delete",
                &self.cluster_path(resource_group, name),
                ARO_API_VERSION,
            )
            .await
    }

    async fn admin_credentials(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<AdminCredentials> {
        let base = self.cluster_path(resource_group, name);

        let kubeconfig_body = self
            .arm
            .post(
                "cluster/credentials",
                &format!("{base}/listAdminCredentials"),
                ARO_API_VERSION,
            )
            .await?;
        let encoded: AdminKubeconfigResponse = serde_json::from_value(kubeconfig_body)?;
        let kubeconfig = decode_kubeconfig(&encoded.kubeconfig)?;

        let password_body = self
            .arm
            .post(
                "cluster/credentials",
                &format!("{base}/listCredentials"),
                ARO_API_VERSION,
            )
            .await?;
        let kubeadmin: KubeadminCredentialsResponse = serde_json::from_value(password_body)?;

        Ok(AdminCredentials {
            kubeconfig,
            kubeadmin_username: kubeadmin.kubeadmin_username,
            kubeadmin_password: kubeadmin.kubeadmin_password,
        })
    }
}

/// Decode the base64 kubeconfig the ARO API returns.
fn decode_kubeconfig(encoded: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| Error::serialization(format!("kubeconfig is not valid base64: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| Error::serialization(format!("kubeconfig is not valid UTF-8: {e}")))
}
