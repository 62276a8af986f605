//! The cluster lifecycle orchestrator.
//!
//! One `ClusterLifecycle` per process invocation. Every provider call is
//! awaited to completion before the next starts; there is deliberately no
//! parallel fan-out and no shared mutable state.
//!
//! The ordering invariant that matters: the state record (spec + derived
//! topology) is persisted *before* the first mutating provider call, so a
//! crash at any later point leaves enough on disk to tear everything down.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use arolift_azure::types::AdminCredentials;
use arolift_azure::{
    AzureCredentials, ClusterCreateBody, OpenShiftClustersApi, ResourceGroupsApi,
    VirtualNetworksApi,
};
use arolift_common::spec::ClusterSpec;
use arolift_common::state::{ClusterRecord, StateFile};
use arolift_common::topology::{random_suffix, ClusterHandle, ResourceTopology};
use arolift_common::{
    retry::best_effort, Error, Result, KUBEADMIN_PASSWORD_FILE_NAME, KUBECONFIG_FILE_NAME,
};

/// Orchestrates cluster creation and teardown against injected providers.
pub struct ClusterLifecycle {
    resource_groups: Arc<dyn ResourceGroupsApi>,
    networks: Arc<dyn VirtualNetworksApi>,
    clusters: Arc<dyn OpenShiftClustersApi>,
    credentials: AzureCredentials,
    state: StateFile,
}

impl ClusterLifecycle {
    /// Assemble an orchestrator from its collaborators.
    pub fn new(
        resource_groups: Arc<dyn ResourceGroupsApi>,
        networks: Arc<dyn VirtualNetworksApi>,
        clusters: Arc<dyn OpenShiftClustersApi>,
        credentials: AzureCredentials,
        state: StateFile,
    ) -> Self {
        Self {
            resource_groups,
            networks,
            clusters,
            credentials,
            state,
        }
    }

    /// Validate a spec: local checks first, then the supported-version list.
    ///
    /// Fails fast with a descriptive error before any remote mutation; the
    /// only remote call here is the read-only version listing.
    pub async fn validate(&self, spec: &ClusterSpec) -> Result<()> {
        spec.validate_local()?;

        let versions = self
            .clusters
            .list_supported_versions(&spec.region)
            .await
            .map_err(|e| e.with_cluster(&spec.name))?;

        if !versions.iter().any(|v| v == &spec.version) {
            return Err(Error::validation_for_field(
                &spec.name,
                "version",
                format!(
                    "version {} is not offered in {} (available: {})",
                    spec.version,
                    spec.region,
                    versions.join(", ")
                ),
            ));
        }

        Ok(())
    }

    /// Create a cluster: validate, persist the state record, then run the
    /// provisioning pipeline. On a failure after the first mutating call the
    /// infrastructure created so far is torn down and the original error is
    /// returned unchanged.
    pub async fn create_cluster(
        &self,
        spec: &ClusterSpec,
        auth_dir: &Path,
    ) -> Result<ClusterHandle> {
        self.validate(spec).await?;

        let topology = ResourceTopology::derive(spec, &random_suffix());
        self.state
            .insert(&spec.name, ClusterRecord::new(spec.clone(), topology.clone()))?;
        info!(
            cluster = %spec.name,
            state = %self.state.path().display(),
            "Recorded topology; starting provisioning"
        );

        let mut cluster_created = false;
        match self.provision(spec, &topology, auth_dir, &mut cluster_created).await {
            Ok(handle) => Ok(handle),
            Err(original) => {
                warn!(
                    cluster = %spec.name,
                    error = %original,
                    "Create failed; rolling back partial infrastructure"
                );
                match self.teardown(&spec.name, &topology, cluster_created).await {
                    Ok(()) => {
                        let state = &self.state;
                        let name = spec.name.clone();
                        best_effort(1, "state-entry-remove", || {
                            let name = name.clone();
                            async move { state.remove(&name) }
                        })
                        .await;
                    }
                    Err(teardown_err) => {
                        let rollback = Error::rollback_for(&spec.name, teardown_err.to_string());
                        error!(
                            cluster = %spec.name,
                            error = %rollback,
                            "Rollback failed; residual resources left for manual cleanup"
                        );
                    }
                }
                Err(original.with_cluster(&spec.name))
            }
        }
    }

    /// Destroy a cluster recorded in the state file.
    ///
    /// Deletion order is the reverse of creation. A provider "not found" on
    /// any step means the resource is already gone and is skipped; any other
    /// error propagates immediately, keeping the state entry so the destroy
    /// can be retried.
    pub async fn destroy_cluster(&self, name: &str) -> Result<()> {
        let record = self.state.get(name)?;
        info!(cluster = %name, "Destroying cluster");

        self.teardown(name, &record.topology, true)
            .await
            .map_err(|e| e.with_cluster(name))?;

        let state = &self.state;
        let owned = name.to_string();
        best_effort(1, "state-entry-remove", || {
            let owned = owned.clone();
            async move { state.remove(&owned) }
        })
        .await;

        info!(cluster = %name, "Cluster destroyed");
        Ok(())
    }

    /// The create pipeline. `cluster_created` flips once the cluster create
    /// has been accepted, so rollback knows whether a cluster delete is due.
    async fn provision(
        &self,
        spec: &ClusterSpec,
        topology: &ResourceTopology,
        auth_dir: &Path,
        cluster_created: &mut bool,
    ) -> Result<ClusterHandle> {
        let name = &spec.name;

        info!(cluster = %name, "Creating resource group {}", topology.resource_group);
        self.resource_groups
            .create_or_update(&topology.resource_group, &spec.region)
            .await?;

        info!(cluster = %name, "Creating cluster resource group {}", topology.cluster_resource_group);
        self.resource_groups
            .create_or_update(&topology.cluster_resource_group, &spec.region)
            .await?;

        info!(cluster = %name, "Creating virtual network {}", topology.virtual_network);
        self.networks
            .create_or_update(
                &topology.resource_group,
                &topology.virtual_network,
                &spec.region,
                &topology.vnet_cidr,
            )
            .await?;

        info!(cluster = %name, "Creating master subnet {}", topology.master_subnet);
        self.networks
            .create_subnet(
                &topology.resource_group,
                &topology.virtual_network,
                &topology.master_subnet,
                &topology.master_subnet_cidr,
            )
            .await?;

        info!(cluster = %name, "Creating workers subnet {}", topology.worker_subnet);
        self.networks
            .create_subnet(
                &topology.resource_group,
                &topology.virtual_network,
                &topology.worker_subnet,
                &topology.worker_subnet_cidr,
            )
            .await?;

        info!(cluster = %name, version = %spec.version, "Creating ARO cluster");
        let body = ClusterCreateBody::from_spec(spec, topology, &self.credentials);
        let handle = self
            .clusters
            .create_or_update(&topology.resource_group, name, &body)
            .await?;
        *cluster_created = true;

        info!(cluster = %name, "Fetching admin credentials");
        let admin = self
            .clusters
            .admin_credentials(&handle.resource_group, &handle.name)
            .await?;
        write_auth_files(auth_dir, &admin)?;
        info!(
            cluster = %name,
            auth_dir = %auth_dir.display(),
            "Cluster provisioned; admin credentials written"
        );

        Ok(handle)
    }

    /// Shared teardown for destroy and rollback. Deletes in reverse creation
    /// order; `include_cluster` is false when the cluster create never got
    /// accepted.
    async fn teardown(
        &self,
        name: &str,
        topology: &ResourceTopology,
        include_cluster: bool,
    ) -> Result<()> {
        if include_cluster {
            info!(cluster = %name, "Deleting ARO cluster");
            skip_if_gone(
                name,
                "cluster",
                self.clusters.delete(&topology.resource_group, name).await,
            )?;
        }

        info!(cluster = %name, "Deleting virtual network {}", topology.virtual_network);
        skip_if_gone(
            name,
            "virtual network",
            self.networks
                .delete(&topology.resource_group, &topology.virtual_network)
                .await,
        )?;

        info!(cluster = %name, "Deleting cluster resource group {}", topology.cluster_resource_group);
        skip_if_gone(
            name,
            "cluster resource group",
            self.resource_groups
                .delete(&topology.cluster_resource_group)
                .await,
        )?;

        info!(cluster = %name, "Deleting resource group {}", topology.resource_group);
        skip_if_gone(
            name,
            "resource group",
            self.resource_groups.delete(&topology.resource_group).await,
        )?;

        Ok(())
    }
}

/// Treat "not found" as already-deleted; surface everything else.
fn skip_if_gone(cluster: &str, what: &str, result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => {
            debug!(cluster = %cluster, "{what} already gone, skipping");
            Ok(())
        }
        Err(e) => {
            error!(cluster = %cluster, step = e.step().unwrap_or("?"), error = %e, "Failed deleting {what}");
            Err(e)
        }
    }
}

/// Write the admin kubeconfig and kubeadmin password into the auth dir.
fn write_auth_files(auth_dir: &Path, admin: &AdminCredentials) -> Result<()> {
    std::fs::create_dir_all(auth_dir)?;

    let kubeconfig_path = auth_dir.join(KUBECONFIG_FILE_NAME);
    std::fs::write(&kubeconfig_path, &admin.kubeconfig)?;
    restrict_permissions(&kubeconfig_path)?;

    let password_path = auth_dir.join(KUBEADMIN_PASSWORD_FILE_NAME);
    std::fs::write(&password_path, &admin.kubeadmin_password)?;
    restrict_permissions(&password_path)?;

    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use arolift_common::spec::ClusterSpecFile;

    /// Shared call recorder plus failure injection for all three API fakes.
    #[derive(Default)]
    struct FakeAzure {
        calls: Mutex<Vec<String>>,
        versions: Vec<String>,
        /// Operations that should fail, with the HTTP status to carry
        fail_ops: std::collections::HashMap<String, Option<u16>>,
        /// Delete targets that should answer 404
        missing: HashSet<String>,
    }

    impl FakeAzure {
        fn with_versions(versions: &[&str]) -> Self {
            Self {
                versions: versions.iter().map(|v| v.to_string()).collect(),
                ..Default::default()
            }
        }

        fn failing(mut self, op: &str, status: Option<u16>) -> Self {
            self.fail_ops.insert(op.to_string(), status);
            self
        }

        fn missing(mut self, targets: &[&str]) -> Self {
            self.missing = targets.iter().map(|t| t.to_string()).collect();
            self
        }

        fn record(&self, op: &str, target: &str) -> Result<()> {
            self.calls.lock().unwrap().push(format!("{op} {target}"));
            if let Some(status) = self.fail_ops.get(op) {
                return Err(match status {
                    Some(status) => Error::provider_http(op, *status, "injected failure"),
                    None => Error::provider(op, "injected failure"),
                });
            }
            if op.ends_with("/delete") && self.missing.contains(target) {
                return Err(Error::provider_http(op, 404, "not found"));
            }
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn mutating_calls(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter(|c| !c.starts_with("cluster/versions"))
                .collect()
        }
    }

    #[async_trait]
    impl ResourceGroupsApi for FakeAzure {
        async fn create_or_update(&self, name: &str, _region: &str) -> Result<()> {
            self.record("resource-group/create", name)
        }

        async fn delete(&self, name: &str) -> Result<()> {
            self.record("resource-group/delete", name)
        }
    }

    #[async_trait]
    impl VirtualNetworksApi for FakeAzure {
        async fn create_or_update(
            &self,
            _resource_group: &str,
            name: &str,
            _region: &str,
            _address_prefix: &str,
        ) -> Result<()> {
            self.record("virtual-network/create", name)
        }

        async fn create_subnet(
            &self,
            _resource_group: &str,
            _virtual_network: &str,
            name: &str,
            address_prefix: &str,
        ) -> Result<()> {
            self.record("subnet/create", &format!("{name} {address_prefix}"))
        }

        async fn delete(&self, _resource_group: &str, name: &str) -> Result<()> {
            self.record("virtual-network/delete", name)
        }
    }

    #[async_trait]
    impl OpenShiftClustersApi for FakeAzure {
        async fn list_supported_versions(&self, region: &str) -> Result<Vec<String>> {
            self.record("cluster/versions", region)?;
            Ok(self.versions.clone())
        }

        async fn create_or_update(
            &self,
            resource_group: &str,
            name: &str,
            _body: &ClusterCreateBody,
        ) -> Result<ClusterHandle> {
            self.record("cluster/create", name)?;
            Ok(ClusterHandle {
                name: name.to_string(),
                resource_group: resource_group.to_string(),
            })
        }

        async fn delete(&self, _resource_group: &str, name: &str) -> Result<()> {
            self.record("cluster/delete", name)
        }

        async fn admin_credentials(
            &self,
            _resource_group: &str,
            name: &str,
        ) -> Result<AdminCredentials> {
            self.record("cluster/credentials", name)?;
            Ok(AdminCredentials {
                kubeconfig: "apiVersion: v1\nkind: Config\n".to_string(),
                kubeadmin_username: "kubeadmin".to_string(),
                kubeadmin_password: "hunter2".to_string(),
            })
        }
    }

    fn test_credentials() -> AzureCredentials {
        AzureCredentials {
            tenant_id: "tenant".to_string(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            subscription_id: "0000-1111".to_string(),
        }
    }

    fn demo_spec() -> ClusterSpec {
        ClusterSpecFile {
            name: Some("demo".to_string()),
            region: Some("eastus".to_string()),
            version: Some("4.13.23".to_string()),
            workers: Some(3),
            ..Default::default()
        }
        .into_spec("{\"auths\": {}}".to_string())
        .unwrap()
    }

    struct Harness {
        fake: Arc<FakeAzure>,
        lifecycle: ClusterLifecycle,
        _dir: tempfile::TempDir,
        state: StateFile,
        auth_dir: std::path::PathBuf,
    }

    fn harness(fake: FakeAzure) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let state = StateFile::new(dir.path().join("clusters.yaml"));
        let auth_dir = dir.path().join("auth");
        let fake = Arc::new(fake);
        let lifecycle = ClusterLifecycle::new(
            fake.clone(),
            fake.clone(),
            fake.clone(),
            test_credentials(),
            state.clone(),
        );
        Harness {
            fake,
            lifecycle,
            _dir: dir,
            state,
            auth_dir,
        }
    }

    /// Story: an unsupported version is rejected before anything is mutated.
    #[tokio::test]
    async fn unsupported_version_fails_before_any_mutation() {
        let h = harness(FakeAzure::with_versions(&["4.12.0", "4.12.5"]));

        let err = h
            .lifecycle
            .create_cluster(&demo_spec(), &h.auth_dir)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation { .. }));
        assert!(err.to_string().contains("4.13.23"));
        assert!(h.fake.mutating_calls().is_empty(), "no mutating call may run");
        // Nothing was persisted either
        assert!(h.state.load_all().unwrap().is_empty());
    }

    /// Story: a bad domain never even reaches the provider.
    #[tokio::test]
    async fn invalid_domain_fails_without_any_provider_call() {
        let h = harness(FakeAzure::with_versions(&["4.13.23"]));

        let mut spec = demo_spec();
        spec.domain = "1bad".to_string();

        let err = h
            .lifecycle
            .create_cluster(&spec, &h.auth_dir)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation { .. }));
        assert!(h.fake.calls().is_empty(), "not even the version list may be fetched");
    }

    /// Story: failure at the cluster-submit step unwinds the network and
    /// resource groups (no cluster delete, since nothing was accepted) and
    /// the original error comes back unchanged.
    #[tokio::test]
    async fn submit_failure_rolls_back_exactly_once() {
        let h = harness(FakeAzure::with_versions(&["4.13.23"]).failing("cluster/create", None));

        let err = h
            .lifecycle
            .create_cluster(&demo_spec(), &h.auth_dir)
            .await
            .unwrap_err();

        // Original provider error, enriched with the cluster name only
        assert_eq!(err.step(), Some("cluster/create"));
        assert_eq!(err.cluster(), Some("demo"));
        assert!(err.to_string().contains("injected failure"));

        let calls = h.fake.mutating_calls();
        let submit_idx = calls
            .iter()
            .position(|c| c.starts_with("cluster/create"))
            .expect("submit was attempted");
        let rollback = &calls[submit_idx + 1..];

        assert_eq!(rollback.len(), 3, "exactly one rollback sequence: {rollback:?}");
        assert!(rollback[0].starts_with("virtual-network/delete aro-vnet-"));
        assert_eq!(rollback[1], "resource-group/delete demo-rg");
        assert!(rollback[2].starts_with("resource-group/delete aro-rg-"));
        assert!(
            !calls.iter().any(|c| c.starts_with("cluster/delete")),
            "no cluster delete when the submit was never accepted"
        );
    }

    /// A failure after the cluster exists (credential fetch) deletes it too.
    #[tokio::test]
    async fn credential_failure_rolls_back_including_the_cluster() {
        let h = harness(FakeAzure::with_versions(&["4.13.23"]).failing("cluster/credentials", None));

        let err = h
            .lifecycle
            .create_cluster(&demo_spec(), &h.auth_dir)
            .await
            .unwrap_err();

        assert_eq!(err.step(), Some("cluster/credentials"));
        let calls = h.fake.mutating_calls();
        assert!(calls.iter().any(|c| c == "cluster/delete demo"));
    }

    /// A rollback failure is logged but never masks the original error, and
    /// the state entry survives for a manual `destroy` retry.
    #[tokio::test]
    async fn rollback_failure_does_not_mask_the_original_error() {
        let h = harness(
            FakeAzure::with_versions(&["4.13.23"])
                .failing("cluster/credentials", None)
                .failing("virtual-network/delete", Some(500)),
        );

        let err = h
            .lifecycle
            .create_cluster(&demo_spec(), &h.auth_dir)
            .await
            .unwrap_err();

        // The credentials failure comes back, not the vnet-delete 500
        assert_eq!(err.step(), Some("cluster/credentials"));
        assert!(err.to_string().contains("injected failure"));

        // Rollback was attempted (cluster delete ran, vnet delete failed)
        let calls = h.fake.calls();
        assert!(calls.iter().any(|c| c == "cluster/delete demo"));
        assert!(calls.iter().any(|c| c.starts_with("virtual-network/delete")));

        // Residual infrastructure keeps its record
        assert!(h.state.load_all().unwrap().contains_key("demo"));
    }

    /// Story: destroy tolerates resources that are already gone.
    #[tokio::test]
    async fn destroy_is_idempotent_for_missing_resources() {
        let h = harness(FakeAzure::with_versions(&["4.13.23"]));

        h.lifecycle
            .create_cluster(&demo_spec(), &h.auth_dir)
            .await
            .unwrap();

        // Simulate everything already deleted out-of-band: every delete 404s
        let record = h.state.get("demo").unwrap();
        let gone = Arc::new(FakeAzure::with_versions(&["4.13.23"]).missing(&[
            "demo",
            record.topology.virtual_network.as_str(),
            record.topology.cluster_resource_group.as_str(),
            record.topology.resource_group.as_str(),
        ]));
        let lifecycle = ClusterLifecycle::new(
            gone.clone(),
            gone.clone(),
            gone.clone(),
            test_credentials(),
            h.state.clone(),
        );

        lifecycle.destroy_cluster("demo").await.unwrap();
        assert_eq!(gone.calls().len(), 4, "all four deletes were attempted");
        assert!(h.state.load_all().unwrap().is_empty(), "state entry removed");
    }

    /// A real failure during destroy stops the pipeline and keeps the entry.
    #[tokio::test]
    async fn destroy_propagates_real_failures_and_keeps_state() {
        let h = harness(FakeAzure::with_versions(&["4.13.23"]));
        h.lifecycle
            .create_cluster(&demo_spec(), &h.auth_dir)
            .await
            .unwrap();

        let failing = Arc::new(
            FakeAzure::with_versions(&["4.13.23"]).failing("virtual-network/delete", Some(500)),
        );
        let lifecycle = ClusterLifecycle::new(
            failing.clone(),
            failing.clone(),
            failing.clone(),
            test_credentials(),
            h.state.clone(),
        );

        let err = lifecycle.destroy_cluster("demo").await.unwrap_err();
        assert_eq!(err.step(), Some("virtual-network/delete"));
        assert_eq!(err.cluster(), Some("demo"));

        let calls = failing.calls();
        assert!(calls.iter().any(|c| c.starts_with("cluster/delete")));
        assert!(
            !calls.iter().any(|c| c.starts_with("resource-group/delete")),
            "teardown stops at the failed step"
        );
        assert!(h.state.load_all().unwrap().contains_key("demo"));
    }

    /// Story: the end-to-end demo scenario. Create produces the fixed name
    /// scheme and a handle; destroy removes all four in reverse order.
    #[tokio::test]
    async fn end_to_end_create_then_destroy() {
        let h = harness(FakeAzure::with_versions(&["4.13.23", "4.14.8"]));
        let spec = demo_spec();

        let handle = h.lifecycle.create_cluster(&spec, &h.auth_dir).await.unwrap();
        assert_eq!(handle.name, "demo");
        assert!(handle.resource_group.starts_with("aro-rg-"));

        let calls = h.fake.mutating_calls();
        assert!(calls[0].starts_with("resource-group/create aro-rg-"));
        assert_eq!(calls[1], "resource-group/create demo-rg");
        assert!(calls[2].starts_with("virtual-network/create aro-vnet-"));
        assert!(calls[3].starts_with("subnet/create master-subnet-"));
        assert!(calls[4].starts_with("subnet/create workers-subnet-"));
        assert_eq!(calls[5], "cluster/create demo");
        assert_eq!(calls[6], "cluster/credentials demo");
        assert_eq!(calls.len(), 7, "exactly one call per step: {calls:?}");

        // Exactly one subnet per role, with distinct prefixes
        assert!(calls[3].contains("10.0.0.0/23"));
        assert!(calls[4].contains("10.0.2.0/23"));

        // Admin credentials landed in the auth dir
        let kubeconfig =
            std::fs::read_to_string(h.auth_dir.join(KUBECONFIG_FILE_NAME)).unwrap();
        assert!(kubeconfig.contains("kind: Config"));
        let password =
            std::fs::read_to_string(h.auth_dir.join(KUBEADMIN_PASSWORD_FILE_NAME)).unwrap();
        assert_eq!(password, "hunter2");

        // Topology survived the round trip through the state file
        let record = h.state.get("demo").unwrap();
        assert_eq!(record.spec, spec);

        h.lifecycle.destroy_cluster("demo").await.unwrap();
        let calls = h.fake.mutating_calls();
        let teardown = &calls[7..];
        assert_eq!(teardown[0], "cluster/delete demo");
        assert!(teardown[1].starts_with("virtual-network/delete aro-vnet-"));
        assert_eq!(teardown[2], "resource-group/delete demo-rg");
        assert!(teardown[3].starts_with("resource-group/delete aro-rg-"));
        assert!(h.state.load_all().unwrap().is_empty());
    }

    /// The state record is on disk before the first mutating call, so a
    /// crash mid-create can still be cleaned up.
    #[tokio::test]
    async fn topology_is_persisted_before_the_first_mutation() {
        let h = harness(
            FakeAzure::with_versions(&["4.13.23"]).failing("resource-group/create", None),
        );

        let err = h
            .lifecycle
            .create_cluster(&demo_spec(), &h.auth_dir)
            .await
            .unwrap_err();
        assert_eq!(err.step(), Some("resource-group/create"));

        // Rollback ran (deletes answered Ok) and cleared the entry; what
        // matters is that the insert happened before the failing create.
        let calls = h.fake.calls();
        assert_eq!(calls[0], "cluster/versions eastus");
        assert!(calls[1].starts_with("resource-group/create aro-rg-"));
    }
}
