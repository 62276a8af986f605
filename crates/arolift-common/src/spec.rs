//! Cluster specification and local validation.
//!
//! A [`ClusterSpec`] is the immutable description of the cluster to
//! provision. Specs can be loaded from a YAML file or assembled from CLI
//! flags via the [`ClusterSpecFile`] overlay, with defaults matching the
//! sizes the tool has always used.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default Azure region for new clusters
pub const DEFAULT_REGION: &str = "eastus";
/// Default ARO version for new clusters
pub const DEFAULT_VERSION: &str = "4.13.23";
/// Default VM size for control plane nodes
pub const DEFAULT_MASTER_VM_SIZE: &str = "Standard_D8s_v3";
/// Default VM size for worker nodes
pub const DEFAULT_WORKER_VM_SIZE: &str = "Standard_D4s_v3";
/// Default worker node count
pub const DEFAULT_WORKERS: u32 = 3;
/// Default worker OS disk size in GiB
pub const DEFAULT_WORKER_DISK_SIZE_GB: u32 = 128;
/// Default virtual network address space
pub const DEFAULT_VNET_CIDR: &str = "10.0.0.0/16";
/// Default master subnet address prefix (inside the vnet space)
pub const DEFAULT_MASTER_SUBNET_CIDR: &str = "10.0.0.0/23";
/// Default worker subnet address prefix (inside the vnet space)
pub const DEFAULT_WORKER_SUBNET_CIDR: &str = "10.0.2.0/23";

/// Allowed cluster domain names: a letter, then letters/digits/dots/dashes,
/// ending in a letter or digit, 2 to 30 characters total.
static DOMAIN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9.-]{0,28}[A-Za-z0-9]$").expect("domain pattern compiles")
});

/// Immutable description of an ARO cluster to provision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSpec {
    /// Cluster name; also the default domain
    pub name: String,
    /// Azure region (e.g., "eastus")
    pub region: String,
    /// Target ARO version; must be offered in the region
    pub version: String,
    /// Cluster DNS domain
    pub domain: String,
    /// Control plane VM size
    pub master_vm_size: String,
    /// Worker VM size
    pub worker_vm_size: String,
    /// Number of worker nodes
    pub workers: u32,
    /// Worker OS disk size in GiB
    pub worker_disk_size_gb: u32,
    /// Virtual network address space
    pub vnet_cidr: String,
    /// Master subnet address prefix
    pub master_subnet_cidr: String,
    /// Worker subnet address prefix
    pub worker_subnet_cidr: String,
    /// Whether FIPS validated modules are enabled on the cluster
    pub fips: bool,
    /// Pull secret contents (registry credential bundle)
    pub pull_secret: String,
}

impl ClusterSpec {
    /// Run the local (offline) validation checks.
    ///
    /// The supported-version check needs the provider and lives in the
    /// orchestrator; everything here must hold before any remote call.
    pub fn validate_local(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::validation_for_field(
                &self.name,
                "name",
                "cluster name must not be empty",
            ));
        }
        if !DOMAIN_PATTERN.is_match(&self.domain) {
            return Err(Error::validation_for_field(
                &self.name,
                "domain",
                format!(
                    "domain '{}' is invalid: must start with a letter, contain only \
                     letters, digits, dots, and dashes, end with a letter or digit, \
                     and be at most 30 characters",
                    self.domain
                ),
            ));
        }
        if self.workers == 0 {
            return Err(Error::validation_for_field(
                &self.name,
                "workers",
                "at least one worker node is required",
            ));
        }
        if self.pull_secret.trim().is_empty() {
            return Err(Error::validation_for_field(
                &self.name,
                "pull_secret",
                "pull secret must not be empty",
            ));
        }
        Ok(())
    }
}

/// Partial cluster spec as read from a YAML file or assembled from flags.
///
/// Every field is optional; [`ClusterSpecFile::into_spec`] fills defaults
/// and is the single place where a complete [`ClusterSpec`] is born.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterSpecFile {
    /// Cluster name (required at resolution time)
    pub name: Option<String>,
    /// Azure region
    pub region: Option<String>,
    /// Target ARO version
    pub version: Option<String>,
    /// Cluster DNS domain; defaults to the cluster name
    pub domain: Option<String>,
    /// Control plane VM size
    pub master_vm_size: Option<String>,
    /// Worker VM size
    pub worker_vm_size: Option<String>,
    /// Number of worker nodes
    pub workers: Option<u32>,
    /// Worker OS disk size in GiB
    pub worker_disk_size_gb: Option<u32>,
    /// Virtual network address space
    pub vnet_cidr: Option<String>,
    /// Master subnet address prefix
    pub master_subnet_cidr: Option<String>,
    /// Worker subnet address prefix
    pub worker_subnet_cidr: Option<String>,
    /// Whether FIPS validated modules are enabled
    pub fips: Option<bool>,
}

impl ClusterSpecFile {
    /// Parse a spec overlay from YAML.
    pub fn from_yaml(input: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(input)?)
    }

    /// Resolve the overlay into a complete [`ClusterSpec`].
    ///
    /// The pull secret comes in separately because it is always read from a
    /// file rather than inlined in spec YAML.
    pub fn into_spec(self, pull_secret: String) -> Result<ClusterSpec> {
        let name = self
            .name
            .ok_or_else(|| Error::validation("cluster name is required (--name or config file)"))?;
        let domain = self.domain.unwrap_or_else(|| name.clone());

        Ok(ClusterSpec {
            domain,
            region: self.region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
            version: self.version.unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            master_vm_size: self
                .master_vm_size
                .unwrap_or_else(|| DEFAULT_MASTER_VM_SIZE.to_string()),
            worker_vm_size: self
                .worker_vm_size
                .unwrap_or_else(|| DEFAULT_WORKER_VM_SIZE.to_string()),
            workers: self.workers.unwrap_or(DEFAULT_WORKERS),
            worker_disk_size_gb: self
                .worker_disk_size_gb
                .unwrap_or(DEFAULT_WORKER_DISK_SIZE_GB),
            vnet_cidr: self.vnet_cidr.unwrap_or_else(|| DEFAULT_VNET_CIDR.to_string()),
            master_subnet_cidr: self
                .master_subnet_cidr
                .unwrap_or_else(|| DEFAULT_MASTER_SUBNET_CIDR.to_string()),
            worker_subnet_cidr: self
                .worker_subnet_cidr
                .unwrap_or_else(|| DEFAULT_WORKER_SUBNET_CIDR.to_string()),
            fips: self.fips.unwrap_or(false),
            pull_secret,
            name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_with_domain(domain: &str) -> ClusterSpec {
        ClusterSpecFile {
            name: Some("demo".to_string()),
            domain: Some(domain.to_string()),
            ..Default::default()
        }
        .into_spec("{\"auths\": {}}".to_string())
        .unwrap()
    }

    #[test]
    fn valid_domains_pass() {
        for domain in ["msi-aro-ab12", "demo", "a1", "web.prod.example"] {
            assert!(
                spec_with_domain(domain).validate_local().is_ok(),
                "expected '{domain}' to validate"
            );
        }
    }

    #[test]
    fn invalid_domains_fail() {
        let too_long = "a".repeat(31);
        for domain in ["1bad", "ok$", too_long.as_str(), "", "x", "ends."] {
            let err = spec_with_domain(domain).validate_local().unwrap_err();
            match err {
                Error::Validation { field, .. } => {
                    assert_eq!(field.as_deref(), Some("domain"), "domain '{domain}'")
                }
                other => panic!("expected validation error for '{domain}', got {other}"),
            }
        }
    }

    #[test]
    fn thirty_char_domain_is_the_limit() {
        let max = format!("a{}", "b".repeat(29));
        assert_eq!(max.len(), 30);
        assert!(spec_with_domain(&max).validate_local().is_ok());
    }

    #[test]
    fn zero_workers_rejected() {
        let spec = ClusterSpecFile {
            name: Some("demo".to_string()),
            workers: Some(0),
            ..Default::default()
        }
        .into_spec("secret".to_string())
        .unwrap();
        assert!(spec.validate_local().is_err());
    }

    #[test]
    fn empty_pull_secret_rejected() {
        let spec = ClusterSpecFile {
            name: Some("demo".to_string()),
            ..Default::default()
        }
        .into_spec("  ".to_string())
        .unwrap();
        assert!(spec.validate_local().is_err());
    }

    #[test]
    fn defaults_match_the_original_tool() {
        let spec = ClusterSpecFile {
            name: Some("demo".to_string()),
            ..Default::default()
        }
        .into_spec("secret".to_string())
        .unwrap();

        assert_eq!(spec.region, "eastus");
        assert_eq!(spec.master_vm_size, "Standard_D8s_v3");
        assert_eq!(spec.worker_vm_size, "Standard_D4s_v3");
        assert_eq!(spec.workers, 3);
        assert_eq!(spec.worker_disk_size_gb, 128);
        assert_eq!(spec.vnet_cidr, "10.0.0.0/16");
        assert_eq!(spec.domain, "demo");
        assert!(!spec.fips);
    }

    #[test]
    fn yaml_overlay_round_trip() {
        let yaml = r#"
name: demo
region: westeurope
version: 4.14.8
workers: 5
fips: true
"#;
        let spec = ClusterSpecFile::from_yaml(yaml)
            .unwrap()
            .into_spec("secret".to_string())
            .unwrap();

        assert_eq!(spec.name, "demo");
        assert_eq!(spec.region, "westeurope");
        assert_eq!(spec.version, "4.14.8");
        assert_eq!(spec.workers, 5);
        assert!(spec.fips);
        // Unset fields still get defaults
        assert_eq!(spec.worker_vm_size, "Standard_D4s_v3");
    }

    #[test]
    fn missing_name_is_an_error() {
        let err = ClusterSpecFile::default()
            .into_spec("secret".to_string())
            .unwrap_err();
        assert!(err.to_string().contains("name is required"));
    }
}
