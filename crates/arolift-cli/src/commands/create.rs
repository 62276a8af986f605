//! `arolift create` - provision an ARO cluster
//!
//! The spec comes from a YAML file (`--config`), flags, or both; flags win.
//! The pull secret is always read from a file: either `--pull-secret`, or
//! the pair `--registry-config`/`--docker-config`, which are merged into a
//! unified pull secret.
//!
//! # Usage
//!
//! ```bash
//! # Everything from flags
//! arolift create --name demo --version 4.13.23 --pull-secret pull-secret.txt
//!
//! # Spec from a file, worker count overridden
//! arolift create --config demo.yaml --workers 5 --pull-secret pull-secret.txt
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use arolift_common::pull_secret::{read_pull_secret, unified_pull_secret};
use arolift_common::spec::ClusterSpecFile;
use arolift_common::{Error, Result};

use super::{arolift_dir, build_lifecycle, parse_timeout, resolve_state_file};

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Path to a cluster spec YAML file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Cluster name
    #[arg(long)]
    pub name: Option<String>,

    /// Azure region
    #[arg(long)]
    pub region: Option<String>,

    /// Target ARO version
    #[arg(long)]
    pub version: Option<String>,

    /// Cluster DNS domain (defaults to the cluster name)
    #[arg(long)]
    pub domain: Option<String>,

    /// Control plane VM size
    #[arg(long)]
    pub master_vm_size: Option<String>,

    /// Worker VM size
    #[arg(long)]
    pub worker_vm_size: Option<String>,

    /// Number of worker nodes
    #[arg(long)]
    pub workers: Option<u32>,

    /// Worker OS disk size in GiB
    #[arg(long)]
    pub worker_disk_size_gb: Option<u32>,

    /// Enable FIPS validated modules
    #[arg(long)]
    pub fips: bool,

    /// Path to the pull secret file
    #[arg(long, conflicts_with_all = ["registry_config", "docker_config"])]
    pub pull_secret: Option<PathBuf>,

    /// Registry config JSON merged over --docker-config
    #[arg(long, requires = "docker_config")]
    pub registry_config: Option<PathBuf>,

    /// Docker config JSON serving as the base of the unified pull secret
    #[arg(long, requires = "registry_config")]
    pub docker_config: Option<PathBuf>,

    /// Directory for kubeconfig and kubeadmin-password
    /// (default: ~/.arolift/<name>/auth)
    #[arg(long)]
    pub auth_dir: Option<PathBuf>,

    /// State file holding cluster records
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// How long to wait for each provisioning operation
    #[arg(long, default_value = "90m", value_parser = parse_timeout)]
    pub timeout: Duration,
}

/// Run the create command
pub async fn run(args: CreateArgs) -> Result<()> {
    let pull_secret = resolve_pull_secret(&args)?;
    let spec = resolve_spec(&args, pull_secret)?;

    let auth_dir = match &args.auth_dir {
        Some(dir) => dir.clone(),
        None => arolift_dir()?.join(&spec.name).join("auth"),
    };

    let state = resolve_state_file(args.state_file.clone())?;
    let lifecycle = build_lifecycle(args.timeout, state)?;

    let handle = lifecycle.create_cluster(&spec, &auth_dir).await?;

    println!(
        "Cluster '{}' provisioned in resource group '{}'",
        handle.name, handle.resource_group
    );
    println!("Admin credentials written to {}", auth_dir.display());
    Ok(())
}

/// Merge the config file (if any) with flag overrides; flags win.
fn resolve_spec(args: &CreateArgs, pull_secret: String) -> Result<arolift_common::spec::ClusterSpec> {
    let mut overlay = match &args.config {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| {
                Error::validation(format!("failed to read {}: {e}", path.display()))
            })?;
            ClusterSpecFile::from_yaml(&content)?
        }
        None => ClusterSpecFile::default(),
    };

    if args.name.is_some() {
        overlay.name = args.name.clone();
    }
    if args.region.is_some() {
        overlay.region = args.region.clone();
    }
    if args.version.is_some() {
        overlay.version = args.version.clone();
    }
    if args.domain.is_some() {
        overlay.domain = args.domain.clone();
    }
    if args.master_vm_size.is_some() {
        overlay.master_vm_size = args.master_vm_size.clone();
    }
    if args.worker_vm_size.is_some() {
        overlay.worker_vm_size = args.worker_vm_size.clone();
    }
    if args.workers.is_some() {
        overlay.workers = args.workers;
    }
    if args.worker_disk_size_gb.is_some() {
        overlay.worker_disk_size_gb = args.worker_disk_size_gb;
    }
    if args.fips {
        overlay.fips = Some(true);
    }

    overlay.into_spec(pull_secret)
}

/// Read the pull secret from whichever source was given.
fn resolve_pull_secret(args: &CreateArgs) -> Result<String> {
    if let Some(path) = &args.pull_secret {
        return read_pull_secret(path);
    }

    if let (Some(registry), Some(docker)) = (&args.registry_config, &args.docker_config) {
        let registry = std::fs::read_to_string(registry).map_err(|e| {
            Error::validation(format!("failed to read {}: {e}", registry.display()))
        })?;
        let docker = std::fs::read_to_string(docker).map_err(|e| {
            Error::validation(format!("failed to read {}: {e}", docker.display()))
        })?;
        return unified_pull_secret(&registry, &docker);
    }

    Err(Error::validation(
        "a pull secret is required: --pull-secret, or --registry-config with --docker-config",
    ))
}
