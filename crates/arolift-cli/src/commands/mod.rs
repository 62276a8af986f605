//! CLI commands

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use arolift_azure::{
    ArmClient, ArmOpenShiftClusters, ArmResourceGroups, ArmVirtualNetworks, AzureCredentials,
};
use arolift_cluster::ClusterLifecycle;
use arolift_common::duration::parse_duration;
use arolift_common::state::StateFile;
use arolift_common::{Error, Result, AROLIFT_DIR_NAME, STATE_FILE_NAME};

pub mod create;
pub mod destroy;
pub mod list;
pub mod versions;

/// Returns `~/.arolift/`, creating it if it doesn't exist.
pub fn arolift_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| Error::validation("could not determine home directory"))?;
    let dir = home.join(AROLIFT_DIR_NAME);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

/// The state file to use: `--state-file` if given, `~/.arolift/clusters.yaml`
/// otherwise.
pub fn resolve_state_file(flag: Option<PathBuf>) -> Result<StateFile> {
    let path = match flag {
        Some(path) => path,
        None => arolift_dir()?.join(STATE_FILE_NAME),
    };
    tracing::debug!("Using state file {}", path.display());
    Ok(StateFile::new(path))
}

/// clap value parser for `--timeout` duration strings.
pub fn parse_timeout(input: &str) -> std::result::Result<Duration, String> {
    parse_duration(input).map_err(|e| e.to_string())
}

/// Load service principal credentials or explain which variables are needed.
pub fn load_credentials() -> Result<AzureCredentials> {
    AzureCredentials::from_env().ok_or_else(|| {
        Error::auth(
            "missing Azure credentials: set AZURE_TENANT_ID, AZURE_CLIENT_ID, \
             AZURE_CLIENT_SECRET, and AZURE_SUBSCRIPTION_ID",
        )
    })
}

/// Build the ARM-backed orchestrator used by create and destroy.
pub fn build_lifecycle(operation_timeout: Duration, state: StateFile) -> Result<ClusterLifecycle> {
    let credentials = load_credentials()?;
    let arm = Arc::new(ArmClient::new(credentials.clone(), operation_timeout)?);

    Ok(ClusterLifecycle::new(
        Arc::new(ArmResourceGroups::new(arm.clone())),
        Arc::new(ArmVirtualNetworks::new(arm.clone())),
        Arc::new(ArmOpenShiftClusters::new(arm)),
        credentials,
        state,
    ))
}
