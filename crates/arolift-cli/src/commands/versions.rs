//! `arolift versions` - list ARO versions supported in a region

use std::sync::Arc;
use std::time::Duration;

use clap::Args;

use arolift_azure::{ArmClient, ArmOpenShiftClusters, OpenShiftClustersApi};
use arolift_common::spec::DEFAULT_REGION;
use arolift_common::Result;

use super::load_credentials;

#[derive(Args, Debug)]
pub struct VersionsArgs {
    /// Azure region to query
    #[arg(long, default_value = DEFAULT_REGION)]
    pub region: String,
}

/// Run the versions command
pub async fn run(args: VersionsArgs) -> Result<()> {
    let credentials = load_credentials()?;
    let arm = Arc::new(ArmClient::new(credentials, Duration::from_secs(60))?);
    let clusters = ArmOpenShiftClusters::new(arm);

    let mut versions = clusters.list_supported_versions(&args.region).await?;
    versions.sort();

    if versions.is_empty() {
        println!("No ARO versions offered in {}", args.region);
        return Ok(());
    }

    for version in versions {
        println!("{version}");
    }
    Ok(())
}
