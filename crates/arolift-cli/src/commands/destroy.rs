//! `arolift destroy` - tear down a cluster recorded in the state file

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use arolift_common::Result;

use super::{build_lifecycle, parse_timeout, resolve_state_file};

#[derive(Args, Debug)]
pub struct DestroyArgs {
    /// Cluster name
    pub name: String,

    /// Skip confirmation
    #[arg(long)]
    pub yes: bool,

    /// State file holding cluster records
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// How long to wait for each deletion operation
    #[arg(long, default_value = "90m", value_parser = parse_timeout)]
    pub timeout: Duration,
}

/// Run the destroy command
pub async fn run(args: DestroyArgs) -> Result<()> {
    let state = resolve_state_file(args.state_file.clone())?;

    if !args.yes {
        let record = state.get(&args.name)?;
        println!("Destroy cluster '{}'? This will delete:", args.name);
        println!("  cluster:                {}", args.name);
        println!("  virtual network:        {}", record.topology.virtual_network);
        println!("  cluster resource group: {}", record.topology.cluster_resource_group);
        println!("  resource group:         {}", record.topology.resource_group);
        println!("\nRun with --yes to confirm");
        return Ok(());
    }

    let lifecycle = build_lifecycle(args.timeout, state)?;
    lifecycle.destroy_cluster(&args.name).await?;

    println!("Destroyed cluster '{}'", args.name);
    Ok(())
}
