//! `arolift list` - show clusters recorded in the state file

use std::path::PathBuf;

use clap::Args;

use arolift_common::Result;

use super::resolve_state_file;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// State file holding cluster records
    #[arg(long)]
    pub state_file: Option<PathBuf>,
}

/// Run the list command
pub fn run(args: ListArgs) -> Result<()> {
    let state = resolve_state_file(args.state_file)?;
    let clusters = state.load_all()?;

    println!(
        "{:<16} {:<12} {:<10} {:<16} {:<25}",
        "NAME", "REGION", "VERSION", "RESOURCE-GROUP", "CREATED"
    );

    for (name, record) in clusters {
        println!(
            "{:<16} {:<12} {:<10} {:<16} {:<25}",
            name,
            record.spec.region,
            record.spec.version,
            record.topology.resource_group,
            record.created_at,
        );
    }

    Ok(())
}
