//! arolift CLI library

pub mod commands;

pub use arolift_common::{Error, Result};

use clap::{Parser, Subcommand};

/// arolift - Azure Red Hat OpenShift cluster lifecycle
#[derive(Parser, Debug)]
#[command(name = "arolift")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision a cluster (resource group, network, subnets, cluster)
    Create(commands::create::CreateArgs),
    /// Tear down a cluster recorded in the state file
    Destroy(commands::destroy::DestroyArgs),
    /// List clusters recorded in the state file
    List(commands::list::ListArgs),
    /// List ARO versions supported in a region
    Versions(commands::versions::VersionsArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Create(args) => commands::create::run(args).await,
            Commands::Destroy(args) => commands::destroy::run(args).await,
            Commands::List(args) => commands::list::run(args),
            Commands::Versions(args) => commands::versions::run(args).await,
        }
    }
}
