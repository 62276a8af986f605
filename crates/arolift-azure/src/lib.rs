//! Azure Resource Manager collaborators for arolift
//!
//! This crate owns everything that talks to Azure: service principal
//! credentials, AAD token acquisition, the ARM REST client with
//! long-running-operation polling, and the three API surfaces the
//! orchestrator consumes (resource groups, virtual networks, ARO clusters).
//!
//! The API surfaces are `async_trait` traits so the orchestrator can be
//! tested against fakes without any network access.

pub mod api;
pub mod client;
pub mod credentials;
pub mod types;

pub use api::{
    ArmOpenShiftClusters, ArmResourceGroups, ArmVirtualNetworks, OpenShiftClustersApi,
    ResourceGroupsApi, VirtualNetworksApi,
};
pub use client::ArmClient;
pub use credentials::AzureCredentials;
pub use types::{AdminCredentials, ClusterCreateBody};

pub use arolift_common::{Error, Result};
