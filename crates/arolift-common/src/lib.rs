//! Common types for arolift: cluster spec, topology, state file, and errors

#![deny(missing_docs)]

pub mod duration;
pub mod error;
pub mod pull_secret;
pub mod retry;
pub mod spec;
pub mod state;
pub mod topology;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Name of the dot directory under the user's home holding arolift state
pub const AROLIFT_DIR_NAME: &str = ".arolift";

/// File name of the cluster state (side) file inside the arolift directory
pub const STATE_FILE_NAME: &str = "clusters.yaml";

/// File name for the admin kubeconfig written into the auth directory
pub const KUBECONFIG_FILE_NAME: &str = "kubeconfig";

/// File name for the kubeadmin password written into the auth directory
pub const KUBEADMIN_PASSWORD_FILE_NAME: &str = "kubeadmin-password";
