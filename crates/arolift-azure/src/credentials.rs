//! Azure service principal credentials
//!
//! The service principal both authenticates the ARM calls and is handed to
//! the cluster itself (`servicePrincipalProfile`), matching how the tool has
//! always run.

/// Environment variable holding the AAD tenant ID
pub const AZURE_TENANT_ID_ENV: &str = "AZURE_TENANT_ID";
/// Environment variable holding the service principal client ID
pub const AZURE_CLIENT_ID_ENV: &str = "AZURE_CLIENT_ID";
/// Environment variable holding the service principal client secret
pub const AZURE_CLIENT_SECRET_ENV: &str = "AZURE_CLIENT_SECRET";
/// Environment variable holding the target subscription ID
pub const AZURE_SUBSCRIPTION_ID_ENV: &str = "AZURE_SUBSCRIPTION_ID";

/// Service principal credentials for ARM access
#[derive(Debug, Clone)]
pub struct AzureCredentials {
    /// AAD tenant ID
    pub tenant_id: String,
    /// Service principal client ID
    pub client_id: String,
    /// Service principal client secret
    pub client_secret: String,
    /// Subscription all resources are created under
    pub subscription_id: String,
}

impl AzureCredentials {
    /// Load credentials from the standard `AZURE_*` environment variables.
    ///
    /// Returns `None` when any variable is missing; the caller decides how
    /// loud to be about it.
    pub fn from_env() -> Option<Self> {
        Some(Self {
            tenant_id: std::env::var(AZURE_TENANT_ID_ENV).ok()?,
            client_id: std::env::var(AZURE_CLIENT_ID_ENV).ok()?,
            client_secret: std::env::var(AZURE_CLIENT_SECRET_ENV).ok()?,
            subscription_id: std::env::var(AZURE_SUBSCRIPTION_ID_ENV).ok()?,
        })
    }
}
