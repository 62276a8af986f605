//! Error types for arolift
//!
//! Errors are structured with fields to aid debugging in production.
//! Each variant carries contextual information such as the cluster name
//! and the provisioning step that failed.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for cluster lifecycle operations
#[derive(Debug, Error)]
pub enum Error {
    /// Spec validation error; raised before any remote mutation
    #[error("validation error for {cluster}: {message}")]
    Validation {
        /// Name of the cluster with invalid configuration
        cluster: String,
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g., "spec.domain")
        field: Option<String>,
    },

    /// Remote provider call failed (network, auth, quota, API rejection)
    #[error("provider error [{step}] for {cluster}: {message}")]
    Provider {
        /// Name of the cluster being provisioned or torn down
        cluster: String,
        /// Pipeline step that failed (e.g., "virtual-network/create")
        step: String,
        /// Description of what failed
        message: String,
        /// HTTP status code returned by the provider, when there was one
        status: Option<u16>,
        /// Whether this error is retryable
        retryable: bool,
    },

    /// A failure during automatic cleanup after a failed create
    ///
    /// Only ever logged next to the original error; rollback never masks
    /// the error that triggered it.
    #[error("rollback error for {cluster}: {message}")]
    Rollback {
        /// Name of the cluster being rolled back
        cluster: String,
        /// Description of what failed during cleanup
        message: String,
    },

    /// Credential or token acquisition error
    #[error("auth error: {message}")]
    Auth {
        /// Description of what failed
        message: String,
    },

    /// Serialization/deserialization error (YAML spec, state file, wire body)
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },

    /// Filesystem error (state file, auth directory)
    #[error("io error: {source}")]
    Io {
        /// The underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a validation error with the given message
    ///
    /// For simple validation errors without cluster context.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            cluster: UNKNOWN_CONTEXT.to_string(),
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error with cluster context
    pub fn validation_for(cluster: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            cluster: cluster.into(),
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error with cluster context and field path
    pub fn validation_for_field(
        cluster: impl Into<String>,
        field: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Validation {
            cluster: cluster.into(),
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a provider error for a pipeline step
    pub fn provider(step: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Provider {
            cluster: UNKNOWN_CONTEXT.to_string(),
            step: step.into(),
            message: msg.into(),
            status: None,
            retryable: true,
        }
    }

    /// Create a provider error carrying the HTTP status of the response
    ///
    /// 4xx statuses are not retryable (the request itself is wrong or the
    /// resource is gone); everything else is.
    pub fn provider_http(step: impl Into<String>, status: u16, msg: impl Into<String>) -> Self {
        Self::Provider {
            cluster: UNKNOWN_CONTEXT.to_string(),
            step: step.into(),
            message: msg.into(),
            status: Some(status),
            retryable: !(400..500).contains(&status),
        }
    }

    /// Create a rollback error with cluster context
    pub fn rollback_for(cluster: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Rollback {
            cluster: cluster.into(),
            message: msg.into(),
        }
    }

    /// Create an auth error with the given message
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth {
            message: msg.into(),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Attach a cluster name to an error that was created without one
    ///
    /// Used by the orchestrator to enrich errors bubbling up from the
    /// provider clients, which don't know which cluster they serve.
    pub fn with_cluster(self, name: impl Into<String>) -> Self {
        match self {
            Self::Validation {
                message, field, ..
            } => Self::Validation {
                cluster: name.into(),
                message,
                field,
            },
            Self::Provider {
                step,
                message,
                status,
                retryable,
                ..
            } => Self::Provider {
                cluster: name.into(),
                step,
                message,
                status,
                retryable,
            },
            Self::Rollback { message, .. } => Self::Rollback {
                cluster: name.into(),
                message,
            },
            other => other,
        }
    }

    /// Check if this error is retryable
    ///
    /// Validation and serialization errors are not retryable (require a
    /// config fix). Provider errors depend on the HTTP status.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Validation { .. } => false,
            Error::Provider { retryable, .. } => *retryable,
            Error::Rollback { .. } => true,
            Error::Auth { .. } => false,
            Error::Serialization { .. } => false,
            Error::Io { .. } => false,
        }
    }

    /// Check if this error is the provider saying "not found"
    ///
    /// Destroy treats a 404 on a delete as already-gone rather than fatal.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::Provider {
                status: Some(404),
                ..
            }
        )
    }

    /// Get the cluster name if this error is associated with one
    pub fn cluster(&self) -> Option<&str> {
        match self {
            Error::Validation { cluster, .. } => Some(cluster),
            Error::Provider { cluster, .. } => Some(cluster),
            Error::Rollback { cluster, .. } => Some(cluster),
            _ => None,
        }
    }

    /// Get the pipeline step if this error has one
    pub fn step(&self) -> Option<&str> {
        match self {
            Error::Provider { step, .. } => Some(step),
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::serialization(e.to_string())
    }
}
