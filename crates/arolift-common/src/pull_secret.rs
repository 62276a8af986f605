//! Pull secret loading and merging.
//!
//! A pull secret is a registry credential bundle of the shape
//! `{"auths": {"<registry>": {"auth": ...}, ...}}`. The unified form merges
//! a registry config's `auths` over a docker config, so clusters can pull
//! from both the OpenShift registries and a private one.

use std::path::Path;

use serde_json::Value;

use crate::{Error, Result};

/// Read pull secret contents from a file.
pub fn read_pull_secret(path: &Path) -> Result<String> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        Error::validation(format!("failed to read pull secret {}: {e}", path.display()))
    })?;
    if contents.trim().is_empty() {
        return Err(Error::validation(format!(
            "pull secret {} is empty",
            path.display()
        )));
    }
    Ok(contents)
}

/// Merge a registry config's `auths` over a docker config and return the
/// unified pull secret as a JSON string.
pub fn unified_pull_secret(registry_config: &str, docker_config: &str) -> Result<String> {
    let registry: Value = serde_json::from_str(registry_config)?;
    let mut docker: Value = serde_json::from_str(docker_config)?;

    let registry_auths = registry
        .get("auths")
        .and_then(|a| a.as_object())
        .ok_or_else(|| Error::validation("registry config has no 'auths' object"))?;
    let docker_auths = docker
        .get_mut("auths")
        .and_then(|a| a.as_object_mut())
        .ok_or_else(|| Error::validation("docker config has no 'auths' object"))?;

    for (registry_host, auth) in registry_auths {
        docker_auths.insert(registry_host.clone(), auth.clone());
    }

    Ok(docker.to_string())
}
