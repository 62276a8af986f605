//! Cluster state (side) file.
//!
//! A YAML document keyed by cluster name, holding the spec and the derived
//! resource topology. The record is written before any mutating provider
//! call so that a crash mid-create still leaves enough information to tear
//! the cluster down, and destroy never has to re-derive random suffixes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::spec::ClusterSpec;
use crate::topology::ResourceTopology;
use crate::{Error, Result};

/// One persisted cluster entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRecord {
    /// The validated spec the cluster was created from
    pub spec: ClusterSpec,
    /// The derived Azure resource names
    pub topology: ResourceTopology,
    /// ISO 8601 timestamp of when creation started
    pub created_at: String,
}

impl ClusterRecord {
    /// Build a record stamped with the current time.
    pub fn new(spec: ClusterSpec, topology: ResourceTopology) -> Self {
        Self {
            spec,
            topology,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Handle to the on-disk state file.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    /// Create a handle for the given path. Nothing is read until needed.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all records. A missing file is an empty map, not an error.
    pub fn load_all(&self) -> Result<BTreeMap<String, ClusterRecord>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Load a single record by cluster name.
    pub fn get(&self, name: &str) -> Result<ClusterRecord> {
        self.load_all()?.remove(name).ok_or_else(|| {
            Error::validation_for(
                name,
                format!(
                    "no state entry for cluster '{}' in {}",
                    name,
                    self.path.display()
                ),
            )
        })
    }

    /// Insert (or replace) a record and write the file back out.
    pub fn insert(&self, name: &str, record: ClusterRecord) -> Result<()> {
        let mut all = self.load_all()?;
        all.insert(name.to_string(), record);
        self.write(&all)
    }

    /// Remove a record; writing the file back only if the entry existed.
    pub fn remove(&self, name: &str) -> Result<()> {
        let mut all = self.load_all()?;
        if all.remove(name).is_some() {
            self.write(&all)?;
            debug!(cluster = %name, path = %self.path.display(), "Removed state entry");
        }
        Ok(())
    }

    fn write(&self, all: &BTreeMap<String, ClusterRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_yaml::to_string(all)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ClusterSpecFile;
    use crate::topology::random_suffix;

    fn demo_record() -> ClusterRecord {
        let spec = ClusterSpecFile {
            name: Some("demo".to_string()),
            ..Default::default()
        }
        .into_spec("secret".to_string())
        .unwrap();
        let topology = ResourceTopology::derive(&spec, &random_suffix());
        ClusterRecord::new(spec, topology)
    }

    #[test]
    fn round_trip_without_the_original_seed() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateFile::new(dir.path().join("clusters.yaml"));

        let record = demo_record();
        state.insert("demo", record.clone()).unwrap();

        // Destroy-side read: the topology comes back exactly, no randomness needed
        let loaded = state.get("demo").unwrap();
        assert_eq!(loaded.topology, record.topology);
        assert_eq!(loaded.spec, record.spec);
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateFile::new(dir.path().join("nope/clusters.yaml"));
        assert!(state.load_all().unwrap().is_empty());
    }

    #[test]
    fn unknown_cluster_is_a_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateFile::new(dir.path().join("clusters.yaml"));
        let err = state.get("ghost").unwrap_err();
        assert!(err.to_string().contains("ghost"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn remove_deletes_only_the_named_entry() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateFile::new(dir.path().join("clusters.yaml"));

        state.insert("one", demo_record()).unwrap();
        state.insert("two", demo_record()).unwrap();
        state.remove("one").unwrap();

        let all = state.load_all().unwrap();
        assert!(!all.contains_key("one"));
        assert!(all.contains_key("two"));

        // Removing a nonexistent entry is not an error
        state.remove("one").unwrap();
    }
}
