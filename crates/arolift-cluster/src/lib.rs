//! Cluster lifecycle orchestration for arolift
//!
//! This crate sequences the provider calls that make up a cluster create
//! (resource group → cluster resource group → virtual network → subnets →
//! cluster → admin credentials) and a destroy (the reverse), with
//! rollback-on-failure for creates.
//!
//! Related crates:
//! - `arolift-azure`: the ARM-backed collaborators and their trait seams
//! - `arolift-common`: spec, topology, state file, errors

pub mod lifecycle;

pub use lifecycle::ClusterLifecycle;

pub use arolift_common::{Error, Result};
