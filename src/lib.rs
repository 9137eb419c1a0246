//! depsync - dependency update engine
//!
//! This library provides:
//! - A registry of datasources that list the released versions of a package
//! - Managers that extract dependencies from manifests (Cargo.toml, go.mod,
//!   .pre-commit-config.yaml)
//! - An artifact engine that regenerates lockfiles after a manifest edit
//! - A sandbox that runs package-manager tools natively or in docker

pub mod artifacts;
pub mod cli;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod error;
pub mod exec;
pub mod fs;
pub mod git;
pub mod host_rules;
pub mod manager;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod versioning;
