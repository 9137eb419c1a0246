//! Core domain models for depsync
//!
//! This module contains the fundamental types passed between the subsystems:
//! - Datasource identifiers
//! - Dependency descriptors produced by manager extraction
//! - Lookup requests and release results exchanged with datasources
//! - Artifact update configuration and outcomes

mod artifact;
mod datasource_id;
mod dependency;
mod lookup;
mod release;

pub use artifact::{
    ArtifactFailure, ArtifactOutcome, LockfileUpdate, UpdateArtifactsConfig, UpdateType,
};
pub use datasource_id::DatasourceId;
pub use dependency::{DepType, DependencyDescriptor, ManagerExtractResult};
pub use lookup::{HostCredentials, LookupRequest};
pub use release::{ReleaseRecord, ReleaseResult};
