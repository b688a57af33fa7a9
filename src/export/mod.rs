//! Artifact export
//!
//! Writing and reading the fitted pipeline and its metadata record.

mod artifact;

pub use artifact::{
    check_writable, load_artifact, persist_artifacts, Artifact, ArtifactMetadata,
};
