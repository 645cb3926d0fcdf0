//! Cluster sharing: ownership checks and the replication engine

pub mod engine;
pub mod ownership;

pub use engine::{RemoveOutcome, ShareOutcome};
pub use ownership::ArtifactOwner;
