//! Shared types and infrastructure for the Curriculum & Regulation Portal
//! backend services.

pub mod config;
pub mod db;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{ArtifactKind, SharingMode, Visibility};
