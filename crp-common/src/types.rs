//! Shared vocabulary for the cluster-sharing subsystem
//!
//! Artifact kinds are decoded once at the HTTP edge; everything below the
//! API boundary dispatches on these enums rather than raw strings.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kinds of artifact the sharing system can replicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Mission,
    Peos,
    Pos,
    Psos,
    Semester,
    Course,
}

impl ArtifactKind {
    /// All kinds, text kinds first
    pub const ALL: [ArtifactKind; 6] = [
        ArtifactKind::Mission,
        ArtifactKind::Peos,
        ArtifactKind::Pos,
        ArtifactKind::Psos,
        ArtifactKind::Semester,
        ArtifactKind::Course,
    ];

    /// The four ordered-text-list kinds share one physical layout
    pub fn is_text(self) -> bool {
        matches!(
            self,
            ArtifactKind::Mission | ArtifactKind::Peos | ArtifactKind::Pos | ArtifactKind::Psos
        )
    }

    /// Physical table holding rows of this kind (text kinds only for
    /// mission/peos/pos/psos; semester and course have dedicated modules)
    pub fn table_name(self) -> &'static str {
        match self {
            ArtifactKind::Mission => "department_mission",
            ArtifactKind::Peos => "department_peos",
            ArtifactKind::Pos => "department_pos",
            ArtifactKind::Psos => "department_psos",
            ArtifactKind::Semester => "semesters",
            ArtifactKind::Course => "courses",
        }
    }

    /// Wire label used in URLs, request bodies and the provenance ledger
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Mission => "mission",
            ArtifactKind::Peos => "peos",
            ArtifactKind::Pos => "pos",
            ArtifactKind::Psos => "psos",
            ArtifactKind::Semester => "semester",
            ArtifactKind::Course => "course",
        }
    }
}

impl FromStr for ArtifactKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mission" => Ok(ArtifactKind::Mission),
            "peos" => Ok(ArtifactKind::Peos),
            "pos" => Ok(ArtifactKind::Pos),
            "psos" => Ok(ArtifactKind::Psos),
            "semester" => Ok(ArtifactKind::Semester),
            "course" => Ok(ArtifactKind::Course),
            other => Err(Error::InvalidInput(format!("unknown item type: {}", other))),
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visibility of an artifact row
///
/// `Unique` rows exist only in their owning department; `Cluster` rows have
/// been materialized into peer departments and are tracked in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    Unique,
    Cluster,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Unique => "UNIQUE",
            Visibility::Cluster => "CLUSTER",
        }
    }
}

impl FromStr for Visibility {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "UNIQUE" => Ok(Visibility::Unique),
            "CLUSTER" => Ok(Visibility::Cluster),
            other => Err(Error::InvalidInput(format!(
                "invalid visibility value: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a visibility toggle interprets its target list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharingMode {
    /// Replace the recipient set (default)
    Replace,
    /// Extend the recipient set with new targets only
    Add,
    /// Remove the named targets from the recipient set
    Remove,
}

impl Default for SharingMode {
    fn default() -> Self {
        SharingMode::Replace
    }
}
