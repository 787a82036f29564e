//! Schema versions and run metadata stamped onto checkpoints and manifests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `major.minor.patch` version of an on-disk payload layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Bumped when older readers can no longer parse the payload.
    pub major: u32,
    /// Bumped when fields are added.
    pub minor: u32,
    /// Bumped for fixes that leave the layout alone.
    pub patch: u32,
}

impl SchemaVersion {
    /// Builds a version from its three components.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Returns true when a payload written with `other` can be read by `self`.
    pub fn is_compatible_with(&self, other: &SchemaVersion) -> bool {
        self.major == other.major
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

/// Where a checkpoint or manifest came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunProvenance {
    /// SHA-256 of the JSON-encoded run configuration.
    pub input_hash: String,
    /// Seed every per-step random stream is derived from.
    pub seed: u64,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// Crate name to version for the binaries that wrote the artifact.
    pub tool_versions: BTreeMap<String, String>,
}
