//! Extraction configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! [archive]
//! max_entries = 10000
//! max_file_size_mb = 100
//! max_part_size_mb = 64
//!
//! [build]
//! parallel = true
//! section_refs = "auto"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use slidequery_ooxml::ArchiveLimits;

use crate::error::Result;

const MIB: u64 = 1024 * 1024;

/// How section slide references are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SectionRefMode {
    /// `r:id` against the presentation part's relationships when present,
    /// otherwise the numeric slide `id`
    #[default]
    Auto,
    /// Only `r:id`, scoped to the presentation part
    RelationshipId,
    /// Only the numeric slide `id` from the slide list
    SlideId,
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Archive-bomb guards
    pub archive: ArchiveSettings,
    /// Model builder settings
    pub build: BuildSettings,
}

impl ExtractorConfig {
    /// Parse settings from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Load settings from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Archive limits derived from the archive settings
    pub fn limits(&self) -> ArchiveLimits {
        self.archive.limits()
    }
}

/// Archive limit settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveSettings {
    /// Maximum number of entries in the ZIP central directory
    pub max_entries: usize,
    /// Maximum archive size on disk, in MiB
    pub max_file_size_mb: u64,
    /// Maximum inflated size of one part, in MiB
    pub max_part_size_mb: u64,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        let limits = ArchiveLimits::default();
        Self {
            max_entries: limits.max_entries,
            max_file_size_mb: limits.max_file_size / MIB,
            max_part_size_mb: limits.max_entry_size / MIB,
        }
    }
}

impl ArchiveSettings {
    pub fn limits(&self) -> ArchiveLimits {
        ArchiveLimits {
            max_entries: self.max_entries,
            max_file_size: self.max_file_size_mb.saturating_mul(MIB),
            max_entry_size: self.max_part_size_mb.saturating_mul(MIB),
        }
    }
}

/// Model builder settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Parse slide parts on the rayon thread pool
    pub parallel: bool,
    /// Section reference resolution mode
    pub section_refs: SectionRefMode,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            parallel: true,
            section_refs: SectionRefMode::Auto,
        }
    }
}
