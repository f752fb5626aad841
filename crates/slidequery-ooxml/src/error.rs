//! Error types for OOXML package operations

use thiserror::Error;

/// Errors that can occur while reading an OOXML package
#[derive(Error, Debug)]
pub enum OoxmlError {
    /// The file is missing, is not a ZIP container, or trips one of the
    /// archive limits
    #[error("Archive unreadable: {path}: {reason}")]
    ArchiveUnreadable { path: String, reason: String },

    /// A named entry is not present in the archive
    #[error("Entry not found in {archive}: {entry}")]
    EntryNotFound { archive: String, entry: String },

    /// XML syntax error in a part
    #[error("Malformed XML in {part}{}: {message}", offset_suffix(.offset))]
    MalformedXml {
        part: String,
        offset: Option<u64>,
        message: String,
    },

    /// A `.rels` part that is not a valid relationships document
    #[error("Malformed relationships in {part}: {reason}")]
    MalformedRelationships { part: String, reason: String },
}

impl OoxmlError {
    /// Create an archive unreadable error
    pub fn unreadable(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::ArchiveUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an entry not found error
    pub fn entry_not_found(archive: impl Into<String>, entry: impl Into<String>) -> Self {
        Self::EntryNotFound {
            archive: archive.into(),
            entry: entry.into(),
        }
    }

    /// Create a malformed relationships error
    pub fn malformed_rels(part: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRelationships {
            part: part.into(),
            reason: reason.into(),
        }
    }

    /// Name of the part this error is about, if it concerns a single part
    pub fn part(&self) -> Option<&str> {
        match self {
            Self::EntryNotFound { entry, .. } => Some(entry),
            Self::MalformedXml { part, .. } | Self::MalformedRelationships { part, .. } => {
                Some(part)
            }
            Self::ArchiveUnreadable { .. } => None,
        }
    }
}

fn offset_suffix(offset: &Option<u64>) -> String {
    match offset {
        Some(pos) => format!(" at byte {}", pos),
        None => String::new(),
    }
}

/// Result type for OOXML operations
pub type Result<T> = std::result::Result<T, OoxmlError>;
