//! Error types for presentation extraction and queries.

use slidequery_ooxml::OoxmlError;
use thiserror::Error;

/// Result type for PPTX operations
pub type Result<T> = std::result::Result<T, PptxError>;

/// Errors that abort a build or a single query
///
/// Part-level problems during a build are not errors; they are collected as
/// [`crate::builder::BuildWarning`]s next to the model.
#[derive(Error, Debug)]
pub enum PptxError {
    /// Archive or root-part failure; no model is produced
    #[error("Package error: {0}")]
    Package(#[from] OoxmlError),

    /// The package has no presentation part
    #[error("No presentation part in {archive}")]
    MissingRootPart { archive: String },

    /// The presentation part or its relationships cannot be parsed
    #[error("Unreadable presentation part in {archive}: {source}")]
    RootPart {
        archive: String,
        #[source]
        source: OoxmlError,
    },

    /// Slide-query field that does not exist
    #[error("Unknown field '{name}' (valid: {})", .valid.join(", "))]
    UnknownField { name: String, valid: Vec<String> },

    /// Search or table criteria that cannot be used (bad pattern, empty range)
    #[error("Invalid criteria '{input}': {reason}")]
    InvalidCriteria { input: String, reason: String },

    /// Attribute query named an attribute that does not exist
    #[error("Unknown attribute '{name}' (valid: {})", .valid.join(", "))]
    UnknownAttribute { name: String, valid: Vec<String> },

    /// Slide number outside 1..=slide_count
    #[error("Slide number {number} out of range (valid: 1..={slide_count})")]
    SlideIndexOutOfRange { number: usize, slide_count: usize },

    /// Formatting predicate could not be parsed
    #[error("Invalid formatting predicate '{input}': {reason}")]
    InvalidPredicate { input: String, reason: String },

    /// Overview depth other than summary/detailed
    #[error("Invalid overview depth '{input}': expected 'summary' or 'detailed'")]
    InvalidDepth { input: String },

    /// TOML configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PptxError {
    /// Create an unknown attribute error listing the valid names
    pub fn unknown_attribute(name: impl Into<String>, valid: &[&str]) -> Self {
        Self::UnknownAttribute {
            name: name.into(),
            valid: valid.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Wrap a presentation-part failure with the archive it came from
    pub fn root_part(archive: impl Into<String>, source: OoxmlError) -> Self {
        Self::RootPart {
            archive: archive.into(),
            source,
        }
    }

    /// Create an unknown field error listing the valid names
    pub fn unknown_field(name: impl Into<String>, valid: &[&str]) -> Self {
        Self::UnknownField {
            name: name.into(),
            valid: valid.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create an invalid criteria error
    pub fn invalid_criteria(input: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidCriteria {
            input: input.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid predicate error
    pub fn invalid_predicate(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPredicate {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Get the error code for diagnostics
    pub fn code(&self) -> &'static str {
        match self {
            Self::Package(_) => "SQ001",
            Self::MissingRootPart { .. } => "SQ002",
            Self::UnknownAttribute { .. } => "SQ003",
            Self::SlideIndexOutOfRange { .. } => "SQ004",
            Self::InvalidPredicate { .. } => "SQ005",
            Self::InvalidDepth { .. } => "SQ006",
            Self::Config(_) => "SQ007",
            Self::Io(_) => "SQ008",
            Self::RootPart { .. } => "SQ009",
            Self::UnknownField { .. } => "SQ010",
            Self::InvalidCriteria { .. } => "SQ011",
        }
    }

    /// Whether the error concerns one query rather than the package
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownAttribute { .. }
                | Self::SlideIndexOutOfRange { .. }
                | Self::InvalidPredicate { .. }
                | Self::InvalidDepth { .. }
                | Self::UnknownField { .. }
                | Self::InvalidCriteria { .. }
        )
    }
}
