//! # slidequery-pptx
//!
//! Presentation model extraction and queries for PowerPoint (PPTX) files.
//!
//! This crate reads a PPTX package once, builds an in-memory presentation
//! model (slides, shapes, text runs, tables, layouts, masters, sections,
//! notes) and answers read-only queries against it.
//!
//! ## Features
//!
//! - **Fault-tolerant build**: damaged slide or layout parts become
//!   warnings instead of aborting the whole deck
//! - **Formatting inheritance**: per-run effective formatting resolved
//!   through paragraph, shape, layout, master and presentation defaults
//! - **Queries**: full extraction, attribute subsets, single slide,
//!   formatting-filtered text with per-slide offsets, formatting statistics,
//!   structural overview, slide search and table extraction
//! - **Parallel slide parsing** on the rayon pool
//!
//! ## Example
//!
//! ```rust,ignore
//! use slidequery_pptx::{Deck, ExtractorConfig, FormattingPredicate};
//!
//! let deck = Deck::open("deck.pptx", &ExtractorConfig::default())?;
//! let bold = deck.extract_formatted_text(&FormattingPredicate::Bold);
//! for run in bold.matches {
//!     println!("slide {}: {}", run.slide_number, run.text);
//! }
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod extractor;
pub mod formatted;
pub mod formatting;
pub mod layout;
mod parse;
pub mod presentation;
pub mod query;
pub mod search;
pub mod slide;
pub mod tables;
pub mod text;

// Re-exports
pub use builder::{build, BuildWarning, Extraction, WarningKind};
pub use config::{ArchiveSettings, BuildSettings, ExtractorConfig, SectionRefMode};
pub use error::{PptxError, Result};
pub use extractor::Deck;
pub use formatted::{FormattedRun, FormattedText, FormattingAnalysis, SlideFormattedText};
pub use formatting::{effective_formatting, EffectiveFormatting, FormattingPredicate, RunContext};
pub use layout::{Placeholder, PlaceholderType, SlideLayout, SlideMaster};
pub use presentation::{DocumentMetadata, Presentation, Section, SlideSize};
pub use query::{
    Attribute, AttributeReport, FullExtraction, ObjectCounts, Overview, OverviewDepth,
    QueryEngine, SlideInfo,
};
pub use search::{SlideCriteria, SlideField, SlideMatch, SlideQuery, SlideQueryResult};
pub use slide::{Geometry, OtherKind, Picture, Shape, ShapeKind, Slide, Table, TableCell};
pub use tables::{
    ColumnSelection, TableCriteria, TableData, TableExtraction, TableOutput, TableRequest,
};
pub use text::{Paragraph, Run, RunProperties, TextFrame};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Unit conversions and well-known slide sizes
pub mod constants {
    /// Default slide width in EMU (10" for 4:3)
    pub const DEFAULT_SLIDE_WIDTH_EMU: i64 = 9_144_000;

    /// Default slide height in EMU (7.5")
    pub const DEFAULT_SLIDE_HEIGHT_EMU: i64 = 6_858_000;

    /// Widescreen 16:9 slide width in EMU (13.333")
    pub const WIDESCREEN_SLIDE_WIDTH_EMU: i64 = 12_192_000;

    /// Widescreen 16:9 slide height in EMU (7.5")
    pub const WIDESCREEN_SLIDE_HEIGHT_EMU: i64 = 6_858_000;

    pub const EMU_PER_INCH: i64 = 914_400;

    pub const EMU_PER_POINT: i64 = 12_700;

    pub const EMU_PER_CM: i64 = 360_000;

    /// Run font sizes are stored in hundredths of a point
    pub const SIZE_UNITS_PER_POINT: u32 = 100;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emu_constants() {
        // 1 inch = 72 points
        assert_eq!(constants::EMU_PER_INCH, 72 * constants::EMU_PER_POINT);
        assert_eq!(constants::EMU_PER_INCH * 10, constants::DEFAULT_SLIDE_WIDTH_EMU);
    }

    #[test]
    fn test_widescreen_aspect() {
        let size = SlideSize::from_emu(
            constants::WIDESCREEN_SLIDE_WIDTH_EMU,
            constants::WIDESCREEN_SLIDE_HEIGHT_EMU,
        );
        assert_eq!(size.width_inches, 13.33);
        assert_eq!(size.height_inches, 7.5);
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
