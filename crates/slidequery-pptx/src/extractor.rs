//! Deck facade
//!
//! A [`Deck`] owns a built presentation model together with the warnings
//! recorded while building it. The archive is read once at open time; every
//! query afterwards runs against the in-memory model only.
//!
//! ```rust,ignore
//! use slidequery_pptx::{Deck, ExtractorConfig, OverviewDepth};
//!
//! let deck = Deck::open("quarterly.pptx", &ExtractorConfig::default())?;
//! let overview = deck.get_overview(OverviewDepth::Detailed);
//! println!("{} slides", overview.slide_count);
//! ```

use std::io::{Read, Seek};
use std::path::Path;

use slidequery_ooxml::OoxmlArchive;
use tracing::debug;

use crate::builder::{build, BuildWarning, Extraction};
use crate::config::ExtractorConfig;
use crate::error::Result;
use crate::formatted::{FormattedText, FormattingAnalysis};
use crate::formatting::FormattingPredicate;
use crate::presentation::Presentation;
use crate::query::{
    Attribute, AttributeReport, FullExtraction, Overview, OverviewDepth, QueryEngine, SlideInfo,
};
use crate::search::{SlideQuery, SlideQueryResult};
use crate::tables::{TableExtraction, TableRequest};

/// A loaded presentation ready for queries
#[derive(Debug, Clone)]
pub struct Deck {
    label: String,
    presentation: Presentation,
    warnings: Vec<BuildWarning>,
}

impl Deck {
    /// Open and build a presentation file
    pub fn open<P: AsRef<Path>>(path: P, config: &ExtractorConfig) -> Result<Self> {
        let path = path.as_ref();
        let mut archive = OoxmlArchive::open_with_limits(path, config.limits())?;
        Self::from_archive(&mut archive, config)
    }

    /// Build from any seekable reader, e.g. an in-memory buffer
    pub fn from_reader<R: Read + Seek>(
        reader: R,
        label: impl Into<String>,
        config: &ExtractorConfig,
    ) -> Result<Self> {
        let mut archive = OoxmlArchive::from_reader(reader, label, config.limits())?;
        Self::from_archive(&mut archive, config)
    }

    /// Build from an already opened archive
    pub fn from_archive<R: Read + Seek>(
        archive: &mut OoxmlArchive<R>,
        config: &ExtractorConfig,
    ) -> Result<Self> {
        let Extraction {
            presentation,
            warnings,
        } = build(archive, &config.build)?;
        debug!(
            archive = archive.label(),
            slides = presentation.slide_count(),
            warnings = warnings.len(),
            "deck ready"
        );

        Ok(Self {
            label: archive.label().to_string(),
            presentation,
            warnings,
        })
    }

    /// Wrap an existing model
    pub fn from_presentation(presentation: Presentation) -> Self {
        Self {
            label: presentation.root_part.clone(),
            presentation,
            warnings: Vec::new(),
        }
    }

    /// Archive path or label the deck was read from
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    /// Problems recovered from while building
    pub fn warnings(&self) -> &[BuildWarning] {
        &self.warnings
    }

    pub fn slide_count(&self) -> usize {
        self.presentation.slide_count()
    }

    fn engine(&self) -> QueryEngine<'_> {
        QueryEngine::new(&self.presentation)
    }

    /// Everything: metadata, sections and every slide with per-run formatting
    pub fn extract_full(&self) -> FullExtraction {
        self.engine().extract_full()
    }

    /// Selected attributes by name; an empty list selects all of them
    pub fn get_attributes<S: AsRef<str>>(&self, names: &[S]) -> Result<AttributeReport> {
        let attributes = Attribute::parse_list(names)?;
        Ok(self.engine().attributes(&attributes))
    }

    /// One slide by 1-based number
    pub fn get_slide_info(&self, number: usize) -> Result<SlideInfo> {
        self.engine().slide_info(number)
    }

    /// Runs whose effective formatting satisfies `predicate`
    pub fn extract_formatted_text(&self, predicate: &FormattingPredicate) -> FormattedText {
        self.engine().formatted_text(predicate)
    }

    /// As [`Deck::extract_formatted_text`], restricted to 1-based slide
    /// numbers; an empty list selects every slide
    pub fn extract_formatted_text_in(
        &self,
        predicate: &FormattingPredicate,
        slides: &[usize],
    ) -> Result<FormattedText> {
        self.engine().formatted_text_in(predicate, slides)
    }

    /// Formatting statistics over the given slides (all when empty)
    pub fn analyze_formatting(&self, slides: &[usize]) -> Result<FormattingAnalysis> {
        self.engine().formatting_analysis(slides)
    }

    /// Slides matching search criteria
    pub fn query_slides(&self, query: &SlideQuery) -> Result<SlideQueryResult> {
        self.engine().query_slides(query)
    }

    pub fn extract_tables(&self, request: &TableRequest) -> Result<TableExtraction> {
        self.engine().extract_tables(request)
    }

    pub fn get_overview(&self, depth: OverviewDepth) -> Overview {
        self.engine().overview(depth)
    }
}
