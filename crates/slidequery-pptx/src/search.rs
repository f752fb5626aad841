//! Slide search
//!
//! Filters slides by title, content, layout, section and number, then
//! reports a chosen set of fields for each hit. Criteria deserialize from
//! JSON so callers can pass them straight through from a command line or a
//! request body:
//!
//! ```json
//! {
//!   "title": { "contains": "revenue" },
//!   "content": { "has_tables": true, "object_count": { "min": 2 } },
//!   "layout": { "name": "title" },
//!   "section": "Appendix"
//! }
//! ```
//!
//! Every condition present must hold. Text comparisons are
//! case-insensitive; `regex` and `one_of` take regular expressions.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{PptxError, Result};
use crate::layout::PlaceholderType;
use crate::query::{slide_text, value, ObjectCounts, QueryEngine};
use crate::slide::{Shape, ShapeKind, Slide};

/// Results returned when the caller does not set a limit
pub const DEFAULT_LIMIT: usize = 50;

const PREVIEW_ELEMENTS: usize = 3;
const PREVIEW_CHARS: usize = 100;

/// Conditions on the slide title
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TitleCriteria {
    pub contains: Option<String>,
    pub starts_with: Option<String>,
    pub ends_with: Option<String>,
    pub regex: Option<String>,
    /// At least one of these patterns must match
    pub one_of: Option<Vec<String>>,
}

/// Inclusive bounds on the total shape count
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CountRange {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

/// Conditions on what a slide contains
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentCriteria {
    /// Substring of the title or of any paragraph
    pub contains_text: Option<String>,
    pub has_tables: Option<bool>,
    pub has_charts: Option<bool>,
    pub has_images: Option<bool>,
    pub object_count: Option<CountRange>,
}

/// Conditions on the slide's layout (substring matches)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutCriteria {
    #[serde(rename = "type")]
    pub layout_type: Option<String>,
    pub name: Option<String>,
}

/// All slide search conditions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlideCriteria {
    pub title: Option<TitleCriteria>,
    pub content: Option<ContentCriteria>,
    pub layout: Option<LayoutCriteria>,
    /// Keep only these 1-based numbers; numbers past the end match nothing
    pub slide_numbers: Option<Vec<usize>>,
    /// Section name, compared case-insensitively
    pub section: Option<String>,
}

impl SlideCriteria {
    /// Parse criteria from a JSON object
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|err| PptxError::invalid_criteria(input, err))
    }
}

/// Per-slide fields a search can return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlideField {
    SlideNumber,
    Title,
    Subtitle,
    Layout,
    ObjectCounts,
    PreviewText,
    TableInfo,
    FullContent,
}

impl SlideField {
    pub const ALL: [SlideField; 8] = [
        Self::SlideNumber,
        Self::Title,
        Self::Subtitle,
        Self::Layout,
        Self::ObjectCounts,
        Self::PreviewText,
        Self::TableInfo,
        Self::FullContent,
    ];

    /// Fields returned when none are requested
    pub const DEFAULT: [SlideField; 3] = [Self::SlideNumber, Self::Title, Self::ObjectCounts];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SlideNumber => "slide_number",
            Self::Title => "title",
            Self::Subtitle => "subtitle",
            Self::Layout => "layout",
            Self::ObjectCounts => "object_counts",
            Self::PreviewText => "preview_text",
            Self::TableInfo => "table_info",
            Self::FullContent => "full_content",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(SlideField::as_str).collect()
    }

    /// Parse a field list; empty selects [`SlideField::DEFAULT`]
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<SlideField>> {
        if names.is_empty() {
            return Ok(Self::DEFAULT.to_vec());
        }
        let mut out: Vec<SlideField> = Vec::new();
        for name in names {
            let field: SlideField = name.as_ref().parse()?;
            if !out.contains(&field) {
                out.push(field);
            }
        }
        Ok(out)
    }
}

impl FromStr for SlideField {
    type Err = PptxError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == name)
            .ok_or_else(|| PptxError::unknown_field(name, &Self::names()))
    }
}

impl fmt::Display for SlideField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A slide search request
#[derive(Debug, Clone, PartialEq)]
pub struct SlideQuery {
    pub criteria: SlideCriteria,
    pub fields: Vec<SlideField>,
    /// Maximum hits returned; 0 means no limit
    pub limit: usize,
}

impl Default for SlideQuery {
    fn default() -> Self {
        Self {
            criteria: SlideCriteria::default(),
            fields: SlideField::DEFAULT.to_vec(),
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Header summary of one table, as listed by the `table_info` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableHeaders {
    pub table_index: usize,
    pub shape_name: String,
    pub rows: usize,
    pub columns: usize,
    pub headers: Vec<String>,
}

/// One matching slide; `slide_number` plus the requested fields
#[derive(Debug, Clone, Serialize)]
pub struct SlideMatch {
    pub slide_number: usize,
    #[serde(flatten)]
    pub fields: BTreeMap<&'static str, Value>,
}

/// Result of [`QueryEngine::query_slides`]
#[derive(Debug, Clone, Serialize)]
pub struct SlideQueryResult {
    /// Slides matching the criteria before the limit was applied
    pub total_matches: usize,
    pub returned: usize,
    pub limit: usize,
    pub slides: Vec<SlideMatch>,
}

/// Compile a user pattern, case-insensitive
pub(crate) fn compile_pattern(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|err| PptxError::invalid_criteria(pattern, err))
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Criteria with their patterns compiled
struct SlideMatcher<'c> {
    criteria: &'c SlideCriteria,
    title_regex: Option<Regex>,
    title_one_of: Vec<Regex>,
}

impl<'c> SlideMatcher<'c> {
    fn new(criteria: &'c SlideCriteria) -> Result<Self> {
        let title = criteria.title.as_ref();
        let title_regex = title
            .and_then(|t| t.regex.as_deref())
            .map(compile_pattern)
            .transpose()?;
        let title_one_of = title
            .and_then(|t| t.one_of.as_ref())
            .map(|patterns| patterns.iter().map(|p| compile_pattern(p)).collect::<Result<Vec<_>>>())
            .transpose()?
            .unwrap_or_default();

        if let Some(range) = criteria.content.as_ref().and_then(|c| c.object_count) {
            if let (Some(min), Some(max)) = (range.min, range.max) {
                if min > max {
                    return Err(PptxError::invalid_criteria(
                        format!("object_count {}..{}", min, max),
                        "min is greater than max",
                    ));
                }
            }
        }

        Ok(Self {
            criteria,
            title_regex,
            title_one_of,
        })
    }

    fn matches(&self, engine: &QueryEngine<'_>, number: usize, slide: &Slide) -> bool {
        let c = self.criteria;
        if let Some(numbers) = &c.slide_numbers {
            if !numbers.is_empty() && !numbers.contains(&number) {
                return false;
            }
        }

        let title = slide.title().unwrap_or_default();
        if let Some(t) = &c.title {
            if !self.title_matches(t, &title) {
                return false;
            }
        }

        if let Some(content) = &c.content {
            if !content_matches(content, &title, slide) {
                return false;
            }
        }

        if let Some(layout) = &c.layout {
            let info = engine.layout_info(slide);
            let name = info.as_ref().and_then(|l| l.name.as_deref()).unwrap_or("");
            let kind = info.as_ref().and_then(|l| l.layout_type.as_deref()).unwrap_or("");
            if layout.name.as_deref().is_some_and(|n| !contains_ci(name, n)) {
                return false;
            }
            if layout.layout_type.as_deref().is_some_and(|t| !contains_ci(kind, t)) {
                return false;
            }
        }

        if let Some(section) = &c.section {
            let member = engine.presentation.sections.iter().any(|s| {
                s.name.eq_ignore_ascii_case(section) && s.slides.contains(&slide.id)
            });
            if !member {
                return false;
            }
        }

        true
    }

    fn title_matches(&self, t: &TitleCriteria, title: &str) -> bool {
        let lower = title.to_lowercase();
        if t.contains.as_deref().is_some_and(|s| !lower.contains(&s.to_lowercase())) {
            return false;
        }
        if t.starts_with.as_deref().is_some_and(|s| !lower.starts_with(&s.to_lowercase())) {
            return false;
        }
        if t.ends_with.as_deref().is_some_and(|s| !lower.ends_with(&s.to_lowercase())) {
            return false;
        }
        if self.title_regex.as_ref().is_some_and(|re| !re.is_match(title)) {
            return false;
        }
        if !self.title_one_of.is_empty() && !self.title_one_of.iter().any(|re| re.is_match(title)) {
            return false;
        }
        true
    }
}

fn content_matches(content: &ContentCriteria, title: &str, slide: &Slide) -> bool {
    let counts = ObjectCounts::of_slide(slide);
    if content.has_tables.is_some_and(|want| want != (counts.tables > 0)) {
        return false;
    }
    if content.has_charts.is_some_and(|want| want != (counts.charts > 0)) {
        return false;
    }
    if content.has_images.is_some_and(|want| want != (counts.pictures > 0)) {
        return false;
    }
    if let Some(range) = content.object_count {
        let total = counts.total();
        if range.min.is_some_and(|min| total < min) || range.max.is_some_and(|max| total > max) {
            return false;
        }
    }
    if let Some(needle) = &content.contains_text {
        let found = contains_ci(title, needle)
            || slide_text(slide).iter().any(|text| contains_ci(text, needle));
        if !found {
            return false;
        }
    }
    true
}

fn truncate_preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

fn is_title_shape(shape: &Shape) -> bool {
    shape.placeholder().is_some_and(|ph| ph.ph_type.is_title())
}

/// `Title: ... | Text 1: ... | Text 2: ...`
fn preview_text(slide: &Slide) -> String {
    let mut parts = Vec::new();
    if let Some(title) = slide.title() {
        parts.push(format!("Title: {}", title));
    }

    let texts = slide
        .all_shapes()
        .into_iter()
        .filter(|shape| !is_title_shape(shape))
        .filter_map(Shape::text_frame)
        .filter(|frame| !frame.is_blank())
        .take(PREVIEW_ELEMENTS);
    for (i, frame) in texts.enumerate() {
        parts.push(format!("Text {}: {}", i + 1, truncate_preview(&frame.text())));
    }
    parts.join(" | ")
}

/// Header rows of every table on a slide
pub(crate) fn table_headers(slide: &Slide) -> Vec<TableHeaders> {
    slide
        .all_shapes()
        .into_iter()
        .filter_map(|shape| match &shape.kind {
            ShapeKind::Table(table) => Some((shape, table)),
            _ => None,
        })
        .enumerate()
        .map(|(table_index, (shape, table))| TableHeaders {
            table_index,
            shape_name: shape.name.clone(),
            rows: table.row_count(),
            columns: table.columns,
            headers: table.grid().into_iter().next().unwrap_or_default(),
        })
        .collect()
}

impl<'a> QueryEngine<'a> {
    /// Slides matching `query.criteria`, reported with `query.fields`
    pub fn query_slides(&self, query: &SlideQuery) -> Result<SlideQueryResult> {
        let matcher = SlideMatcher::new(&query.criteria)?;

        let hits: Vec<(usize, &Slide)> = self
            .presentation
            .slides
            .iter()
            .enumerate()
            .map(|(i, slide)| (i + 1, slide))
            .filter(|(number, slide)| matcher.matches(self, *number, slide))
            .collect();
        let total_matches = hits.len();
        debug!(matches = total_matches, limit = query.limit, "slide query");

        let take = if query.limit == 0 {
            total_matches
        } else {
            query.limit
        };
        let slides: Vec<SlideMatch> = hits
            .into_iter()
            .take(take)
            .map(|(number, slide)| self.slide_match(number, slide, &query.fields))
            .collect();

        Ok(SlideQueryResult {
            total_matches,
            returned: slides.len(),
            limit: query.limit,
            slides,
        })
    }

    fn slide_match(&self, number: usize, slide: &Slide, fields: &[SlideField]) -> SlideMatch {
        let mut out = BTreeMap::new();
        for field in fields {
            let entry = match field {
                SlideField::SlideNumber => continue,
                SlideField::Title => value(&slide.title()),
                SlideField::Subtitle => {
                    value(&slide.placeholder_text(|t| t == PlaceholderType::Subtitle))
                }
                SlideField::Layout => value(&self.layout_info(slide)),
                SlideField::ObjectCounts => value(&ObjectCounts::of_slide(slide)),
                SlideField::PreviewText => value(&preview_text(slide)),
                SlideField::TableInfo => value(&table_headers(slide)),
                SlideField::FullContent => value(&self.describe_slide(number, slide)),
            };
            out.insert(field.as_str(), entry);
        }
        SlideMatch {
            slide_number: number,
            fields: out,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criteria_from_json() {
        let criteria = SlideCriteria::from_json(
            r#"{"title": {"contains": "plan"}, "layout": {"type": "title"}, "slide_numbers": [1, 2]}"#,
        )
        .unwrap();
        assert_eq!(
            criteria.title.unwrap().contains.as_deref(),
            Some("plan")
        );
        assert_eq!(criteria.layout.unwrap().layout_type.as_deref(), Some("title"));
        assert_eq!(criteria.slide_numbers, Some(vec![1, 2]));

        let err = SlideCriteria::from_json(r#"{"colour": "red"}"#).unwrap_err();
        assert_eq!(err.code(), "SQ011");
    }

    #[test]
    fn test_field_list() {
        let empty: [&str; 0] = [];
        assert_eq!(SlideField::parse_list(&empty[..]).unwrap(), SlideField::DEFAULT.to_vec());
        assert_eq!(
            SlideField::parse_list(&["preview_text", "title", "title"][..]).unwrap(),
            vec![SlideField::PreviewText, SlideField::Title]
        );
        match SlideField::parse_list(&["title", "colour"][..]).unwrap_err() {
            PptxError::UnknownField { name, valid } => {
                assert_eq!(name, "colour");
                assert!(valid.contains(&"full_content".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_bad_patterns_are_rejected() {
        let criteria = SlideCriteria {
            title: Some(TitleCriteria {
                regex: Some("(unclosed".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(
            SlideMatcher::new(&criteria),
            Err(PptxError::InvalidCriteria { .. })
        ));

        let criteria = SlideCriteria {
            content: Some(ContentCriteria {
                object_count: Some(CountRange {
                    min: Some(5),
                    max: Some(2),
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(SlideMatcher::new(&criteria).is_err());
    }

    #[test]
    fn test_preview_truncation() {
        let long = "x".repeat(150);
        let preview = truncate_preview(&long);
        assert_eq!(preview.chars().count(), 100);
        assert!(preview.ends_with("..."));
        assert_eq!(truncate_preview("short"), "short");
    }
}
