//! Query engine
//!
//! Read-only queries over a built [`Presentation`]: full extraction,
//! attribute subsets, single slides and the structural overview. The
//! formatting, search and table queries extend [`QueryEngine`] from their
//! own modules. Queries never touch the archive and never mutate the model;
//! a failed query leaves the model usable for the next one.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::error::{PptxError, Result};
use crate::formatting::{effective_formatting, EffectiveFormatting, RunContext};
use crate::layout::Placeholder;
use crate::presentation::{DocumentMetadata, Presentation, SlideSize};
use crate::slide::{Geometry, OtherKind, Picture, Shape, ShapeKind, Slide, Table};

/// Shape counts by variant, group members included
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ObjectCounts {
    pub text_boxes: usize,
    pub placeholders: usize,
    pub tables: usize,
    pub pictures: usize,
    pub groups: usize,
    pub charts: usize,
    pub media: usize,
    pub connectors: usize,
    pub other: usize,
}

impl ObjectCounts {
    pub fn of_slide(slide: &Slide) -> Self {
        let mut counts = Self::default();
        for shape in slide.all_shapes() {
            counts.count(shape);
        }
        counts
    }

    pub fn of_presentation(presentation: &Presentation) -> Self {
        presentation
            .slides
            .iter()
            .map(Self::of_slide)
            .fold(Self::default(), |acc, c| acc.add(&c))
    }

    fn count(&mut self, shape: &Shape) {
        let slot = match &shape.kind {
            ShapeKind::TextBox { .. } => &mut self.text_boxes,
            ShapeKind::Placeholder { .. } => &mut self.placeholders,
            ShapeKind::Table(_) => &mut self.tables,
            ShapeKind::Picture(_) => &mut self.pictures,
            ShapeKind::Group { .. } => &mut self.groups,
            ShapeKind::Other { kind, .. } => match kind {
                OtherKind::Chart => &mut self.charts,
                OtherKind::Media => &mut self.media,
                OtherKind::Connector => &mut self.connectors,
                _ => &mut self.other,
            },
        };
        *slot += 1;
    }

    pub fn add(mut self, other: &Self) -> Self {
        self.text_boxes += other.text_boxes;
        self.placeholders += other.placeholders;
        self.tables += other.tables;
        self.pictures += other.pictures;
        self.groups += other.groups;
        self.charts += other.charts;
        self.media += other.media;
        self.connectors += other.connectors;
        self.other += other.other;
        self
    }

    pub fn total(&self) -> usize {
        self.text_boxes
            + self.placeholders
            + self.tables
            + self.pictures
            + self.groups
            + self.charts
            + self.media
            + self.connectors
            + self.other
    }
}

/// Result of [`QueryEngine::extract_full`]
#[derive(Debug, Clone, Serialize)]
pub struct FullExtraction {
    pub slide_count: usize,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub slide_size: Option<SlideSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,
    pub sections: Vec<SectionInfo>,
    pub object_counts: ObjectCounts,
    pub slides: Vec<SlideInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionInfo {
    pub name: String,
    pub id: String,
    /// Member slide ids
    pub slides: Vec<u32>,
    /// Member slide numbers (1-based)
    pub slide_numbers: Vec<usize>,
}

/// One slide with its shapes, text, tables and notes
#[derive(Debug, Clone, Serialize)]
pub struct SlideInfo {
    pub slide_number: usize,
    pub slide_id: u32,
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutInfo>,
    pub shapes: Vec<ShapeInfo>,
    /// Non-empty paragraph texts of the slide's text frames
    pub text: Vec<String>,
    pub tables: Vec<TableInfo>,
    pub notes: Option<String>,
    pub object_counts: ObjectCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayoutInfo {
    pub name: Option<String>,
    pub layout_type: Option<String>,
    pub master: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShapeInfo {
    pub name: String,
    pub shape_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<Placeholder>,
    pub geometry: Geometry,
    pub z_order: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paragraphs: Vec<ParagraphInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TableInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<Picture>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ShapeInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParagraphInfo {
    pub level: u8,
    pub text: String,
    pub runs: Vec<RunInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunInfo {
    pub text: String,
    pub formatting: EffectiveFormatting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub shape_name: String,
    pub rows: usize,
    pub columns: usize,
    /// Cell text, row-major
    pub cells: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub merged_cells: Vec<MergedCell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedCell {
    pub row: usize,
    pub column: usize,
    pub grid_span: u32,
    pub row_span: u32,
    pub h_merge: bool,
    pub v_merge: bool,
}

impl TableInfo {
    fn new(shape_name: &str, table: &Table) -> Self {
        let mut merged_cells = Vec::new();
        for (r, row) in table.rows.iter().enumerate() {
            for (c, cell) in row.cells.iter().enumerate() {
                if cell.is_merged() {
                    merged_cells.push(MergedCell {
                        row: r,
                        column: c,
                        grid_span: cell.grid_span,
                        row_span: cell.row_span,
                        h_merge: cell.h_merge,
                        v_merge: cell.v_merge,
                    });
                }
            }
        }

        Self {
            shape_name: shape_name.to_string(),
            rows: table.row_count(),
            columns: table.columns,
            cells: table.grid(),
            merged_cells,
        }
    }
}

/// Attributes accepted by [`QueryEngine::attributes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    Title,
    Subtitle,
    Text,
    Tables,
    Images,
    Layout,
    Size,
    Sections,
    Notes,
    ObjectCounts,
    Placeholders,
    TextElements,
    Metadata,
    SlideCount,
    SlideSize,
}

impl Attribute {
    pub const ALL: [Attribute; 15] = [
        Self::Title,
        Self::Subtitle,
        Self::Text,
        Self::Tables,
        Self::Images,
        Self::Layout,
        Self::Size,
        Self::Sections,
        Self::Notes,
        Self::ObjectCounts,
        Self::Placeholders,
        Self::TextElements,
        Self::Metadata,
        Self::SlideCount,
        Self::SlideSize,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Subtitle => "subtitle",
            Self::Text => "text",
            Self::Tables => "tables",
            Self::Images => "images",
            Self::Layout => "layout",
            Self::Size => "size",
            Self::Sections => "sections",
            Self::Notes => "notes",
            Self::ObjectCounts => "object_counts",
            Self::Placeholders => "placeholders",
            Self::TextElements => "text_elements",
            Self::Metadata => "metadata",
            Self::SlideCount => "slide_count",
            Self::SlideSize => "slide_size",
        }
    }

    /// Every valid attribute name
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(Attribute::as_str).collect()
    }

    /// Parse a request; an empty request selects every attribute.
    /// Fails on the first unknown name.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<Attribute>> {
        if names.is_empty() {
            return Ok(Self::ALL.to_vec());
        }
        let mut out: Vec<Attribute> = Vec::new();
        for name in names {
            let attribute: Attribute = name.as_ref().parse()?;
            if !out.contains(&attribute) {
                out.push(attribute);
            }
        }
        Ok(out)
    }
}

impl FromStr for Attribute {
    type Err = PptxError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == name)
            .ok_or_else(|| PptxError::unknown_attribute(name, &Self::names()))
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`QueryEngine::attributes`]
///
/// Presentation-wide attributes sit at the top level; per-slide attributes
/// are listed under `slides`, each entry keyed by `slide_number`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AttributeReport {
    #[serde(flatten)]
    pub presentation: BTreeMap<&'static str, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub slides: Vec<BTreeMap<&'static str, Value>>,
}

/// Overview detail level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverviewDepth {
    #[default]
    Summary,
    Detailed,
}

impl FromStr for OverviewDepth {
    type Err = PptxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summary" => Ok(Self::Summary),
            "detailed" => Ok(Self::Detailed),
            _ => Err(PptxError::InvalidDepth {
                input: s.to_string(),
            }),
        }
    }
}

/// Character, word and paragraph counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TextStats {
    pub characters: usize,
    pub words: usize,
    pub paragraphs: usize,
}

impl TextStats {
    fn add_paragraph(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        self.paragraphs += 1;
        self.characters += text.chars().count();
        self.words += text.split_whitespace().count();
    }

    fn add(mut self, other: &Self) -> Self {
        self.characters += other.characters;
        self.words += other.words;
        self.paragraphs += other.paragraphs;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionSummary {
    pub name: String,
    pub slide_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlideOverview {
    pub slide_number: usize,
    pub title: Option<String>,
    pub layout: Option<String>,
    pub object_counts: ObjectCounts,
    pub text: TextStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverviewTotals {
    pub object_counts: ObjectCounts,
    pub text: TextStats,
    pub average_words_per_slide: f64,
}

/// Result of [`QueryEngine::overview`]
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub depth: OverviewDepth,
    pub slide_count: usize,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub sections: Vec<SectionSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slides: Option<Vec<SlideOverview>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totals: Option<OverviewTotals>,
}

/// Read-only queries over a built presentation
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'a> {
    pub(crate) presentation: &'a Presentation,
}

impl<'a> QueryEngine<'a> {
    pub fn new(presentation: &'a Presentation) -> Self {
        Self { presentation }
    }

    /// Slides by 1-based number in presentation order, duplicates dropped.
    /// An empty selection means every slide.
    pub(crate) fn select_slides(&self, numbers: &[usize]) -> Result<Vec<(usize, &'a Slide)>> {
        let slides = &self.presentation.slides;
        if numbers.is_empty() {
            return Ok(slides.iter().enumerate().map(|(i, s)| (i + 1, s)).collect());
        }

        let mut selected: Vec<usize> = numbers.to_vec();
        selected.sort_unstable();
        selected.dedup();
        selected
            .into_iter()
            .map(|number| {
                self.presentation
                    .slide(number)
                    .map(|slide| (number, slide))
                    .ok_or(PptxError::SlideIndexOutOfRange {
                        number,
                        slide_count: slides.len(),
                    })
            })
            .collect()
    }

    /// The whole model as a nested result
    pub fn extract_full(&self) -> FullExtraction {
        let p = self.presentation;
        FullExtraction {
            slide_count: p.slide_count(),
            title: p.title.clone(),
            subtitle: p.subtitle.clone(),
            slide_size: p.slide_size,
            metadata: p.metadata.clone(),
            sections: self.section_infos(),
            object_counts: ObjectCounts::of_presentation(p),
            slides: p
                .slides
                .iter()
                .enumerate()
                .map(|(i, slide)| self.describe_slide(i + 1, slide))
                .collect(),
        }
    }

    /// One slide by 1-based number
    pub fn slide_info(&self, number: usize) -> Result<SlideInfo> {
        let slide = self
            .presentation
            .slide(number)
            .ok_or(PptxError::SlideIndexOutOfRange {
                number,
                slide_count: self.presentation.slide_count(),
            })?;
        Ok(self.describe_slide(number, slide))
    }

    /// Only the requested attributes
    pub fn attributes(&self, attributes: &[Attribute]) -> AttributeReport {
        let p = self.presentation;
        let mut report = AttributeReport::default();

        for attribute in attributes {
            let entry = match attribute {
                Attribute::Title => value(&p.title),
                Attribute::Subtitle => value(&p.subtitle),
                Attribute::SlideCount => value(&p.slide_count()),
                Attribute::SlideSize => value(&p.slide_size),
                Attribute::Sections => value(&self.section_infos()),
                Attribute::Metadata => value(&p.metadata),
                Attribute::ObjectCounts => value(&ObjectCounts::of_presentation(p)),
                _ => continue,
            };
            report.presentation.insert(attribute.as_str(), entry);
        }

        let per_slide: Vec<Attribute> = attributes
            .iter()
            .copied()
            .filter(|a| {
                !matches!(
                    a,
                    Attribute::Subtitle
                        | Attribute::SlideCount
                        | Attribute::SlideSize
                        | Attribute::Sections
                        | Attribute::Metadata
                )
            })
            .collect();
        if per_slide.is_empty() {
            return report;
        }

        for (i, slide) in p.slides.iter().enumerate() {
            let mut entry = BTreeMap::new();
            entry.insert("slide_number", value(&(i + 1)));
            for attribute in &per_slide {
                entry.insert(attribute.as_str(), self.slide_attribute(slide, *attribute));
            }
            report.slides.push(entry);
        }
        report
    }

    fn slide_attribute(&self, slide: &Slide, attribute: Attribute) -> Value {
        match attribute {
            Attribute::Title => value(&slide.title()),
            Attribute::Text => value(&slide_text(slide)),
            Attribute::TextElements => {
                let elements: Vec<Value> = slide
                    .all_shapes()
                    .into_iter()
                    .filter_map(|shape| {
                        let frame = shape.text_frame()?;
                        if frame.is_blank() {
                            return None;
                        }
                        let info = self.describe_shape(slide, shape);
                        Some(serde_json::json!({
                            "name": info.name,
                            "shape_type": info.shape_type,
                            "text": info.text,
                            "geometry": info.geometry,
                            "paragraphs": info.paragraphs,
                        }))
                    })
                    .collect();
                Value::Array(elements)
            }
            Attribute::Tables => value(&slide_tables(slide)),
            Attribute::Images => {
                let images: Vec<Value> = slide
                    .all_shapes()
                    .into_iter()
                    .filter_map(|shape| match &shape.kind {
                        ShapeKind::Picture(picture) => Some(serde_json::json!({
                            "name": shape.name,
                            "image": picture.image,
                            "format": picture.format,
                            "description": picture.description,
                            "geometry": shape.geometry,
                        })),
                        _ => None,
                    })
                    .collect();
                Value::Array(images)
            }
            Attribute::Layout => value(&self.layout_info(slide)),
            Attribute::Placeholders => {
                let placeholders: Vec<Value> = slide
                    .all_shapes()
                    .into_iter()
                    .filter_map(|shape| {
                        let placeholder = shape.placeholder()?;
                        Some(serde_json::json!({
                            "name": shape.name,
                            "placeholder": placeholder,
                            "text": shape.text_frame().map(|f| f.text()),
                            "geometry": shape.geometry,
                        }))
                    })
                    .collect();
                Value::Array(placeholders)
            }
            Attribute::Size => {
                let shapes: Vec<Value> = slide
                    .all_shapes()
                    .into_iter()
                    .map(|shape| {
                        serde_json::json!({
                            "name": shape.name,
                            "geometry": shape.geometry,
                        })
                    })
                    .collect();
                Value::Array(shapes)
            }
            Attribute::Notes => value(&slide.notes),
            Attribute::ObjectCounts => value(&ObjectCounts::of_slide(slide)),
            Attribute::Subtitle
            | Attribute::SlideCount
            | Attribute::SlideSize
            | Attribute::Sections
            | Attribute::Metadata => Value::Null,
        }
    }

    /// Structure at the requested depth
    pub fn overview(&self, depth: OverviewDepth) -> Overview {
        let p = self.presentation;
        let sections = p
            .sections
            .iter()
            .map(|s| SectionSummary {
                name: s.name.clone(),
                slide_count: s.slides.len(),
            })
            .collect();

        let mut overview = Overview {
            depth,
            slide_count: p.slide_count(),
            title: p.title.clone(),
            subtitle: p.subtitle.clone(),
            sections,
            slides: None,
            totals: None,
        };
        if depth == OverviewDepth::Summary {
            return overview;
        }

        let slides: Vec<SlideOverview> = p
            .slides
            .iter()
            .enumerate()
            .map(|(i, slide)| SlideOverview {
                slide_number: i + 1,
                title: slide.title(),
                layout: p.layout_of(slide).and_then(|l| l.name.clone()),
                object_counts: ObjectCounts::of_slide(slide),
                text: slide_stats(slide),
            })
            .collect();

        let text = slides
            .iter()
            .fold(TextStats::default(), |acc, s| acc.add(&s.text));
        let object_counts = slides
            .iter()
            .fold(ObjectCounts::default(), |acc, s| acc.add(&s.object_counts));
        let average_words_per_slide = if slides.is_empty() {
            0.0
        } else {
            let average = text.words as f64 / slides.len() as f64;
            (average * 10.0).round() / 10.0
        };

        overview.totals = Some(OverviewTotals {
            object_counts,
            text,
            average_words_per_slide,
        });
        overview.slides = Some(slides);
        overview
    }

    fn section_infos(&self) -> Vec<SectionInfo> {
        self.presentation
            .sections
            .iter()
            .map(|s| SectionInfo {
                name: s.name.clone(),
                id: s.id.clone(),
                slides: s.slides.clone(),
                slide_numbers: s
                    .slides
                    .iter()
                    .filter_map(|id| self.presentation.slide_number(*id))
                    .collect(),
            })
            .collect()
    }

    pub(crate) fn layout_info(&self, slide: &Slide) -> Option<LayoutInfo> {
        let layout = self.presentation.layout_of(slide)?;
        Some(LayoutInfo {
            name: layout.name.clone(),
            layout_type: layout.layout_type.clone(),
            master: self
                .presentation
                .master_of(slide)
                .map(|m| m.name.clone().unwrap_or_else(|| m.part.clone())),
        })
    }

    pub(crate) fn describe_slide(&self, number: usize, slide: &Slide) -> SlideInfo {
        SlideInfo {
            slide_number: number,
            slide_id: slide.id,
            title: slide.title(),
            layout: self.layout_info(slide),
            shapes: slide
                .shapes
                .iter()
                .map(|shape| self.describe_shape(slide, shape))
                .collect(),
            text: slide_text(slide),
            tables: slide_tables(slide),
            notes: slide.notes.clone(),
            object_counts: ObjectCounts::of_slide(slide),
        }
    }

    fn describe_shape(&self, slide: &Slide, shape: &Shape) -> ShapeInfo {
        let mut info = ShapeInfo {
            name: shape.name.clone(),
            shape_type: shape.type_name(),
            id: shape.id,
            placeholder: shape.placeholder().copied(),
            geometry: shape.geometry,
            z_order: shape.z_order,
            text: None,
            paragraphs: Vec::new(),
            table: None,
            picture: None,
            children: Vec::new(),
        };

        match &shape.kind {
            ShapeKind::Table(table) => info.table = Some(TableInfo::new(&shape.name, table)),
            ShapeKind::Picture(picture) => info.picture = Some(picture.clone()),
            ShapeKind::Group { children } => {
                info.children = children
                    .iter()
                    .map(|child| self.describe_shape(slide, child))
                    .collect();
            }
            _ => {}
        }

        if let Some(frame) = shape.text_frame() {
            info.text = Some(frame.text());
            info.paragraphs = frame
                .paragraphs
                .iter()
                .map(|paragraph| ParagraphInfo {
                    level: paragraph.level,
                    text: paragraph.text(),
                    runs: paragraph
                        .runs
                        .iter()
                        .map(|run| {
                            let ctx = RunContext {
                                slide,
                                shape,
                                frame,
                                paragraph,
                                run,
                            };
                            RunInfo {
                                text: run.text.clone(),
                                formatting: effective_formatting(self.presentation, &ctx),
                            }
                        })
                        .collect(),
                })
                .collect();
        }

        info
    }
}

pub(crate) fn value<T: Serialize + ?Sized>(v: &T) -> Value {
    serde_json::to_value(v).unwrap_or(Value::Null)
}

/// Non-empty paragraph texts from text-bearing shapes, in document order
pub(crate) fn slide_text(slide: &Slide) -> Vec<String> {
    slide
        .all_shapes()
        .into_iter()
        .filter_map(Shape::text_frame)
        .flat_map(|frame| frame.paragraphs.iter().map(|p| p.text()))
        .filter(|text| !text.trim().is_empty())
        .collect()
}

fn slide_tables(slide: &Slide) -> Vec<TableInfo> {
    slide
        .all_shapes()
        .into_iter()
        .filter_map(|shape| match &shape.kind {
            ShapeKind::Table(table) => Some(TableInfo::new(&shape.name, table)),
            _ => None,
        })
        .collect()
}

fn slide_stats(slide: &Slide) -> TextStats {
    let mut stats = TextStats::default();
    for shape in slide.all_shapes() {
        if let Some(frame) = shape.text_frame() {
            for paragraph in &frame.paragraphs {
                stats.add_paragraph(&paragraph.text());
            }
        }
        if let ShapeKind::Table(table) = &shape.kind {
            for cell in table.rows.iter().flat_map(|r| &r.cells) {
                for paragraph in &cell.text.paragraphs {
                    stats.add_paragraph(&paragraph.text());
                }
            }
        }
    }
    stats
}
