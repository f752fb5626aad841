//! Presentation model builder
//!
//! Walks the presentation part, its slides, layouts, masters and themes and
//! assembles a [`Presentation`]. Part-level failures are collected as
//! [`BuildWarning`]s; only problems with the package itself or the
//! presentation part abort the build.
//!
//! Archive reads are sequential. Parsing the slide parts has no shared
//! state and runs on the rayon pool when enabled; results are collected in
//! slide-list order.

use std::collections::HashMap;
use std::io::{Read, Seek};

use rayon::prelude::*;
use serde::Serialize;
use slidequery_ooxml::{
    rels_path_for, resolve_relationships, OoxmlArchive, OoxmlError, QName, Relationships,
    XmlDocument,
};
use tracing::{debug, info, warn};

use crate::config::{BuildSettings, SectionRefMode};
use crate::error::{PptxError, Result};
use crate::layout::{PlaceholderType, SlideLayout, SlideMaster, ThemeFonts};
use crate::parse::{notes_text, parse_slide_shapes, PartContext};
use crate::presentation::{DocumentMetadata, Presentation, Section, SlideSize};
use crate::slide::Slide;
use crate::text::ListStyle;

/// Conventional location of the presentation part
pub const DEFAULT_ROOT_PART: &str = "ppt/presentation.xml";

/// Conventional location of the core properties part
pub const DEFAULT_CORE_PART: &str = "docProps/core.xml";

/// Category of a recoverable build problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    MalformedXml,
    MalformedRelationships,
    EntryNotFound,
    /// A part exists but could not be read (e.g. over the size limit)
    PartUnreadable,
    UnresolvedReference,
    RaggedTable,
}

/// A recoverable problem met while building the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildWarning {
    /// Part the problem was found in
    pub part: String,
    pub kind: WarningKind,
    pub detail: String,
}

impl BuildWarning {
    pub fn new(part: impl Into<String>, kind: WarningKind, detail: impl Into<String>) -> Self {
        Self {
            part: part.into(),
            kind,
            detail: detail.into(),
        }
    }

    /// Downgrade a part-level package error
    pub fn from_error(part: &str, err: &OoxmlError) -> Self {
        let kind = match err {
            OoxmlError::MalformedXml { .. } => WarningKind::MalformedXml,
            OoxmlError::MalformedRelationships { .. } => WarningKind::MalformedRelationships,
            OoxmlError::EntryNotFound { .. } => WarningKind::EntryNotFound,
            OoxmlError::ArchiveUnreadable { .. } => WarningKind::PartUnreadable,
        };
        Self::new(err.part().unwrap_or(part), kind, err.to_string())
    }
}

/// A built model and the warnings collected on the way
#[derive(Debug, Clone)]
pub struct Extraction {
    pub presentation: Presentation,
    pub warnings: Vec<BuildWarning>,
}

/// Build the presentation model from an open archive
pub fn build<R: Read + Seek>(
    archive: &mut OoxmlArchive<R>,
    settings: &BuildSettings,
) -> Result<Extraction> {
    PresentationBuilder::new(archive, settings).build()
}

/// One `p:sldId` entry with everything read from the archive for it
struct RawSlide {
    id: u32,
    rel_id: String,
    part: Option<String>,
    bytes: Option<Vec<u8>>,
    rels: Option<Vec<u8>>,
    warnings: Vec<BuildWarning>,
}

/// A slide after parsing, before layouts and notes are linked
struct ParsedSlide {
    slide: Slide,
    layout_part: Option<String>,
    notes_part: Option<String>,
    warnings: Vec<BuildWarning>,
}

struct PresentationBuilder<'a, R> {
    archive: &'a mut OoxmlArchive<R>,
    settings: &'a BuildSettings,
    warnings: Vec<BuildWarning>,
    masters: Vec<SlideMaster>,
    master_index: HashMap<String, Option<usize>>,
    layouts: Vec<SlideLayout>,
    layout_index: HashMap<String, Option<usize>>,
}

impl<'a, R: Read + Seek> PresentationBuilder<'a, R> {
    fn new(archive: &'a mut OoxmlArchive<R>, settings: &'a BuildSettings) -> Self {
        Self {
            archive,
            settings,
            warnings: Vec::new(),
            masters: Vec::new(),
            master_index: HashMap::new(),
            layouts: Vec::new(),
            layout_index: HashMap::new(),
        }
    }

    fn warn(&mut self, warning: BuildWarning) {
        warn!(part = %warning.part, kind = ?warning.kind, "{}", warning.detail);
        self.warnings.push(warning);
    }

    fn build(mut self) -> Result<Extraction> {
        let package_rels = match resolve_relationships(&mut *self.archive, "") {
            Ok(rels) => rels,
            Err(err) => {
                self.warn(BuildWarning::from_error("_rels/.rels", &err));
                Relationships::empty("")
            }
        };

        let root_part = package_rels
            .first_of_type(Relationships::TYPE_OFFICE_DOCUMENT)
            .filter(|part| self.archive.contains(part))
            .unwrap_or_else(|| DEFAULT_ROOT_PART.to_string());
        if !self.archive.contains(&root_part) {
            return Err(PptxError::MissingRootPart {
                archive: self.archive.label().to_string(),
            });
        }

        let label = self.archive.label().to_string();
        let root_doc = self
            .archive
            .read_xml(&root_part)
            .map_err(|err| PptxError::root_part(&label, err))?;
        let root_rels = resolve_relationships(&mut *self.archive, &root_part)
            .map_err(|err| PptxError::root_part(&label, err))?;
        let root = root_doc.root();
        debug!(part = %root_part, relationships = root_rels.len(), "parsed presentation part");

        for rid in child_rel_ids(root.child(&QName::p("sldMasterIdLst")), "sldMasterId") {
            match root_rels.resolve(&rid) {
                Some(path) => {
                    self.load_master(&path);
                }
                None => self.warn(BuildWarning::new(
                    &root_part,
                    WarningKind::UnresolvedReference,
                    format!("slide master relationship {} not found", rid),
                )),
            }
        }

        let raw = self.read_slides(root, &root_part, &root_rels);
        let parsed: Vec<ParsedSlide> = if self.settings.parallel {
            raw.into_par_iter().map(parse_slide).collect()
        } else {
            raw.into_iter().map(parse_slide).collect()
        };

        let mut slides = Vec::with_capacity(parsed.len());
        for item in parsed {
            for warning in item.warnings {
                self.warn(warning);
            }
            let mut slide = item.slide;
            if let Some(layout_part) = item.layout_part {
                slide.layout = self.load_layout(&layout_part);
            }
            if let Some(notes_part) = item.notes_part {
                slide.notes = self.load_notes(&notes_part);
            }
            slides.push(slide);
        }

        let sections = self.resolve_sections(root, &root_part, &root_rels, &slides);

        let (title, subtitle) = match slides.first() {
            Some(first) => (
                first.title(),
                first
                    .placeholder_text(|t| t == PlaceholderType::Subtitle)
                    .or_else(|| {
                        first.placeholder_text(|t| {
                            matches!(t, PlaceholderType::Body | PlaceholderType::Object)
                        })
                    }),
            ),
            None => (None, None),
        };

        let slide_size = root.child(&QName::p("sldSz")).and_then(|sz| {
            Some(SlideSize::from_emu(
                sz.attr_parse("cx")?,
                sz.attr_parse("cy")?,
            ))
        });

        let default_text_style = root
            .child(&QName::p("defaultTextStyle"))
            .map(ListStyle::from_element)
            .unwrap_or_default();

        let metadata = self.load_metadata(&package_rels);

        info!(
            archive = %self.archive.label(),
            slides = slides.len(),
            layouts = self.layouts.len(),
            masters = self.masters.len(),
            sections = sections.len(),
            warnings = self.warnings.len(),
            "built presentation model"
        );

        Ok(Extraction {
            presentation: Presentation {
                root_part,
                slides,
                masters: self.masters,
                layouts: self.layouts,
                sections,
                title,
                subtitle,
                slide_size,
                metadata,
                default_text_style,
            },
            warnings: self.warnings,
        })
    }

    /// Read slide parts and their relationships in slide-list order
    fn read_slides(
        &mut self,
        root: slidequery_ooxml::ElementRef<'_>,
        root_part: &str,
        root_rels: &Relationships,
    ) -> Vec<RawSlide> {
        let Some(list) = root.child(&QName::p("sldIdLst")) else {
            return Vec::new();
        };

        let mut raw: Vec<RawSlide> = Vec::new();
        for (position, entry) in list
            .children()
            .filter(|c| c.is(&QName::p("sldId")))
            .enumerate()
        {
            let rel_id = entry.attr(&QName::r("id")).unwrap_or_default().to_string();
            let Some(id) = entry.attr_parse::<u32>("id") else {
                self.warn(BuildWarning::new(
                    root_part,
                    WarningKind::MalformedXml,
                    format!(
                        "slide list entry {} ('{}') has no numeric id; skipped",
                        position + 1,
                        rel_id
                    ),
                ));
                continue;
            };
            if raw.iter().any(|r| r.id == id) {
                self.warn(BuildWarning::new(
                    root_part,
                    WarningKind::MalformedXml,
                    format!("slide id {} listed twice ('{}'); skipped", id, rel_id),
                ));
                continue;
            }
            let mut slide = RawSlide {
                id,
                rel_id: rel_id.clone(),
                part: None,
                bytes: None,
                rels: None,
                warnings: Vec::new(),
            };

            let Some(part) = root_rels.resolve(&rel_id) else {
                slide.warnings.push(BuildWarning::new(
                    root_part,
                    WarningKind::UnresolvedReference,
                    format!("slide {} relationship '{}' not found", id, rel_id),
                ));
                raw.push(slide);
                continue;
            };

            match self.archive.read_entry(&part) {
                Ok(bytes) => slide.bytes = Some(bytes),
                Err(err) => slide.warnings.push(BuildWarning::from_error(&part, &err)),
            }
            match self.archive.read_optional(&rels_path_for(&part)) {
                Ok(rels) => slide.rels = rels,
                Err(err) => slide.warnings.push(BuildWarning::from_error(&part, &err)),
            }
            slide.part = Some(part);
            raw.push(slide);
        }
        raw
    }

    fn load_master(&mut self, path: &str) -> Option<usize> {
        if let Some(index) = self.master_index.get(path) {
            return *index;
        }

        let index = match self.archive.read_xml(path) {
            Ok(doc) => {
                let mut master = SlideMaster::from_document(path, &doc);
                master.theme_fonts = self.load_theme_fonts(path);
                debug!(part = %path, placeholders = master.placeholders.len(), "parsed slide master");
                self.masters.push(master);
                Some(self.masters.len() - 1)
            }
            Err(err) => {
                self.warn(BuildWarning::from_error(path, &err));
                None
            }
        };
        self.master_index.insert(path.to_string(), index);
        index
    }

    fn load_theme_fonts(&mut self, master_path: &str) -> ThemeFonts {
        let theme = self
            .part_rels(master_path)
            .first_of_type(Relationships::TYPE_THEME);
        let Some(theme) = theme else {
            return ThemeFonts::default();
        };
        match self.archive.read_xml(&theme) {
            Ok(doc) => ThemeFonts::from_document(&doc),
            Err(err) => {
                self.warn(BuildWarning::from_error(&theme, &err));
                ThemeFonts::default()
            }
        }
    }

    fn load_layout(&mut self, path: &str) -> Option<usize> {
        if let Some(index) = self.layout_index.get(path) {
            return *index;
        }

        let index = match self.archive.read_xml(path) {
            Ok(doc) => {
                let mut layout = SlideLayout::from_document(path, &doc);
                if let Some(master) = self
                    .part_rels(path)
                    .first_of_type(Relationships::TYPE_SLIDE_MASTER)
                {
                    layout.master = self.load_master(&master);
                }
                debug!(part = %path, name = ?layout.name, "parsed slide layout");
                self.layouts.push(layout);
                Some(self.layouts.len() - 1)
            }
            Err(err) => {
                self.warn(BuildWarning::from_error(path, &err));
                None
            }
        };
        self.layout_index.insert(path.to_string(), index);
        index
    }

    fn load_notes(&mut self, path: &str) -> Option<String> {
        match self.archive.read_xml(path) {
            Ok(doc) => notes_text(&doc),
            Err(err) => {
                self.warn(BuildWarning::from_error(path, &err));
                None
            }
        }
    }

    fn load_metadata(&mut self, package_rels: &Relationships) -> Option<DocumentMetadata> {
        let part = package_rels
            .first_of_type(Relationships::TYPE_CORE_PROPERTIES)
            .unwrap_or_else(|| DEFAULT_CORE_PART.to_string());
        if !self.archive.contains(&part) {
            return None;
        }
        match self.archive.read_xml(&part) {
            Ok(doc) => Some(DocumentMetadata::from_document(&doc)),
            Err(err) => {
                self.warn(BuildWarning::from_error(&part, &err));
                None
            }
        }
    }

    /// Relationships of a part; unreadable ones become a warning
    fn part_rels(&mut self, part: &str) -> Relationships {
        match resolve_relationships(&mut *self.archive, part) {
            Ok(rels) => rels,
            Err(err) => {
                self.warn(BuildWarning::from_error(part, &err));
                Relationships::empty(part)
            }
        }
    }

    /// Resolve `p:sectionLst` (or the `p14:sectionLst` extension) to slide ids
    fn resolve_sections(
        &mut self,
        root: slidequery_ooxml::ElementRef<'_>,
        root_part: &str,
        root_rels: &Relationships,
        slides: &[Slide],
    ) -> Vec<Section> {
        let Some(list) = root.descendants_local("sectionLst").into_iter().next() else {
            return Vec::new();
        };
        let mode = self.settings.section_refs;

        let by_rel_id = |rid: &str| {
            if !root_rels.contains(rid) {
                return None;
            }
            slides.iter().find(|s| s.rel_id == rid).map(|s| s.id)
        };
        let by_slide_id = |id: u32| slides.iter().find(|s| s.id == id).map(|s| s.id);

        let mut sections = Vec::new();
        for el in list.children().filter(|c| c.local_name() == "section") {
            let mut section = Section {
                name: el.attr_plain("name").unwrap_or_default().to_string(),
                id: el.attr_plain("id").unwrap_or_default().to_string(),
                slides: Vec::new(),
            };

            for reference in el.descendants_local("sldId") {
                let rid = reference.attr(&QName::r("id"));
                let numeric = reference.attr_parse::<u32>("id");
                let resolved = match mode {
                    SectionRefMode::Auto => match rid {
                        Some(rid) => by_rel_id(rid),
                        None => numeric.and_then(by_slide_id),
                    },
                    SectionRefMode::RelationshipId => rid.and_then(by_rel_id),
                    SectionRefMode::SlideId => numeric.and_then(by_slide_id),
                };

                let label = rid
                    .map(str::to_string)
                    .or_else(|| numeric.map(|n| n.to_string()))
                    .unwrap_or_default();
                match resolved {
                    Some(id) if section.slides.contains(&id) => self.warn(BuildWarning::new(
                        root_part,
                        WarningKind::UnresolvedReference,
                        format!("section '{}' lists slide {} twice", section.name, label),
                    )),
                    Some(id) => section.slides.push(id),
                    None => self.warn(BuildWarning::new(
                        root_part,
                        WarningKind::UnresolvedReference,
                        format!("section '{}' references unknown slide {}", section.name, label),
                    )),
                }
            }

            sections.push(section);
        }
        sections
    }
}

/// `r:id`s of the given children of a list element
fn child_rel_ids(list: Option<slidequery_ooxml::ElementRef<'_>>, local: &str) -> Vec<String> {
    list.map(|list| {
        list.children()
            .filter(|c| c.is(&QName::p(local)))
            .filter_map(|c| c.attr(&QName::r("id")))
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Parse one slide part; runs on worker threads
fn parse_slide(raw: RawSlide) -> ParsedSlide {
    let RawSlide {
        id,
        rel_id,
        part,
        bytes,
        rels,
        mut warnings,
    } = raw;

    let mut parsed = ParsedSlide {
        slide: Slide::empty(id, rel_id, part.clone()),
        layout_part: None,
        notes_part: None,
        warnings: Vec::new(),
    };
    let Some(part) = part else {
        parsed.warnings = warnings;
        return parsed;
    };

    let rels = match rels {
        Some(bytes) => Relationships::parse(&part, &bytes).unwrap_or_else(|err| {
            warnings.push(BuildWarning::from_error(&part, &err));
            Relationships::empty(part.as_str())
        }),
        None => Relationships::empty(part.as_str()),
    };
    parsed.layout_part = rels.first_of_type(Relationships::TYPE_SLIDE_LAYOUT);
    parsed.notes_part = rels.first_of_type(Relationships::TYPE_NOTES_SLIDE);

    if let Some(bytes) = bytes {
        match XmlDocument::parse_part(&part, &bytes) {
            Ok(doc) => {
                let mut ctx = PartContext::new(&part, &rels);
                parsed.slide.shapes = parse_slide_shapes(&doc, &mut ctx);
                warnings.extend(ctx.warnings);
                debug!(part = %part, shapes = parsed.slide.shapes.len(), "parsed slide");
            }
            Err(err) => warnings.push(BuildWarning::from_error(&part, &err)),
        }
    }

    parsed.warnings = warnings;
    parsed
}
