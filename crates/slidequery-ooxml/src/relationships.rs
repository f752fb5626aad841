//! Relationship parts (`_rels/*.rels`)
//!
//! Every OOXML part may have a sibling `.rels` part mapping relationship
//! IDs (`rId1`, ...) to targets. Targets are relative to the directory of
//! the source part unless they start with `/`.

use std::collections::HashMap;
use std::io::{Read, Seek};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::archive::OoxmlArchive;
use crate::error::{OoxmlError, Result};

/// OOXML namespace for relationships
pub const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Common relationship type URIs
impl Relationships {
    /// Package root to main document
    pub const TYPE_OFFICE_DOCUMENT: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    /// Package root to core properties
    pub const TYPE_CORE_PROPERTIES: &'static str =
        "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
    /// Presentation to slide
    pub const TYPE_SLIDE: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
    /// Slide to slide layout
    pub const TYPE_SLIDE_LAYOUT: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
    /// Presentation or layout to slide master
    pub const TYPE_SLIDE_MASTER: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
    /// Master to theme
    pub const TYPE_THEME: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
    /// Slide to notes slide
    pub const TYPE_NOTES_SLIDE: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";
    /// Hyperlink relationship type
    pub const TYPE_HYPERLINK: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
    /// Image relationship type
    pub const TYPE_IMAGE: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
}

/// A relationship target with its type and mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipTarget {
    /// The target URL or path, as written
    pub target: String,
    /// The relationship type URI
    pub rel_type: String,
    /// Target mode: "External" for URLs, None for internal parts
    pub target_mode: Option<String>,
}

impl RelationshipTarget {
    /// Whether the target lies outside the package
    pub fn is_external(&self) -> bool {
        self.target_mode
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("External"))
    }
}

/// Parsed relationships of one source part
///
/// Keeps document order so iteration is deterministic.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    /// Part the relationships belong to ("" for the package root)
    source: String,
    order: Vec<String>,
    map: HashMap<String, RelationshipTarget>,
}

impl Relationships {
    /// Empty relationship set for a source part
    pub fn empty(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// Parse a `.rels` document belonging to `source`
    pub fn parse(source: &str, xml: &[u8]) -> Result<Self> {
        let rels_part = rels_path_for(source);
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut rels = Self::empty(source);
        let mut saw_root = false;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let local = e.local_name();
                    if local.as_ref() == b"Relationships" {
                        saw_root = true;
                    } else if local.as_ref() == b"Relationship" {
                        let mut id = None;
                        let mut target = None;
                        let mut rel_type = None;
                        let mut target_mode = None;

                        for attr in e.attributes() {
                            let attr = attr
                                .map_err(|err| OoxmlError::malformed_rels(&rels_part, err.to_string()))?;
                            let value = attr
                                .unescape_value()
                                .map_err(|err| OoxmlError::malformed_rels(&rels_part, err.to_string()))?
                                .into_owned();
                            match attr.key.as_ref() {
                                b"Id" => id = Some(value),
                                b"Target" => target = Some(value),
                                b"Type" => rel_type = Some(value),
                                b"TargetMode" => target_mode = Some(value),
                                _ => {}
                            }
                        }

                        match (id, target) {
                            (Some(id), Some(target)) => {
                                if !rels.map.contains_key(&id) {
                                    rels.order.push(id.clone());
                                }
                                rels.map.insert(
                                    id,
                                    RelationshipTarget {
                                        target,
                                        rel_type: rel_type.unwrap_or_default(),
                                        target_mode,
                                    },
                                );
                            }
                            _ => {
                                return Err(OoxmlError::malformed_rels(
                                    &rels_part,
                                    "Relationship without Id or Target",
                                ))
                            }
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(OoxmlError::malformed_rels(&rels_part, e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        if !saw_root {
            return Err(OoxmlError::malformed_rels(
                &rels_part,
                "missing Relationships element",
            ));
        }

        Ok(rels)
    }

    /// Part these relationships belong to
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Get the raw target for a relationship ID
    pub fn get(&self, id: &str) -> Option<&str> {
        self.map.get(id).map(|r| r.target.as_str())
    }

    /// Get the full relationship for an ID
    pub fn get_target(&self, id: &str) -> Option<&RelationshipTarget> {
        self.map.get(id)
    }

    /// Check if a relationship ID exists
    pub fn contains(&self, id: &str) -> bool {
        self.map.contains_key(id)
    }

    /// Archive path of an internal target, relative targets resolved
    /// against the source part. External targets yield `None`.
    pub fn resolve(&self, id: &str) -> Option<String> {
        let rel = self.map.get(id)?;
        if rel.is_external() {
            return None;
        }
        Some(resolve_target(&self.source, &rel.target))
    }

    /// Relationships of a given type, in document order
    pub fn of_type<'a>(&'a self, rel_type: &'a str) -> impl Iterator<Item = (&'a str, &'a RelationshipTarget)> + 'a {
        self.iter().filter(move |(_, r)| r.rel_type == rel_type)
    }

    /// Resolved archive path of the first internal relationship of a type
    pub fn first_of_type(&self, rel_type: &str) -> Option<String> {
        self.of_type(rel_type)
            .find(|(_, r)| !r.is_external())
            .map(|(_, r)| resolve_target(&self.source, &r.target))
    }

    /// Get the number of relationships
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if there are no relationships
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over relationships in document order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RelationshipTarget)> {
        self.order
            .iter()
            .filter_map(|id| self.map.get(id).map(|rel| (id.as_str(), rel)))
    }
}

/// Path of the `.rels` part for a source part; `""` names the package root
pub fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None if part.is_empty() => "_rels/.rels".to_string(),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the part that declares it
///
/// Absolute targets (`/ppt/slides/slide1.xml`) are taken from the package
/// root; relative ones from the source part's directory. `.` and `..`
/// segments are normalized and never climb above the root.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    let relative = match target.strip_prefix('/') {
        Some(absolute) => absolute,
        None => {
            if let Some((dir, _)) = source_part.rsplit_once('/') {
                segments.extend(dir.split('/').filter(|s| !s.is_empty()));
            }
            target
        }
    };

    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// Load the relationships of a part from its archive
///
/// A part without a `.rels` sibling has no relationships.
pub fn resolve_relationships<R: Read + Seek>(
    archive: &mut OoxmlArchive<R>,
    part: &str,
) -> Result<Relationships> {
    let rels_part = rels_path_for(part);
    match archive.read_optional(&rels_part)? {
        Some(bytes) => Relationships::parse(part, &bytes),
        None => Ok(Relationships::empty(part)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE_RELS: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
        <Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
            <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout2.xml"/>
            <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/a?b=1&amp;c=2" TargetMode="External"/>
            <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide" Target="/ppt/notesSlides/notesSlide1.xml"/>
        </Relationships>"#;

    #[test]
    fn test_parse_relationships() {
        let rels = Relationships::parse("ppt/slides/slide1.xml", SLIDE_RELS).unwrap();

        assert_eq!(rels.len(), 3);
        assert_eq!(rels.get("rId1"), Some("../slideLayouts/slideLayout2.xml"));
        assert_eq!(rels.get("rId2"), Some("https://example.com/a?b=1&c=2"));
        assert!(rels.get_target("rId2").unwrap().is_external());

        let ids: Vec<&str> = rels.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["rId1", "rId2", "rId3"]);
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let rels = Relationships::parse("ppt/slides/slide1.xml", SLIDE_RELS).unwrap();

        assert_eq!(
            rels.resolve("rId1").as_deref(),
            Some("ppt/slideLayouts/slideLayout2.xml")
        );
        assert_eq!(rels.resolve("rId2"), None);
        assert_eq!(
            rels.resolve("rId3").as_deref(),
            Some("ppt/notesSlides/notesSlide1.xml")
        );
        assert_eq!(rels.resolve("rId9"), None);
    }

    #[test]
    fn test_first_of_type() {
        let rels = Relationships::parse("ppt/slides/slide1.xml", SLIDE_RELS).unwrap();
        assert_eq!(
            rels.first_of_type(Relationships::TYPE_NOTES_SLIDE).as_deref(),
            Some("ppt/notesSlides/notesSlide1.xml")
        );
        assert_eq!(rels.first_of_type(Relationships::TYPE_HYPERLINK), None);
        assert_eq!(rels.first_of_type(Relationships::TYPE_THEME), None);
    }

    #[test]
    fn test_rels_path_for() {
        assert_eq!(rels_path_for(""), "_rels/.rels");
        assert_eq!(
            rels_path_for("ppt/presentation.xml"),
            "ppt/_rels/presentation.xml.rels"
        );
        assert_eq!(
            rels_path_for("ppt/slides/slide3.xml"),
            "ppt/slides/_rels/slide3.xml.rels"
        );
    }

    #[test]
    fn test_resolve_target_normalization() {
        assert_eq!(
            resolve_target("ppt/presentation.xml", "slides/slide1.xml"),
            "ppt/slides/slide1.xml"
        );
        assert_eq!(
            resolve_target("", "ppt/presentation.xml"),
            "ppt/presentation.xml"
        );
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", "./../media/./image1.png"),
            "ppt/media/image1.png"
        );
        assert_eq!(resolve_target("a.xml", "../../x.xml"), "x.xml");
    }

    #[test]
    fn test_empty_relationships() {
        let xml = br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#;
        let rels = Relationships::parse("ppt/presentation.xml", xml).unwrap();
        assert!(rels.is_empty());
        assert_eq!(rels.source(), "ppt/presentation.xml");
    }

    #[test]
    fn test_malformed_relationships() {
        let err = Relationships::parse("ppt/presentation.xml", b"<Relationships><Relationship Id=\"rId1\"/></Relationships>")
            .unwrap_err();
        assert!(matches!(
            err,
            OoxmlError::MalformedRelationships { ref part, .. } if part == "ppt/_rels/presentation.xml.rels"
        ));

        assert!(Relationships::parse("ppt/presentation.xml", b"<Relationships><oops></Relationships>").is_err());
        assert!(Relationships::parse("ppt/presentation.xml", b"<html/>").is_err());
    }
}
