//! In-memory PPTX packages for integration tests

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use slidequery_pptx::{Deck, ExtractorConfig};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const NAMESPACES: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

const PACKAGE_RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const CORE_REL: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";

/// Relationship id of the n-th (0-based) slide in the presentation part
pub fn slide_rel_id(index: usize) -> String {
    format!("rId{}", index + 10)
}

struct FixtureSlide {
    id: u32,
    shapes: String,
    notes: Option<String>,
}

/// Builder for a small but complete presentation package
///
/// Every package has one master (with a theme) and one "Title Slide"
/// layout. Slides are numbered in the order they are added.
#[derive(Default)]
pub struct Fixture {
    slides: Vec<FixtureSlide>,
    sections: Option<String>,
    replaced: Vec<(String, Vec<u8>)>,
    omitted: Vec<String>,
    reversed: bool,
    slide_ids: Option<String>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slide(mut self, id: u32, shapes: impl Into<String>) -> Self {
        self.slides.push(FixtureSlide {
            id,
            shapes: shapes.into(),
            notes: None,
        });
        self
    }

    pub fn slide_with_notes(mut self, id: u32, shapes: impl Into<String>, notes: &str) -> Self {
        self.slides.push(FixtureSlide {
            id,
            shapes: shapes.into(),
            notes: Some(notes.to_string()),
        });
        self
    }

    /// Raw `p14:section` elements for the section list extension
    pub fn sections(mut self, sections: &str) -> Self {
        self.sections = Some(sections.to_string());
        self
    }

    /// Replace the bytes of a part
    pub fn replace(mut self, part: &str, bytes: &[u8]) -> Self {
        self.replaced.push((part.to_string(), bytes.to_vec()));
        self
    }

    /// Leave a part out of the archive
    pub fn without(mut self, part: &str) -> Self {
        self.omitted.push(part.to_string());
        self
    }

    /// Raw `p:sldId` elements instead of the generated slide list
    pub fn slide_ids(mut self, entries: &str) -> Self {
        self.slide_ids = Some(entries.to_string());
        self
    }

    /// Write archive entries in reverse order
    pub fn reversed(mut self) -> Self {
        self.reversed = true;
        self
    }

    fn parts(&self) -> Vec<(String, Vec<u8>)> {
        let mut parts: Vec<(String, String)> = vec![
            ("[Content_Types].xml".into(), content_types()),
            ("_rels/.rels".into(), package_rels()),
            ("docProps/core.xml".into(), core_properties()),
            ("ppt/presentation.xml".into(), self.presentation()),
            ("ppt/_rels/presentation.xml.rels".into(), self.presentation_rels()),
            ("ppt/slideMasters/slideMaster1.xml".into(), master()),
            (
                "ppt/slideMasters/_rels/slideMaster1.xml.rels".into(),
                rels(&[
                    ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
                    ("rId2", "theme", "../theme/theme1.xml"),
                ]),
            ),
            ("ppt/theme/theme1.xml".into(), theme()),
            ("ppt/slideLayouts/slideLayout1.xml".into(), layout()),
            (
                "ppt/slideLayouts/_rels/slideLayout1.xml.rels".into(),
                rels(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]),
            ),
        ];

        for (i, slide) in self.slides.iter().enumerate() {
            let n = i + 1;
            parts.push((format!("ppt/slides/slide{}.xml", n), slide_part(&slide.shapes)));

            let notes_target = format!("../notesSlides/notesSlide{}.xml", n);
            let mut slide_rels = vec![("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml")];
            if let Some(notes) = &slide.notes {
                slide_rels.push(("rId2", "notesSlide", notes_target.as_str()));
                parts.push((format!("ppt/notesSlides/notesSlide{}.xml", n), notes_part(notes)));
            }
            parts.push((format!("ppt/slides/_rels/slide{}.xml.rels", n), rels(&slide_rels)));
        }

        let mut parts: Vec<(String, Vec<u8>)> = parts
            .into_iter()
            .filter(|(name, _)| !self.omitted.contains(name))
            .map(|(name, xml)| {
                let bytes = self
                    .replaced
                    .iter()
                    .find(|(part, _)| *part == name)
                    .map(|(_, bytes)| bytes.clone())
                    .unwrap_or_else(|| xml.into_bytes());
                (name, bytes)
            })
            .collect();
        if self.reversed {
            parts.reverse();
        }
        parts
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(&mut buffer);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, bytes) in self.parts() {
            zip.start_file(name, options).unwrap();
            zip.write_all(&bytes).unwrap();
        }
        zip.finish().unwrap();
        buffer.into_inner()
    }

    pub fn deck(&self) -> Deck {
        self.deck_with(&ExtractorConfig::default())
    }

    pub fn deck_with(&self, config: &ExtractorConfig) -> Deck {
        Deck::from_reader(Cursor::new(self.to_bytes()), "fixture.pptx", config).unwrap()
    }

    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.to_bytes()).unwrap();
        path
    }

    fn presentation(&self) -> String {
        let ids: String = match &self.slide_ids {
            Some(entries) => entries.clone(),
            None => self
                .slides
                .iter()
                .enumerate()
                .map(|(i, s)| format!(r#"<p:sldId id="{}" r:id="{}"/>"#, s.id, slide_rel_id(i)))
                .collect(),
        };
        let sections = self
            .sections
            .as_ref()
            .map(|sections| {
                format!(
                    r#"<p:extLst><p:ext uri="{{521415D9-36F7-43E2-AB2F-B90AF26B5E84}}"><p14:sectionLst xmlns:p14="http://schemas.microsoft.com/office/powerpoint/2010/main">{}</p14:sectionLst></p:ext></p:extLst>"#,
                    sections
                )
            })
            .unwrap_or_default();

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation {NAMESPACES}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{ids}</p:sldIdLst><p:sldSz cx="12192000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/>{sections}</p:presentation>"#
        )
    }

    fn presentation_rels(&self) -> String {
        let slide_targets: Vec<(String, String)> = (0..self.slides.len())
            .map(|i| (slide_rel_id(i), format!("slides/slide{}.xml", i + 1)))
            .collect();
        let mut entries = vec![
            ("rId1", "slideMaster", "slideMasters/slideMaster1.xml"),
            ("rId2", "theme", "theme/theme1.xml"),
        ];
        for (id, target) in &slide_targets {
            entries.push((id.as_str(), "slide", target.as_str()));
        }
        rels(&entries)
    }
}

fn content_types() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/></Types>"#
        .to_string()
}

fn package_rels() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{PACKAGE_RELS_NS}"><Relationship Id="rId1" Type="{REL}/officeDocument" Target="ppt/presentation.xml"/><Relationship Id="rId2" Type="{CORE_REL}" Target="docProps/core.xml"/></Relationships>"#
    )
}

fn rels(entries: &[(&str, &str, &str)]) -> String {
    let body: String = entries
        .iter()
        .map(|(id, kind, target)| {
            format!(r#"<Relationship Id="{id}" Type="{REL}/{kind}" Target="{target}"/>"#)
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{PACKAGE_RELS_NS}">{body}</Relationships>"#
    )
}

fn core_properties() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/"><dc:title>Quarterly Review Deck</dc:title><dc:creator>Ada Lovelace</dc:creator><cp:revision>3</cp:revision></cp:coreProperties>"#
        .to_string()
}

fn theme() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements><a:fontScheme name="Office"><a:majorFont><a:latin typeface="Calibri Light"/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/></a:minorFont></a:fontScheme></a:themeElements></a:theme>"#
        .to_string()
}

fn master() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster {NAMESPACES}><p:cSld name="Office Master"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}{}</p:spTree></p:cSld><p:txStyles><p:titleStyle><a:lvl1pPr><a:defRPr sz="4400"><a:latin typeface="+mj-lt"/></a:defRPr></a:lvl1pPr></p:titleStyle><p:bodyStyle><a:lvl1pPr><a:defRPr sz="2800"><a:latin typeface="+mn-lt"/></a:defRPr></a:lvl1pPr><a:lvl2pPr><a:defRPr sz="2400"/></a:lvl2pPr></p:bodyStyle><p:otherStyle><a:lvl1pPr><a:defRPr sz="1800"/></a:lvl1pPr></p:otherStyle></p:txStyles></p:sldMaster>"#,
        placeholder_shape(2, "Title Placeholder 1", r#"type="title""#, ""),
        placeholder_shape(3, "Text Placeholder 2", r#"type="body" idx="1""#, ""),
    )
}

fn layout() -> String {
    let title = placeholder_shape_with_style(
        2,
        "Title 1",
        r#"type="title""#,
        r#"<a:lstStyle><a:lvl1pPr><a:defRPr><a:solidFill><a:srgbClr val="1f4e79"/></a:solidFill></a:defRPr></a:lvl1pPr></a:lstStyle>"#,
        "",
    );
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout {NAMESPACES} type="title"><p:cSld name="Title Slide"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}{}</p:spTree></p:cSld></p:sldLayout>"#,
        title,
        placeholder_shape(3, "Subtitle 2", r#"type="subTitle" idx="1""#, ""),
    )
}

fn slide_part(shapes: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld {NAMESPACES}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{shapes}</p:spTree></p:cSld></p:sld>"#
    )
}

fn notes_part(text: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:notes {NAMESPACES}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}{}</p:spTree></p:cSld></p:notes>"#,
        placeholder_shape(2, "Slide Image Placeholder 1", r#"type="sldImg""#, ""),
        placeholder_shape(3, "Notes Placeholder 2", r#"type="body" idx="1""#, &para(&run(text))),
    )
}

fn placeholder_shape(id: u32, name: &str, ph: &str, paragraphs: &str) -> String {
    placeholder_shape_with_style(id, name, ph, "<a:lstStyle/>", paragraphs)
}

fn placeholder_shape_with_style(
    id: u32,
    name: &str,
    ph: &str,
    list_style: &str,
    paragraphs: &str,
) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr/><p:nvPr><p:ph {ph}/></p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="457200" y="274638"/><a:ext cx="8229600" cy="1143000"/></a:xfrm></p:spPr><p:txBody><a:bodyPr/>{list_style}{paragraphs}</p:txBody></p:sp>"#
    )
}

/// Title placeholder with one plain run
pub fn title(text: &str) -> String {
    placeholder_shape(2, "Title 1", r#"type="title""#, &para(&run(text)))
}

pub fn subtitle(text: &str) -> String {
    placeholder_shape(3, "Subtitle 2", r#"type="subTitle" idx="1""#, &para(&run(text)))
}

/// Body placeholder with the given paragraphs
pub fn body(paragraphs: &str) -> String {
    placeholder_shape(3, "Content Placeholder 2", r#"type="body" idx="1""#, paragraphs)
}

pub fn text_box(id: u32, name: &str, paragraphs: &str) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="914400" y="914400"/><a:ext cx="2743200" cy="457200"/></a:xfrm></p:spPr><p:txBody><a:bodyPr/><a:lstStyle/>{paragraphs}</p:txBody></p:sp>"#
    )
}

pub fn group(id: u32, name: &str, members: &str) -> String {
    format!(
        r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{members}</p:grpSp>"#
    )
}

pub fn picture(id: u32, name: &str, embed: &str) -> String {
    format!(
        r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="{name}" descr="Company logo"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="{embed}"/></p:blipFill><p:spPr/></p:pic>"#
    )
}

/// Table graphic frame; every row must have `columns` cells to be well formed
pub fn table(id: u32, name: &str, columns: usize, rows: &[&[&str]]) -> String {
    let grid: String = (0..columns).map(|_| r#"<a:gridCol w="2032000"/>"#).collect();
    let rows: String = rows
        .iter()
        .map(|cells| {
            let cells: String = cells
                .iter()
                .map(|text| {
                    format!(
                        r#"<a:tc><a:txBody><a:bodyPr/><a:lstStyle/>{}</a:txBody><a:tcPr/></a:tc>"#,
                        para(&run(text))
                    )
                })
                .collect();
            format!(r#"<a:tr h="370840">{cells}</a:tr>"#)
        })
        .collect();
    format!(
        r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{id}" name="{name}"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><p:xfrm><a:off x="838200" y="1825625"/><a:ext cx="6096000" cy="1112520"/></p:xfrm><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tblGrid>{grid}</a:tblGrid>{rows}</a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#
    )
}

pub fn para(runs: &str) -> String {
    format!("<a:p>{runs}</a:p>")
}

pub fn run(text: &str) -> String {
    format!(r#"<a:r><a:rPr lang="en-US"/><a:t>{text}</a:t></a:r>"#)
}

/// Run with extra `a:rPr` attributes, e.g. `b="1" sz="3200"`
pub fn run_with(attrs: &str, text: &str) -> String {
    format!(r#"<a:r><a:rPr lang="en-US" {attrs}/><a:t>{text}</a:t></a:r>"#)
}
