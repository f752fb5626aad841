//! The presentation aggregate
//!
//! Built once per archive by [`crate::builder`] and never mutated after.

use serde::Serialize;
use slidequery_ooxml::XmlDocument;

use crate::constants::{EMU_PER_CM, EMU_PER_INCH, EMU_PER_POINT};
use crate::layout::{SlideLayout, SlideMaster};
use crate::slide::Slide;
use crate::text::ListStyle;

/// A parsed presentation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Presentation {
    /// Archive path of the presentation part
    pub root_part: String,
    /// Slides in declared slide-list order
    pub slides: Vec<Slide>,
    pub masters: Vec<SlideMaster>,
    pub layouts: Vec<SlideLayout>,
    pub sections: Vec<Section>,
    /// Title placeholder text of the first slide
    pub title: Option<String>,
    /// Subtitle (or, failing that, body) placeholder text of the first slide
    pub subtitle: Option<String>,
    pub slide_size: Option<SlideSize>,
    pub metadata: Option<DocumentMetadata>,
    /// `p:defaultTextStyle`
    pub default_text_style: ListStyle,
}

impl Presentation {
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Slide by 1-based number
    pub fn slide(&self, number: usize) -> Option<&Slide> {
        number.checked_sub(1).and_then(|i| self.slides.get(i))
    }

    /// Slide by its presentation-scoped id
    pub fn slide_by_id(&self, id: u32) -> Option<&Slide> {
        self.slides.iter().find(|s| s.id == id)
    }

    /// 1-based number of the slide with the given id
    pub fn slide_number(&self, id: u32) -> Option<usize> {
        self.slides.iter().position(|s| s.id == id).map(|i| i + 1)
    }

    pub fn layout_of(&self, slide: &Slide) -> Option<&SlideLayout> {
        slide.layout.and_then(|i| self.layouts.get(i))
    }

    pub fn master_of(&self, slide: &Slide) -> Option<&SlideMaster> {
        self.layout_of(slide)
            .and_then(|layout| layout.master)
            .and_then(|i| self.masters.get(i))
    }
}

/// A named group of slides (`p:section` / `p14:section`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Section {
    pub name: String,
    /// Section GUID (`id` attribute)
    pub id: String,
    /// Ids of the member slides, in section order
    pub slides: Vec<u32>,
}

/// Slide dimensions with derived units
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlideSize {
    pub width_emu: i64,
    pub height_emu: i64,
    pub width_inches: f64,
    pub height_inches: f64,
    pub width_cm: f64,
    pub height_cm: f64,
    pub width_points: f64,
    pub height_points: f64,
    /// Width over height; 0 when the height is 0
    pub aspect_ratio: f64,
}

impl SlideSize {
    pub fn from_emu(width_emu: i64, height_emu: i64) -> Self {
        let ratio = |emu: i64, per: i64| emu as f64 / per as f64;
        let width_inches = ratio(width_emu, EMU_PER_INCH);
        let height_inches = ratio(height_emu, EMU_PER_INCH);

        Self {
            width_emu,
            height_emu,
            width_inches: round_to(width_inches, 2),
            height_inches: round_to(height_inches, 2),
            width_cm: round_to(ratio(width_emu, EMU_PER_CM), 2),
            height_cm: round_to(ratio(height_emu, EMU_PER_CM), 2),
            width_points: round_to(ratio(width_emu, EMU_PER_POINT), 1),
            height_points: round_to(ratio(height_emu, EMU_PER_POINT), 1),
            aspect_ratio: if height_emu > 0 {
                round_to(width_inches / height_inches, 2)
            } else {
                0.0
            },
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Core document properties (`docProps/core.xml`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl DocumentMetadata {
    /// Read the core properties part; elements are matched by local name
    /// since `dc:`, `dcterms:` and `cp:` all appear
    pub fn from_document(doc: &XmlDocument) -> Self {
        let root = doc.root();
        let field = |local: &str| {
            root.children()
                .find(|c| c.local_name() == local)
                .map(|c| c.text().trim().to_string())
                .filter(|s| !s.is_empty())
        };

        Self {
            title: field("title"),
            subject: field("subject"),
            creator: field("creator"),
            keywords: field("keywords"),
            description: field("description"),
            last_modified_by: field("lastModifiedBy"),
            revision: field("revision"),
            created: field("created"),
            modified: field("modified"),
            category: field("category"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widescreen_size() {
        let size = SlideSize::from_emu(12_192_000, 6_858_000);
        assert_eq!(size.width_inches, 13.33);
        assert_eq!(size.height_inches, 7.5);
        assert_eq!(size.width_cm, 33.87);
        assert_eq!(size.height_cm, 19.05);
        assert_eq!(size.width_points, 960.0);
        assert_eq!(size.height_points, 540.0);
        assert_eq!(size.aspect_ratio, 1.78);
    }

    #[test]
    fn test_zero_height() {
        assert_eq!(SlideSize::from_emu(100, 0).aspect_ratio, 0.0);
    }

    #[test]
    fn test_slide_lookup_is_one_based() {
        let presentation = Presentation {
            slides: vec![Slide::empty(256, "rId2", None), Slide::empty(300, "rId3", None)],
            ..Default::default()
        };

        assert!(presentation.slide(0).is_none());
        assert_eq!(presentation.slide(1).unwrap().id, 256);
        assert_eq!(presentation.slide(2).unwrap().id, 300);
        assert!(presentation.slide(3).is_none());
        assert_eq!(presentation.slide_number(300), Some(2));
        assert!(presentation.slide_by_id(1).is_none());
    }

    #[test]
    fn test_core_properties() {
        let doc = XmlDocument::parse(
            br#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties"
                xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/">
              <dc:title>Quarterly Review</dc:title>
              <dc:creator>Dana</dc:creator>
              <cp:lastModifiedBy>Sam</cp:lastModifiedBy>
              <cp:revision>4</cp:revision>
              <dcterms:created>2024-01-02T03:04:05Z</dcterms:created>
              <dc:subject></dc:subject>
            </cp:coreProperties>"#,
        )
        .unwrap();
        let meta = DocumentMetadata::from_document(&doc);

        assert_eq!(meta.title.as_deref(), Some("Quarterly Review"));
        assert_eq!(meta.creator.as_deref(), Some("Dana"));
        assert_eq!(meta.last_modified_by.as_deref(), Some("Sam"));
        assert_eq!(meta.revision.as_deref(), Some("4"));
        assert_eq!(meta.created.as_deref(), Some("2024-01-02T03:04:05Z"));
        assert_eq!(meta.subject, None);
    }
}
