//! Slide layouts, slide masters and placeholder roles
//!
//! Layouts and masters are the second and third links of the formatting
//! inheritance chain. Only what formatting and slide metadata need is kept:
//! placeholder roles with their list styles, master text styles and the
//! theme's Latin fonts.

use serde::Serialize;
use slidequery_ooxml::{ElementRef, QName, XmlDocument};

use crate::text::ListStyle;

/// Types of placeholders (`p:ph@type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderType {
    /// Title placeholder
    Title,
    /// Center title (for title slides)
    CenterTitle,
    /// Subtitle
    Subtitle,
    /// Body content
    Body,
    /// Object (content); the default when `type` is omitted
    Object,
    /// Date/time
    DateTime,
    /// Footer
    Footer,
    /// Header (notes and handouts)
    Header,
    /// Slide number
    SlideNumber,
    /// Chart
    Chart,
    /// Table
    Table,
    /// Clip art
    ClipArt,
    /// Diagram/SmartArt
    Diagram,
    /// Media (video/audio)
    Media,
    /// Picture
    Picture,
    /// Slide image (notes pages)
    SlideImage,
    /// Other/custom
    Other,
}

impl PlaceholderType {
    /// Get the OOXML type attribute value
    pub fn ooxml_type(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::CenterTitle => "ctrTitle",
            Self::Subtitle => "subTitle",
            Self::Body => "body",
            Self::Object => "obj",
            Self::DateTime => "dt",
            Self::Footer => "ftr",
            Self::Header => "hdr",
            Self::SlideNumber => "sldNum",
            Self::Chart => "chart",
            Self::Table => "tbl",
            Self::ClipArt => "clipArt",
            Self::Diagram => "dgm",
            Self::Media => "media",
            Self::Picture => "pic",
            Self::SlideImage => "sldImg",
            Self::Other => "",
        }
    }

    /// Parse from OOXML type attribute
    pub fn from_ooxml_type(s: &str) -> Self {
        match s {
            "title" => Self::Title,
            "ctrTitle" => Self::CenterTitle,
            "subTitle" => Self::Subtitle,
            "body" => Self::Body,
            "obj" => Self::Object,
            "dt" => Self::DateTime,
            "ftr" => Self::Footer,
            "hdr" => Self::Header,
            "sldNum" => Self::SlideNumber,
            "chart" => Self::Chart,
            "tbl" => Self::Table,
            "clipArt" => Self::ClipArt,
            "dgm" => Self::Diagram,
            "media" => Self::Media,
            "pic" => Self::Picture,
            "sldImg" => Self::SlideImage,
            _ => Self::Other,
        }
    }

    /// Title or centered title
    pub fn is_title(&self) -> bool {
        matches!(self, Self::Title | Self::CenterTitle)
    }

    /// Placeholders whose text is inherited from the master body style
    pub fn is_body_like(&self) -> bool {
        matches!(
            self,
            Self::Subtitle
                | Self::Body
                | Self::Object
                | Self::Chart
                | Self::Table
                | Self::ClipArt
                | Self::Diagram
                | Self::Media
                | Self::Picture
                | Self::Other
        )
    }

    /// Which master text style applies to this placeholder
    pub fn text_style(&self) -> TextStyleKind {
        if self.is_title() {
            TextStyleKind::Title
        } else {
            TextStyleKind::Body
        }
    }

    /// Font size used when nothing in the chain sets one, in points
    pub fn default_font_size(&self) -> f64 {
        match self {
            Self::Title | Self::CenterTitle => 44.0,
            Self::Subtitle => 24.0,
            _ => 18.0,
        }
    }
}

/// A placeholder reference on a slide, layout or master shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placeholder {
    #[serde(rename = "type")]
    pub ph_type: PlaceholderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idx: Option<u32>,
}

impl Placeholder {
    /// Read `p:nvPr/p:ph` from a shape's non-visual properties
    pub fn from_ph(ph: ElementRef<'_>) -> Self {
        Self {
            ph_type: ph
                .attr_plain("type")
                .map(PlaceholderType::from_ooxml_type)
                .unwrap_or(PlaceholderType::Object),
            idx: ph.attr_parse("idx"),
        }
    }

    /// Find the `p:ph` of a shape element, if it is a placeholder
    pub fn of_shape(shape: ElementRef<'_>) -> Option<Self> {
        let nv = shape.children().find(|c| c.local_name().starts_with("nv"))?;
        let ph = nv.child(&QName::p("nvPr"))?.child(&QName::p("ph"))?;
        Some(Self::from_ph(ph))
    }
}

/// A placeholder defined on a layout or master with its text list style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderStyle {
    pub placeholder: Placeholder,
    pub list_style: ListStyle,
}

/// Master text style families (`p:txStyles`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyleKind {
    Title,
    Body,
    Other,
}

/// `p:titleStyle`, `p:bodyStyle` and `p:otherStyle` of a master
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextStyles {
    pub title: ListStyle,
    pub body: ListStyle,
    pub other: ListStyle,
}

impl TextStyles {
    pub fn get(&self, kind: TextStyleKind) -> &ListStyle {
        match kind {
            TextStyleKind::Title => &self.title,
            TextStyleKind::Body => &self.body,
            TextStyleKind::Other => &self.other,
        }
    }
}

/// Major (headings) and minor (body) Latin fonts of a theme
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ThemeFonts {
    pub major: Option<String>,
    pub minor: Option<String>,
}

impl ThemeFonts {
    /// Read `a:fontScheme` from a theme part
    pub fn from_document(doc: &XmlDocument) -> Self {
        let scheme = doc.root().first(&QName::a("fontScheme"));
        let latin = |font: &str| {
            scheme
                .and_then(|s| s.first(&QName::a(font)))
                .and_then(|f| f.child(&QName::a("latin")))
                .and_then(|l| l.attr_plain("typeface"))
                .filter(|face| !face.is_empty())
                .map(str::to_string)
        };

        Self {
            major: latin("majorFont"),
            minor: latin("minorFont"),
        }
    }

    /// Substitute a theme typeface reference (`+mj-lt`, `+mn-lt`)
    pub fn resolve<'a>(&'a self, typeface: &'a str) -> Option<&'a str> {
        match typeface {
            "+mj-lt" => self.major.as_deref(),
            "+mn-lt" => self.minor.as_deref(),
            other => Some(other),
        }
    }
}

/// A slide layout part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideLayout {
    /// Archive path of the layout part
    pub part: String,
    /// `p:cSld@name`
    pub name: Option<String>,
    /// `p:sldLayout@type` (e.g. `title`, `obj`, `twoObj`)
    pub layout_type: Option<String>,
    /// Index into [`crate::Presentation::masters`]
    pub master: Option<usize>,
    pub placeholders: Vec<PlaceholderStyle>,
}

impl SlideLayout {
    /// Read a layout part; the master link is filled in by the builder
    pub fn from_document(part: &str, doc: &XmlDocument) -> Self {
        let root = doc.root();
        Self {
            part: part.to_string(),
            name: root
                .child(&QName::p("cSld"))
                .and_then(|c| c.attr_plain("name"))
                .map(str::to_string),
            layout_type: root.attr_plain("type").map(str::to_string),
            master: None,
            placeholders: placeholder_styles(root),
        }
    }
}

/// A slide master part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideMaster {
    /// Archive path of the master part
    pub part: String,
    pub name: Option<String>,
    pub placeholders: Vec<PlaceholderStyle>,
    pub text_styles: TextStyles,
    pub theme_fonts: ThemeFonts,
}

impl SlideMaster {
    /// Read a master part; theme fonts are filled in by the builder
    pub fn from_document(part: &str, doc: &XmlDocument) -> Self {
        let root = doc.root();
        let styles = root.child(&QName::p("txStyles"));
        let style = |name: &str| {
            styles
                .and_then(|s| s.child(&QName::p(name)))
                .map(ListStyle::from_element)
                .unwrap_or_default()
        };

        Self {
            part: part.to_string(),
            name: root
                .child(&QName::p("cSld"))
                .and_then(|c| c.attr_plain("name"))
                .map(str::to_string),
            placeholders: placeholder_styles(root),
            text_styles: TextStyles {
                title: style("titleStyle"),
                body: style("bodyStyle"),
                other: style("otherStyle"),
            },
            theme_fonts: ThemeFonts::default(),
        }
    }
}

/// Placeholder shapes of a layout or master with their list styles
fn placeholder_styles(root: ElementRef<'_>) -> Vec<PlaceholderStyle> {
    root.descendants(&QName::p("sp"))
        .into_iter()
        .filter_map(|sp| {
            let placeholder = Placeholder::of_shape(sp)?;
            let list_style = sp
                .child(&QName::p("txBody"))
                .and_then(|body| body.child(&QName::a("lstStyle")))
                .map(ListStyle::from_element)
                .unwrap_or_default();
            Some(PlaceholderStyle {
                placeholder,
                list_style,
            })
        })
        .collect()
}

/// Find the layout or master placeholder a slide placeholder inherits from
///
/// Matches by `idx` first (when `by_idx` is set and the slide placeholder
/// has one), then by exact type, then by type family: any title matches a
/// title, any body-like placeholder matches a `body` or `obj` placeholder.
pub fn match_placeholder<'a>(
    candidates: &'a [PlaceholderStyle],
    placeholder: &Placeholder,
    by_idx: bool,
) -> Option<&'a PlaceholderStyle> {
    if by_idx {
        if let Some(idx) = placeholder.idx {
            if let Some(found) = candidates
                .iter()
                .find(|c| c.placeholder.idx == Some(idx))
            {
                return Some(found);
            }
        }
    }

    let ph_type = placeholder.ph_type;
    candidates
        .iter()
        .find(|c| c.placeholder.ph_type == ph_type)
        .or_else(|| {
            if ph_type.is_title() {
                candidates.iter().find(|c| c.placeholder.ph_type.is_title())
            } else if ph_type.is_body_like() {
                candidates.iter().find(|c| {
                    matches!(
                        c.placeholder.ph_type,
                        PlaceholderType::Body | PlaceholderType::Object
                    )
                })
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: &str = r#"<p:sldLayout xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
        xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" type="title">
      <p:cSld name="Title Slide">
        <p:spTree>
          <p:sp>
            <p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="ctrTitle"/></p:nvPr></p:nvSpPr>
            <p:txBody><a:bodyPr/><a:lstStyle><a:lvl1pPr><a:defRPr sz="6000"/></a:lvl1pPr></a:lstStyle></p:txBody>
          </p:sp>
          <p:sp>
            <p:nvSpPr><p:cNvPr id="3" name="Subtitle 2"/><p:cNvSpPr/><p:nvPr><p:ph type="subTitle" idx="1"/></p:nvPr></p:nvSpPr>
            <p:txBody><a:bodyPr/><a:lstStyle><a:lvl1pPr><a:defRPr i="1"/></a:lvl1pPr></a:lstStyle></p:txBody>
          </p:sp>
          <p:sp>
            <p:nvSpPr><p:cNvPr id="4" name="Footer"/><p:cNvSpPr/><p:nvPr><p:ph type="ftr" idx="11"/></p:nvPr></p:nvSpPr>
          </p:sp>
        </p:spTree>
      </p:cSld>
    </p:sldLayout>"#;

    #[test]
    fn test_placeholder_type_roundtrip() {
        for t in ["title", "ctrTitle", "subTitle", "body", "obj", "dt", "ftr", "sldNum", "pic"] {
            assert_eq!(PlaceholderType::from_ooxml_type(t).ooxml_type(), t);
        }
        assert_eq!(PlaceholderType::from_ooxml_type("bogus"), PlaceholderType::Other);
    }

    #[test]
    fn test_default_sizes() {
        assert_eq!(PlaceholderType::CenterTitle.default_font_size(), 44.0);
        assert_eq!(PlaceholderType::Subtitle.default_font_size(), 24.0);
        assert_eq!(PlaceholderType::Body.default_font_size(), 18.0);
    }

    #[test]
    fn test_layout_parse() {
        let doc = XmlDocument::parse(LAYOUT.as_bytes()).unwrap();
        let layout = SlideLayout::from_document("ppt/slideLayouts/slideLayout1.xml", &doc);

        assert_eq!(layout.name.as_deref(), Some("Title Slide"));
        assert_eq!(layout.layout_type.as_deref(), Some("title"));
        assert_eq!(layout.placeholders.len(), 3);
        assert_eq!(
            layout.placeholders[0].placeholder.ph_type,
            PlaceholderType::CenterTitle
        );
        assert_eq!(layout.placeholders[1].placeholder.idx, Some(1));
        assert!(layout.placeholders[2].list_style.is_empty());
    }

    #[test]
    fn test_match_by_idx_then_type() {
        let doc = XmlDocument::parse(LAYOUT.as_bytes()).unwrap();
        let layout = SlideLayout::from_document("l.xml", &doc);

        let by_idx = Placeholder {
            ph_type: PlaceholderType::Body,
            idx: Some(1),
        };
        let found = match_placeholder(&layout.placeholders, &by_idx, true).unwrap();
        assert_eq!(found.placeholder.ph_type, PlaceholderType::Subtitle);

        let title = Placeholder {
            ph_type: PlaceholderType::Title,
            idx: None,
        };
        let found = match_placeholder(&layout.placeholders, &title, true).unwrap();
        assert_eq!(found.placeholder.ph_type, PlaceholderType::CenterTitle);

        let date = Placeholder {
            ph_type: PlaceholderType::DateTime,
            idx: Some(10),
        };
        assert!(match_placeholder(&layout.placeholders, &date, true).is_none());
    }

    #[test]
    fn test_master_text_styles_and_theme() {
        let master = XmlDocument::parse(
            br#"<p:sldMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
                xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
              <p:cSld><p:spTree/></p:cSld>
              <p:txStyles>
                <p:titleStyle><a:lvl1pPr><a:defRPr sz="4400"><a:latin typeface="+mj-lt"/></a:defRPr></a:lvl1pPr></p:titleStyle>
                <p:bodyStyle><a:lvl1pPr><a:defRPr sz="2800"/></a:lvl1pPr></p:bodyStyle>
              </p:txStyles>
            </p:sldMaster>"#,
        )
        .unwrap();
        let master = SlideMaster::from_document("ppt/slideMasters/slideMaster1.xml", &master);
        let title = master.text_styles.get(TextStyleKind::Title).level(0).unwrap();
        assert_eq!(title.size, Some(4400));
        assert_eq!(title.font.as_deref(), Some("+mj-lt"));
        assert!(master.text_styles.get(TextStyleKind::Other).is_empty());

        let theme = XmlDocument::parse(
            br#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><a:themeElements>
              <a:fontScheme name="Office">
                <a:majorFont><a:latin typeface="Calibri Light"/></a:majorFont>
                <a:minorFont><a:latin typeface="Calibri"/></a:minorFont>
              </a:fontScheme></a:themeElements></a:theme>"#,
        )
        .unwrap();
        let fonts = ThemeFonts::from_document(&theme);
        assert_eq!(fonts.resolve("+mj-lt"), Some("Calibri Light"));
        assert_eq!(fonts.resolve("+mn-lt"), Some("Calibri"));
        assert_eq!(fonts.resolve("Arial"), Some("Arial"));
    }
}
