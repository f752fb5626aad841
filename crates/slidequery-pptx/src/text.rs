//! Text frames, paragraphs, runs and their explicit formatting
//!
//! Formatting fields are three-state: `None` means "not set here, inherit",
//! which is distinct from an explicit `Some(false)`. Fields only collapse
//! to concrete values in [`crate::formatting`].

use serde::Serialize;
use slidequery_ooxml::{ElementRef, QName};

/// Number of outline levels in a DrawingML list style
pub const LIST_LEVELS: usize = 9;

/// Explicitly set character formatting from one source element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strikethrough: Option<bool>,
    /// Latin typeface; may be a theme reference such as `+mn-lt`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    /// Size in hundredths of a point (`sz`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    /// `#RRGGBB` for literal colours, the scheme name for theme colours
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,
}

impl RunProperties {
    /// Read the properties of an `a:rPr`, `a:defRPr` or `a:endParaRPr` element
    pub fn from_element(el: ElementRef<'_>) -> Self {
        Self {
            bold: el.attr_plain("b").and_then(parse_bool),
            italic: el.attr_plain("i").and_then(parse_bool),
            underline: el.attr_plain("u").map(|u| u != "none"),
            strikethrough: el.attr_plain("strike").map(|s| s != "noStrike"),
            font: el
                .child(&QName::a("latin"))
                .and_then(|latin| latin.attr_plain("typeface"))
                .filter(|face| !face.is_empty())
                .map(str::to_string),
            size: el.attr_parse("sz"),
            color: el.child(&QName::a("solidFill")).and_then(color_value),
            highlight: el.child(&QName::a("highlight")).and_then(color_value),
        }
    }

    /// True if no field is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fill every unset field from `other`; set fields are kept
    pub fn inherit_from(&mut self, other: &RunProperties) {
        self.bold = self.bold.or(other.bold);
        self.italic = self.italic.or(other.italic);
        self.underline = self.underline.or(other.underline);
        self.strikethrough = self.strikethrough.or(other.strikethrough);
        self.size = self.size.or(other.size);
        if self.font.is_none() {
            self.font.clone_from(&other.font);
        }
        if self.color.is_none() {
            self.color.clone_from(&other.color);
        }
        if self.highlight.is_none() {
            self.highlight.clone_from(&other.highlight);
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "true" | "on" => Some(true),
        "0" | "false" | "off" => Some(false),
        _ => None,
    }
}

/// Colour of a fill-like element (`a:solidFill`, `a:highlight`)
pub(crate) fn color_value(fill: ElementRef<'_>) -> Option<String> {
    let child = fill.children().next()?;
    let value = match child.local_name() {
        "srgbClr" => format!("#{}", child.attr_plain("val")?.to_ascii_uppercase()),
        "sysClr" => format!("#{}", child.attr_plain("lastClr")?.to_ascii_uppercase()),
        "schemeClr" | "prstClr" => child.attr_plain("val")?.to_string(),
        _ => return None,
    };
    Some(value)
}

/// Per-level default run properties (`a:lstStyle`, `p:titleStyle`, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListStyle {
    /// From `a:defPPr`
    pub default: RunProperties,
    /// From `a:lvl1pPr` .. `a:lvl9pPr`; index is the 0-based paragraph level
    pub levels: Vec<RunProperties>,
}

impl ListStyle {
    /// Read a list style element; missing levels stay empty
    pub fn from_element(el: ElementRef<'_>) -> Self {
        let default = el
            .child(&QName::a("defPPr"))
            .and_then(|ppr| ppr.child(&QName::a("defRPr")))
            .map(RunProperties::from_element)
            .unwrap_or_default();

        let levels = (1..=LIST_LEVELS)
            .map(|n| {
                el.child(&QName::a(&format!("lvl{}pPr", n)))
                    .and_then(|ppr| ppr.child(&QName::a("defRPr")))
                    .map(RunProperties::from_element)
                    .unwrap_or_default()
            })
            .collect();

        Self { default, levels }
    }

    /// Properties for a 0-based paragraph level
    pub fn level(&self, level: u8) -> Option<&RunProperties> {
        self.levels.get(usize::from(level))
    }

    /// True if neither the default nor any level sets a field
    pub fn is_empty(&self) -> bool {
        self.default.is_empty() && self.levels.iter().all(RunProperties::is_empty)
    }
}

/// A run of text with uniform explicit formatting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Run {
    pub text: String,
    #[serde(skip_serializing_if = "RunProperties::is_empty")]
    pub properties: RunProperties,
    /// Resolved hyperlink target (URL, or part path for internal jumps)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hyperlink: Option<String>,
}

impl Run {
    /// Line breaks (`a:br`) are stored as runs holding a single newline
    pub fn is_break(&self) -> bool {
        self.text == "\n"
    }
}

/// A paragraph: outline level, paragraph-level defaults and runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Paragraph {
    /// 0-based outline level (`a:pPr@lvl`)
    pub level: u8,
    /// `a:pPr/a:defRPr`
    #[serde(skip_serializing_if = "RunProperties::is_empty")]
    pub properties: RunProperties,
    pub runs: Vec<Run>,
}

impl Paragraph {
    /// Concatenated run text
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// The text body of a shape or table cell
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TextFrame {
    pub paragraphs: Vec<Paragraph>,
    /// Shape-level `a:lstStyle`
    #[serde(skip)]
    pub list_style: ListStyle,
}

impl TextFrame {
    /// Paragraph texts joined with newlines
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// True if the frame holds no visible text
    pub fn is_blank(&self) -> bool {
        self.paragraphs
            .iter()
            .flat_map(|p| &p.runs)
            .all(|r| r.text.trim().is_empty())
    }

    /// Iterate all runs in document order
    pub fn runs(&self) -> impl Iterator<Item = (&Paragraph, &Run)> {
        self.paragraphs
            .iter()
            .flat_map(|p| p.runs.iter().map(move |r| (p, r)))
    }
}
