//! Effective formatting resolution
//!
//! A run's formatting is the fold of an ordered list of sources, first set
//! value wins per field:
//!
//! 1. the run's `a:rPr`
//! 2. the paragraph's `a:pPr/a:defRPr`
//! 3. the shape's `a:lstStyle` (paragraph level, then `a:defPPr`)
//! 4. the matching layout placeholder's list style
//! 5. the matching master placeholder's list style
//! 6. the master's `p:txStyles` (title, body or other)
//! 7. the presentation's `p:defaultTextStyle`
//!
//! Fields unset everywhere fall back to fixed defaults. Nothing is cached;
//! each call walks the chain again.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::constants::SIZE_UNITS_PER_POINT;
use crate::error::PptxError;
use crate::layout::{match_placeholder, Placeholder, SlideMaster, TextStyleKind};
use crate::presentation::Presentation;
use crate::slide::{Shape, ShapeKind, Slide};
use crate::text::{ListStyle, Paragraph, Run, RunProperties, TextFrame};

/// Typeface used when neither the chain nor the theme names one
pub const DEFAULT_FONT: &str = "Calibri";

/// Text colour used when the chain sets none
pub const DEFAULT_COLOR: &str = "#000000";

/// Fully resolved formatting of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveFormatting {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub font: String,
    /// Points
    pub size: f64,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hyperlink: Option<String>,
}

/// A run together with everything its formatting depends on
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    pub slide: &'a Slide,
    /// The shape owning the text (the table frame for cell text)
    pub shape: &'a Shape,
    pub frame: &'a TextFrame,
    pub paragraph: &'a Paragraph,
    pub run: &'a Run,
}

impl<'a> RunContext<'a> {
    pub fn placeholder(&self) -> Option<&'a Placeholder> {
        self.shape.placeholder()
    }
}

/// Every run of a slide in document order, table cells and group members
/// included
pub fn slide_runs(slide: &Slide) -> Vec<RunContext<'_>> {
    let mut out = Vec::new();
    for shape in slide.all_shapes() {
        let frames: Vec<&TextFrame> = match &shape.kind {
            ShapeKind::Table(table) => table
                .rows
                .iter()
                .flat_map(|row| row.cells.iter().map(|cell| &cell.text))
                .collect(),
            _ => shape.text_frame().into_iter().collect(),
        };

        for frame in frames {
            for (paragraph, run) in frame.runs() {
                out.push(RunContext {
                    slide,
                    shape,
                    frame,
                    paragraph,
                    run,
                });
            }
        }
    }
    out
}

/// The ordered formatting sources for a run, most specific first
pub fn formatting_sources<'a>(
    presentation: &'a Presentation,
    ctx: &RunContext<'a>,
) -> Vec<&'a RunProperties> {
    let level = ctx.paragraph.level;
    let mut sources = vec![&ctx.run.properties, &ctx.paragraph.properties];

    let mut push_style = |style: &'a ListStyle| {
        if let Some(props) = style.level(level) {
            sources.push(props);
        }
        sources.push(&style.default);
    };

    push_style(&ctx.frame.list_style);

    let placeholder = ctx.placeholder();
    let master = presentation.master_of(ctx.slide);

    if let Some(ph) = placeholder {
        if let Some(layout) = presentation.layout_of(ctx.slide) {
            if let Some(inherited) = match_placeholder(&layout.placeholders, ph, true) {
                push_style(&inherited.list_style);
            }
        }
        if let Some(master) = master {
            if let Some(inherited) = match_placeholder(&master.placeholders, ph, false) {
                push_style(&inherited.list_style);
            }
        }
    }

    if let Some(master) = master {
        let kind = placeholder
            .map(|ph| ph.ph_type.text_style())
            .unwrap_or(TextStyleKind::Other);
        push_style(master.text_styles.get(kind));
    }

    push_style(&presentation.default_text_style);
    sources
}

/// Resolve a run's effective formatting
pub fn effective_formatting(presentation: &Presentation, ctx: &RunContext<'_>) -> EffectiveFormatting {
    let mut merged = RunProperties::default();
    for source in formatting_sources(presentation, ctx) {
        merged.inherit_from(source);
    }

    let placeholder = ctx.placeholder();
    let is_title = placeholder.is_some_and(|ph| ph.ph_type.is_title());
    let master = presentation.master_of(ctx.slide);

    EffectiveFormatting {
        bold: merged.bold.unwrap_or(false),
        italic: merged.italic.unwrap_or(false),
        underline: merged.underline.unwrap_or(false),
        strikethrough: merged.strikethrough.unwrap_or(false),
        font: resolve_font(merged.font.as_deref(), master, is_title),
        size: merged
            .size
            .map(|hundredths| f64::from(hundredths) / f64::from(SIZE_UNITS_PER_POINT))
            .unwrap_or_else(|| {
                placeholder
                    .map(|ph| ph.ph_type.default_font_size())
                    .unwrap_or(18.0)
            }),
        color: merged.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        highlight: merged.highlight,
        hyperlink: ctx.run.hyperlink.clone(),
    }
}

fn resolve_font(font: Option<&str>, master: Option<&SlideMaster>, is_title: bool) -> String {
    let theme = master.map(|m| &m.theme_fonts);
    let theme_default = theme.and_then(|fonts| {
        if is_title {
            fonts.major.as_deref()
        } else {
            fonts.minor.as_deref()
        }
    });

    font.and_then(|face| match theme {
        Some(fonts) => fonts.resolve(face),
        None if face.starts_with('+') => None,
        None => Some(face),
    })
    .or(theme_default)
    .unwrap_or(DEFAULT_FONT)
    .to_string()
}

/// A test over effective formatting
#[derive(Debug, Clone, PartialEq)]
pub enum FormattingPredicate {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Highlight,
    Hyperlink,
    /// Typeface, compared case-insensitively
    Font(String),
    /// `#RRGGBB` or scheme colour name, compared case-insensitively
    Color(String),
    /// At least this many points
    MinSize(f64),
    /// Every inner predicate holds
    All(Vec<FormattingPredicate>),
}

impl FormattingPredicate {
    pub fn matches(&self, formatting: &EffectiveFormatting) -> bool {
        match self {
            Self::Bold => formatting.bold,
            Self::Italic => formatting.italic,
            Self::Underline => formatting.underline,
            Self::Strikethrough => formatting.strikethrough,
            Self::Highlight => formatting.highlight.is_some(),
            Self::Hyperlink => formatting.hyperlink.is_some(),
            Self::Font(name) => formatting.font.eq_ignore_ascii_case(name),
            Self::Color(color) => formatting.color.eq_ignore_ascii_case(color),
            Self::MinSize(points) => formatting.size >= *points,
            Self::All(all) => all.iter().all(|p| p.matches(formatting)),
        }
    }

    fn parse_term(input: &str, term: &str) -> Result<Self, PptxError> {
        let lower = term.to_ascii_lowercase();
        let predicate = match lower.as_str() {
            "bold" => Self::Bold,
            "italic" => Self::Italic,
            "underline" | "underlined" => Self::Underline,
            "strikethrough" | "strike" => Self::Strikethrough,
            "highlight" | "highlighted" => Self::Highlight,
            "hyperlink" | "link" => Self::Hyperlink,
            _ => {
                if let Some((key, value)) = term.split_once(':') {
                    let value = unquote(value.trim());
                    if value.is_empty() {
                        return Err(PptxError::invalid_predicate(input, format!("'{}' needs a value", key)));
                    }
                    match key.trim().to_ascii_lowercase().as_str() {
                        "font" => Self::Font(value.to_string()),
                        "color" | "colour" => Self::Color(normalize_color(value)),
                        other => {
                            return Err(PptxError::invalid_predicate(
                                input,
                                format!("unknown key '{}'", other),
                            ))
                        }
                    }
                } else if let Some(points) = lower.strip_prefix("size>=") {
                    let points: f64 = points.trim().parse().map_err(|_| {
                        PptxError::invalid_predicate(input, format!("'{}' is not a size", points))
                    })?;
                    Self::MinSize(points)
                } else {
                    return Err(PptxError::invalid_predicate(
                        input,
                        format!("unknown term '{}'", term),
                    ));
                }
            }
        };
        Ok(predicate)
    }
}

/// Split on `+` outside double quotes
fn split_terms(input: &str) -> Result<Vec<&str>, PptxError> {
    let mut terms = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (i, c) in input.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '+' if !quoted => {
                terms.push(input[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if quoted {
        return Err(PptxError::invalid_predicate(input, "unterminated quote"));
    }
    terms.push(input[start..].trim());
    Ok(terms)
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .trim()
}

fn normalize_color(value: &str) -> String {
    let hex = value.strip_prefix('#').unwrap_or(value);
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        format!("#{}", hex.to_ascii_uppercase())
    } else {
        value.to_string()
    }
}

impl FromStr for FormattingPredicate {
    type Err = PptxError;

    /// `bold`, `font:Arial`, `color:#FF0000`, `size>=24`, `bold+italic`.
    /// Values holding `+` are written in double quotes: `font:"Foo+Bar"`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let terms = split_terms(input)?;
        if terms.iter().any(|t| t.is_empty()) {
            return Err(PptxError::invalid_predicate(input, "empty term"));
        }

        let mut predicates = terms
            .iter()
            .map(|term| Self::parse_term(input, term))
            .collect::<Result<Vec<_>, _>>()?;

        if predicates.len() == 1 {
            Ok(predicates.remove(0))
        } else {
            Ok(Self::All(predicates))
        }
    }
}

impl fmt::Display for FormattingPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bold => write!(f, "bold"),
            Self::Italic => write!(f, "italic"),
            Self::Underline => write!(f, "underline"),
            Self::Strikethrough => write!(f, "strikethrough"),
            Self::Highlight => write!(f, "highlight"),
            Self::Hyperlink => write!(f, "hyperlink"),
            Self::Font(name) if name.contains('+') => write!(f, "font:\"{}\"", name),
            Self::Font(name) => write!(f, "font:{}", name),
            Self::Color(color) => write!(f, "color:{}", color),
            Self::MinSize(points) => write!(f, "size>={}", points),
            Self::All(all) => {
                let parts: Vec<String> = all.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join("+"))
            }
        }
    }
}
