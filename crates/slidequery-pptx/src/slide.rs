//! Slides and their shape trees
//!
//! Shapes are an owned tree: only [`ShapeKind::Group`] has children.
//! Traversal is always document order.

use serde::Serialize;

use crate::layout::{Placeholder, PlaceholderType};
use crate::text::TextFrame;

/// A slide in presentation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    /// `p:sldId@id` from the presentation's slide list
    pub id: u32,
    /// `p:sldId@r:id`, scoped to the presentation part
    pub rel_id: String,
    /// Archive path of the slide part, when the relationship resolved
    pub part: Option<String>,
    /// Index into [`crate::Presentation::layouts`]
    pub layout: Option<usize>,
    pub shapes: Vec<Shape>,
    /// Speaker notes text
    pub notes: Option<String>,
}

impl Slide {
    /// A slide with no content, used when its part cannot be read
    pub fn empty(id: u32, rel_id: impl Into<String>, part: Option<String>) -> Self {
        Self {
            id,
            rel_id: rel_id.into(),
            part,
            layout: None,
            shapes: Vec::new(),
            notes: None,
        }
    }

    /// Every shape including group members, in document order
    pub fn all_shapes(&self) -> Vec<&Shape> {
        let mut out = Vec::new();
        for shape in &self.shapes {
            shape.collect_into(&mut out);
        }
        out
    }

    /// Text of the first non-empty title placeholder
    pub fn title(&self) -> Option<String> {
        self.placeholder_text(|t| t.is_title())
    }

    /// Text of the first non-empty placeholder matching `accept`
    pub fn placeholder_text(&self, accept: impl Fn(PlaceholderType) -> bool) -> Option<String> {
        self.all_shapes().into_iter().find_map(|shape| match &shape.kind {
            ShapeKind::Placeholder { placeholder, text } if accept(placeholder.ph_type) => {
                let text = text.text();
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            _ => None,
        })
    }
}

/// A shape on a slide
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shape {
    /// `p:cNvPr@id`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    /// `p:cNvPr@name`
    pub name: String,
    pub geometry: Geometry,
    /// Document order within the slide, counting group members
    pub z_order: usize,
    #[serde(flatten)]
    pub kind: ShapeKind,
}

impl Shape {
    fn collect_into<'a>(&'a self, out: &mut Vec<&'a Shape>) {
        out.push(self);
        if let ShapeKind::Group { children } = &self.kind {
            for child in children {
                child.collect_into(out);
            }
        }
    }

    /// Direct text body, if this shape has one
    pub fn text_frame(&self) -> Option<&TextFrame> {
        match &self.kind {
            ShapeKind::TextBox { text } | ShapeKind::Placeholder { text, .. } => Some(text),
            ShapeKind::Other { text, .. } => text.as_ref(),
            _ => None,
        }
    }

    pub fn placeholder(&self) -> Option<&Placeholder> {
        match &self.kind {
            ShapeKind::Placeholder { placeholder, .. } => Some(placeholder),
            _ => None,
        }
    }

    /// Short variant name used in counts and overviews
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            ShapeKind::TextBox { .. } => "text_box",
            ShapeKind::Placeholder { .. } => "placeholder",
            ShapeKind::Table(_) => "table",
            ShapeKind::Picture(_) => "picture",
            ShapeKind::Group { .. } => "group",
            ShapeKind::Other { kind, .. } => kind.name(),
        }
    }
}

/// Position and size in EMU; each field is unknown when the source omits it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Geometry {
    pub x: Option<i64>,
    pub y: Option<i64>,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

impl Geometry {
    pub fn is_known(&self) -> bool {
        self.x.is_some() && self.y.is_some() && self.width.is_some() && self.height.is_some()
    }
}

/// Shape variants
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "shape_type", rename_all = "snake_case")]
pub enum ShapeKind {
    /// `p:sp` with `txBox="1"`
    TextBox { text: TextFrame },
    /// `p:sp` carrying a `p:ph` role
    Placeholder {
        placeholder: Placeholder,
        text: TextFrame,
    },
    /// `p:graphicFrame` holding an `a:tbl`
    Table(Table),
    /// `p:pic`
    Picture(Picture),
    /// `p:grpSp`
    Group { children: Vec<Shape> },
    /// Everything else: auto shapes, charts, media, connectors, ...
    Other {
        kind: OtherKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<TextFrame>,
    },
}

/// Classification of [`ShapeKind::Other`] shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OtherKind {
    /// `p:sp` that is neither a text box nor a placeholder
    AutoShape,
    Chart,
    Diagram,
    Media,
    Connector,
    OleObject,
    /// Graphic frame with unrecognized or unusable content
    GraphicFrame,
    /// `p:contentPart` and unknown elements
    Unknown,
}

impl OtherKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AutoShape => "auto_shape",
            Self::Chart => "chart",
            Self::Diagram => "diagram",
            Self::Media => "media",
            Self::Connector => "connector",
            Self::OleObject => "ole_object",
            Self::GraphicFrame => "graphic_frame",
            Self::Unknown => "unknown",
        }
    }
}

/// Picture metadata; the image bytes are never read
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Picture {
    /// Archive path of the image part
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Lower-case file extension of the image part
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Alt text (`p:cNvPr@descr`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A table: row-major grid whose rows all match the declared column count
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    /// Declared grid columns (`a:tblGrid/a:gridCol`)
    pub columns: usize,
    pub rows: Vec<TableRow>,
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell text in row-major order
    pub fn grid(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.cells.iter().map(|c| c.text.text()).collect())
            .collect()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&TableCell> {
        self.rows.get(row)?.cells.get(column)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableRow {
    /// Row height in EMU
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCell {
    pub text: TextFrame,
    /// Columns spanned by this cell (`gridSpan`)
    pub grid_span: u32,
    /// Rows spanned by this cell (`rowSpan`)
    pub row_span: u32,
    /// Covered by a horizontal merge from the left
    pub h_merge: bool,
    /// Covered by a vertical merge from above
    pub v_merge: bool,
}

impl Default for TableCell {
    fn default() -> Self {
        Self {
            text: TextFrame::default(),
            grid_span: 1,
            row_span: 1,
            h_merge: false,
            v_merge: false,
        }
    }
}

impl TableCell {
    /// Whether the cell anchors or continues a merge
    pub fn is_merged(&self) -> bool {
        self.grid_span > 1 || self.row_span > 1 || self.h_merge || self.v_merge
    }
}
