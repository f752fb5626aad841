//! Shape tree parsing for slide parts
//!
//! Turns a parsed slide part into [`Shape`]s. Relationship IDs met on the
//! way (pictures, hyperlinks) are resolved here against the slide's own
//! relationships, so the model never holds unresolved `r:id`s.

use slidequery_ooxml::{resolve_target, ElementRef, Namespace, QName, Relationships, XmlDocument};

use crate::builder::{BuildWarning, WarningKind};
use crate::layout::{Placeholder, PlaceholderType};
use crate::slide::{Geometry, OtherKind, Picture, Shape, ShapeKind, Table, TableCell, TableRow};
use crate::text::{Paragraph, Run, RunProperties, TextFrame, LIST_LEVELS};

/// Markup compatibility namespace (`mc:AlternateContent`)
const NS_MARKUP_COMPATIBILITY: &str =
    "http://schemas.openxmlformats.org/markup-compatibility/2006";

/// Per-part parsing state
pub(crate) struct PartContext<'a> {
    part: &'a str,
    rels: &'a Relationships,
    pub warnings: Vec<BuildWarning>,
    next_z: usize,
}

impl<'a> PartContext<'a> {
    pub fn new(part: &'a str, rels: &'a Relationships) -> Self {
        Self {
            part,
            rels,
            warnings: Vec::new(),
            next_z: 0,
        }
    }

    fn warn(&mut self, kind: WarningKind, detail: String) {
        self.warnings.push(BuildWarning::new(self.part, kind, detail));
    }

    fn z_order(&mut self) -> usize {
        let z = self.next_z;
        self.next_z += 1;
        z
    }
}

/// Parse the `p:cSld/p:spTree` of a slide document
pub(crate) fn parse_slide_shapes(doc: &XmlDocument, ctx: &mut PartContext<'_>) -> Vec<Shape> {
    match doc
        .root()
        .child(&QName::p("cSld"))
        .and_then(|c| c.child(&QName::p("spTree")))
    {
        Some(tree) => parse_shape_tree(tree, ctx),
        None => Vec::new(),
    }
}

/// Shapes directly inside a shape tree or group, in document order
fn parse_shape_tree(tree: ElementRef<'_>, ctx: &mut PartContext<'_>) -> Vec<Shape> {
    let mut shapes = Vec::new();
    for child in tree.children() {
        collect_shape(child, ctx, &mut shapes);
    }
    shapes
}

fn collect_shape(el: ElementRef<'_>, ctx: &mut PartContext<'_>, out: &mut Vec<Shape>) {
    if is_alternate_content(el) {
        // Fallback content is what a consumer without the extension sees
        let branch = el
            .children()
            .find(|c| c.local_name() == "Fallback")
            .or_else(|| el.children().find(|c| c.local_name() == "Choice"));
        if let Some(branch) = branch {
            for child in branch.children() {
                collect_shape(child, ctx, out);
            }
        }
        return;
    }

    if let Some(shape) = parse_shape(el, ctx) {
        out.push(shape);
    }
}

fn is_alternate_content(el: ElementRef<'_>) -> bool {
    el.local_name() == "AlternateContent"
        && matches!(&el.name().ns, Namespace::Other(ns) if ns == NS_MARKUP_COMPATIBILITY || ns == "mc")
}

fn parse_shape(el: ElementRef<'_>, ctx: &mut PartContext<'_>) -> Option<Shape> {
    if el.name().ns != Namespace::Presentation {
        return None;
    }
    let local = el.local_name();
    if !matches!(
        local,
        "sp" | "pic" | "graphicFrame" | "grpSp" | "cxnSp" | "contentPart"
    ) {
        return None;
    }

    let z_order = ctx.z_order();
    let cnv = non_visual(el).and_then(|nv| nv.child(&QName::p("cNvPr")));
    let name = cnv
        .and_then(|c| c.attr_plain("name"))
        .unwrap_or_default()
        .to_string();

    let kind = match local {
        "sp" => shape_kind(el, ctx),
        "pic" => picture_kind(el, cnv, ctx),
        "graphicFrame" => graphic_frame_kind(el, &name, ctx),
        "grpSp" => ShapeKind::Group {
            children: parse_shape_tree(el, ctx),
        },
        "cxnSp" => ShapeKind::Other {
            kind: OtherKind::Connector,
            text: None,
        },
        _ => ShapeKind::Other {
            kind: OtherKind::Unknown,
            text: None,
        },
    };

    Some(Shape {
        id: cnv.and_then(|c| c.attr_parse("id")),
        name,
        geometry: geometry(el),
        z_order,
        kind,
    })
}

/// `p:nvSpPr`, `p:nvPicPr`, `p:nvGraphicFramePr`, ...
fn non_visual(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.children().find(|c| c.local_name().starts_with("nv"))
}

fn geometry(el: ElementRef<'_>) -> Geometry {
    let xfrm = el
        .child(&QName::p("spPr"))
        .or_else(|| el.child(&QName::p("grpSpPr")))
        .and_then(|props| props.child(&QName::a("xfrm")))
        .or_else(|| el.child(&QName::p("xfrm")));

    let Some(xfrm) = xfrm else {
        return Geometry::default();
    };
    let off = xfrm.child(&QName::a("off"));
    let ext = xfrm.child(&QName::a("ext"));

    Geometry {
        x: off.and_then(|o| o.attr_parse("x")),
        y: off.and_then(|o| o.attr_parse("y")),
        width: ext.and_then(|e| e.attr_parse("cx")),
        height: ext.and_then(|e| e.attr_parse("cy")),
    }
}

fn shape_kind(el: ElementRef<'_>, ctx: &mut PartContext<'_>) -> ShapeKind {
    let text = el
        .child(&QName::p("txBody"))
        .map(|body| parse_text_body(body, ctx));

    if let Some(placeholder) = Placeholder::of_shape(el) {
        return ShapeKind::Placeholder {
            placeholder,
            text: text.unwrap_or_default(),
        };
    }

    let is_text_box = non_visual(el)
        .and_then(|nv| nv.child(&QName::p("cNvSpPr")))
        .and_then(|c| c.attr_plain("txBox"))
        .is_some_and(|v| v == "1" || v == "true");

    if is_text_box {
        ShapeKind::TextBox {
            text: text.unwrap_or_default(),
        }
    } else {
        ShapeKind::Other {
            kind: OtherKind::AutoShape,
            text,
        }
    }
}

fn picture_kind(
    el: ElementRef<'_>,
    cnv: Option<ElementRef<'_>>,
    ctx: &mut PartContext<'_>,
) -> ShapeKind {
    let nv_pr = non_visual(el).and_then(|nv| nv.child(&QName::p("nvPr")));
    let is_media = nv_pr.is_some_and(|nv| {
        nv.children().any(|c| {
            matches!(
                c.local_name(),
                "videoFile" | "audioFile" | "quickTimeFile" | "wavAudioFile"
            )
        }) || !nv.descendants_local("media").is_empty()
    });
    if is_media {
        return ShapeKind::Other {
            kind: OtherKind::Media,
            text: None,
        };
    }

    let image = el
        .first(&QName::a("blip"))
        .and_then(|blip| blip.attr(&QName::r("embed")))
        .and_then(|rid| {
            let resolved = ctx.rels.resolve(rid);
            if resolved.is_none() {
                ctx.warn(
                    WarningKind::UnresolvedReference,
                    format!("image relationship {} not found", rid),
                );
            }
            resolved
        });
    let format = image
        .as_deref()
        .and_then(|path| path.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());

    ShapeKind::Picture(Picture {
        image,
        format,
        description: cnv
            .and_then(|c| c.attr_plain("descr"))
            .filter(|d| !d.is_empty())
            .map(str::to_string),
    })
}

fn graphic_frame_kind(el: ElementRef<'_>, name: &str, ctx: &mut PartContext<'_>) -> ShapeKind {
    let other = |kind| ShapeKind::Other { kind, text: None };

    let Some(data) = el.first(&QName::a("graphicData")) else {
        return other(OtherKind::GraphicFrame);
    };
    let uri = data.attr_plain("uri").unwrap_or_default();

    if uri.ends_with("/table") {
        let Some(tbl) = data.child(&QName::a("tbl")) else {
            return other(OtherKind::GraphicFrame);
        };
        return match parse_table(tbl, ctx) {
            Ok(table) => ShapeKind::Table(table),
            Err(reason) => {
                ctx.warn(
                    WarningKind::RaggedTable,
                    format!("table '{}': {}", name, reason),
                );
                other(OtherKind::GraphicFrame)
            }
        };
    }

    if uri.contains("/chart") {
        other(OtherKind::Chart)
    } else if uri.contains("/diagram") {
        other(OtherKind::Diagram)
    } else if uri.contains("/ole") {
        other(OtherKind::OleObject)
    } else {
        other(OtherKind::GraphicFrame)
    }
}

/// Parse `a:tbl`; rows must match the declared grid
fn parse_table(tbl: ElementRef<'_>, ctx: &mut PartContext<'_>) -> Result<Table, String> {
    let columns = tbl
        .child(&QName::a("tblGrid"))
        .map(|grid| grid.children().filter(|c| c.is(&QName::a("gridCol"))).count())
        .unwrap_or(0);

    let mut rows = Vec::new();
    for (r, tr) in tbl
        .children()
        .filter(|c| c.is(&QName::a("tr")))
        .enumerate()
    {
        let cells: Vec<TableCell> = tr
            .children()
            .filter(|c| c.is(&QName::a("tc")))
            .map(|tc| parse_cell(tc, ctx))
            .collect();

        if cells.len() != columns {
            return Err(format!(
                "row {} has {} cells but the grid declares {} columns",
                r + 1,
                cells.len(),
                columns
            ));
        }

        rows.push(TableRow {
            height: tr.attr_parse("h"),
            cells,
        });
    }

    Ok(Table { columns, rows })
}

fn parse_cell(tc: ElementRef<'_>, ctx: &mut PartContext<'_>) -> TableCell {
    let flag = |name: &str| {
        tc.attr_plain(name)
            .is_some_and(|v| v == "1" || v == "true")
    };

    TableCell {
        text: tc
            .child(&QName::a("txBody"))
            .map(|body| parse_text_body(body, ctx))
            .unwrap_or_default(),
        grid_span: tc.attr_parse("gridSpan").unwrap_or(1),
        row_span: tc.attr_parse("rowSpan").unwrap_or(1),
        h_merge: flag("hMerge"),
        v_merge: flag("vMerge"),
    }
}

/// Parse a `p:txBody` or `a:txBody`
fn parse_text_body(body: ElementRef<'_>, ctx: &mut PartContext<'_>) -> TextFrame {
    let list_style = body
        .child(&QName::a("lstStyle"))
        .map(crate::text::ListStyle::from_element)
        .unwrap_or_default();

    let paragraphs = body
        .children()
        .filter(|c| c.is(&QName::a("p")))
        .map(|p| parse_paragraph(p, ctx))
        .collect();

    TextFrame {
        paragraphs,
        list_style,
    }
}

fn parse_paragraph(p: ElementRef<'_>, ctx: &mut PartContext<'_>) -> Paragraph {
    let ppr = p.child(&QName::a("pPr"));
    let level = ppr
        .and_then(|ppr| ppr.attr_parse::<u8>("lvl"))
        .unwrap_or(0)
        .min((LIST_LEVELS - 1) as u8);
    let properties = ppr
        .and_then(|ppr| ppr.child(&QName::a("defRPr")))
        .map(RunProperties::from_element)
        .unwrap_or_default();

    let mut runs = Vec::new();
    for child in p.children() {
        if child.name().ns != Namespace::Drawing {
            continue;
        }
        match child.local_name() {
            "r" | "fld" => {
                let rpr = child.child(&QName::a("rPr"));
                runs.push(Run {
                    text: child
                        .child(&QName::a("t"))
                        .map(|t| t.text().to_string())
                        .unwrap_or_default(),
                    properties: rpr.map(RunProperties::from_element).unwrap_or_default(),
                    hyperlink: rpr
                        .and_then(|rpr| rpr.child(&QName::a("hlinkClick")))
                        .and_then(|link| resolve_hyperlink(link, ctx)),
                });
            }
            "br" => runs.push(Run {
                text: "\n".to_string(),
                properties: child
                    .child(&QName::a("rPr"))
                    .map(RunProperties::from_element)
                    .unwrap_or_default(),
                hyperlink: None,
            }),
            _ => {}
        }
    }

    Paragraph {
        level,
        properties,
        runs,
    }
}

fn resolve_hyperlink(link: ElementRef<'_>, ctx: &mut PartContext<'_>) -> Option<String> {
    let rid = link.attr(&QName::r("id")).filter(|id| !id.is_empty());
    let Some(rid) = rid else {
        // Actions such as ppaction://hlinkshowjump carry no relationship
        return link.attr_plain("action").map(str::to_string);
    };

    match ctx.rels.get_target(rid) {
        Some(rel) if rel.is_external() => Some(rel.target.clone()),
        Some(rel) => Some(resolve_target(ctx.rels.source(), &rel.target)),
        None => {
            ctx.warn(
                WarningKind::UnresolvedReference,
                format!("hyperlink relationship {} not found", rid),
            );
            None
        }
    }
}

/// Text of the body placeholders of a notes slide
pub(crate) fn notes_text(doc: &XmlDocument) -> Option<String> {
    let paragraphs: Vec<String> = doc
        .root()
        .descendants(&QName::p("sp"))
        .into_iter()
        .filter(|sp| {
            Placeholder::of_shape(*sp).is_some_and(|ph| ph.ph_type == PlaceholderType::Body)
        })
        .flat_map(|sp| sp.descendants(&QName::a("p")))
        .map(|p| {
            p.descendants(&QName::a("t"))
                .iter()
                .map(|t| t.text())
                .collect::<String>()
        })
        .collect();

    let text = paragraphs.join("\n");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
