//! Namespaced XML document trees
//!
//! Parts are parsed into an arena of elements in document order. Element
//! and attribute prefixes are resolved against the declarations in scope,
//! falling back to the fixed OOXML prefix table (`p`, `a`, `r`). Anything
//! else is kept as an opaque [`Namespace::Other`] so vendor extensions
//! survive parsing.

use std::fmt;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{OoxmlError, Result};

/// PresentationML namespace
pub const NS_PRESENTATION: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";

/// DrawingML namespace
pub const NS_DRAWING: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

/// Office document relationships namespace (`r:id`, `r:embed`, ...)
pub const NS_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Part name used when parsing bytes that did not come from an archive
const ANONYMOUS_PART: &str = "<memory>";

/// Resolved namespace of an element or attribute name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// No namespace (unprefixed attributes, undeclared default namespace)
    None,
    /// PresentationML (`p:`)
    Presentation,
    /// DrawingML (`a:`)
    Drawing,
    /// Office relationships (`r:`)
    Relationships,
    /// Any other namespace: the URI when one was declared, otherwise the
    /// raw prefix
    Other(String),
}

impl Namespace {
    /// Map a namespace URI to a known namespace
    pub fn from_uri(uri: &str) -> Self {
        match uri {
            NS_PRESENTATION => Self::Presentation,
            NS_DRAWING => Self::Drawing,
            NS_RELATIONSHIPS => Self::Relationships,
            other => Self::Other(other.to_string()),
        }
    }

    /// Fixed prefix table used when a document omits its declarations
    fn from_well_known_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "p" => Some(Self::Presentation),
            "a" => Some(Self::Drawing),
            "r" => Some(Self::Relationships),
            _ => None,
        }
    }

    /// The URI for this namespace, if known
    pub fn uri(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Presentation => Some(NS_PRESENTATION),
            Self::Drawing => Some(NS_DRAWING),
            Self::Relationships => Some(NS_RELATIONSHIPS),
            Self::Other(uri) => Some(uri),
        }
    }
}

/// A namespace-qualified local name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub ns: Namespace,
    pub local: String,
}

impl QName {
    pub fn new(ns: Namespace, local: impl Into<String>) -> Self {
        Self {
            ns,
            local: local.into(),
        }
    }

    /// PresentationML name
    pub fn p(local: &str) -> Self {
        Self::new(Namespace::Presentation, local)
    }

    /// DrawingML name
    pub fn a(local: &str) -> Self {
        Self::new(Namespace::Drawing, local)
    }

    /// Relationships name
    pub fn r(local: &str) -> Self {
        Self::new(Namespace::Relationships, local)
    }

    /// Name without a namespace (plain attributes)
    pub fn unqualified(local: &str) -> Self {
        Self::new(Namespace::None, local)
    }

    /// Name in an arbitrary namespace URI
    pub fn other(uri: &str, local: &str) -> Self {
        Self::new(Namespace::from_uri(uri), local)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns {
            Namespace::None => write!(f, "{}", self.local),
            Namespace::Presentation => write!(f, "p:{}", self.local),
            Namespace::Drawing => write!(f, "a:{}", self.local),
            Namespace::Relationships => write!(f, "r:{}", self.local),
            Namespace::Other(ns) => write!(f, "{{{}}}{}", ns, self.local),
        }
    }
}

/// Index of an element in a document's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Attribute {
    name: QName,
    value: String,
}

#[derive(Debug, Clone)]
struct Element {
    name: QName,
    attributes: Vec<Attribute>,
    children: Vec<NodeId>,
    /// Direct character data, concatenated
    text: String,
    /// One past the last descendant in the arena
    end: usize,
}

/// A parsed XML part
#[derive(Debug, Clone)]
pub struct XmlDocument {
    part: String,
    nodes: Vec<Element>,
}

impl XmlDocument {
    /// Parse a document from bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        Self::parse_part(ANONYMOUS_PART, xml)
    }

    /// Parse a document from bytes, naming the part in any error
    pub fn parse_part(part: &str, xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        // Whitespace inside a:t is content
        reader.config_mut().trim_text(false);

        let mut builder = TreeBuilder::new(part);
        let mut buf = Vec::new();

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|e| OoxmlError::MalformedXml {
                part: part.to_string(),
                offset: Some(reader.error_position() as u64),
                message: e.to_string(),
            })?;

            match event {
                Event::Start(ref e) => builder.open(e, false, reader.buffer_position() as u64)?,
                Event::Empty(ref e) => builder.open(e, true, reader.buffer_position() as u64)?,
                Event::End(_) => builder.close(),
                Event::Text(ref e) => {
                    let text = e.unescape().map_err(|err| OoxmlError::MalformedXml {
                        part: part.to_string(),
                        offset: Some(reader.buffer_position() as u64),
                        message: err.to_string(),
                    })?;
                    builder.text(&text);
                }
                Event::CData(e) => {
                    let raw = e.into_inner();
                    builder.text(&String::from_utf8_lossy(&raw));
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        builder.finish(reader.buffer_position() as u64)
    }

    /// Name of the part this document was parsed from
    pub fn part(&self) -> &str {
        &self.part
    }

    /// The document element
    pub fn root(&self) -> ElementRef<'_> {
        ElementRef {
            doc: self,
            id: NodeId(0),
        }
    }

    /// Total number of elements
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false for a successfully parsed document
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All elements matching `name` anywhere in the document, in document order
    pub fn descendants(&self, name: &QName) -> Vec<ElementRef<'_>> {
        let root = self.root();
        let mut found = Vec::new();
        if root.is(name) {
            found.push(root);
        }
        found.extend(root.descendants(name));
        found
    }
}

/// Borrowed handle to an element of an [`XmlDocument`]
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    doc: &'a XmlDocument,
    id: NodeId,
}

impl fmt::Debug for ElementRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.name())
    }
}

impl PartialEq for ElementRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl<'a> ElementRef<'a> {
    fn element(&self) -> &'a Element {
        &self.doc.nodes[self.id.0]
    }

    fn at(&self, index: usize) -> ElementRef<'a> {
        ElementRef {
            doc: self.doc,
            id: NodeId(index),
        }
    }

    /// Arena index of this element
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Qualified name
    pub fn name(&self) -> &'a QName {
        &self.element().name
    }

    /// Local name without namespace
    pub fn local_name(&self) -> &'a str {
        &self.element().name.local
    }

    /// Check the element's qualified name
    pub fn is(&self, name: &QName) -> bool {
        self.element().name == *name
    }

    /// Attribute value by qualified name
    pub fn attr(&self, name: &QName) -> Option<&'a str> {
        self.element()
            .attributes
            .iter()
            .find(|a| a.name == *name)
            .map(|a| a.value.as_str())
    }

    /// Unprefixed attribute value (the common case in OOXML)
    pub fn attr_plain(&self, local: &str) -> Option<&'a str> {
        self.element()
            .attributes
            .iter()
            .find(|a| a.name.ns == Namespace::None && a.name.local == local)
            .map(|a| a.value.as_str())
    }

    /// Parse an unprefixed attribute, ignoring unparseable values
    pub fn attr_parse<T: std::str::FromStr>(&self, local: &str) -> Option<T> {
        self.attr_plain(local).and_then(|v| v.trim().parse().ok())
    }

    /// Direct character data of this element
    pub fn text(&self) -> &'a str {
        &self.element().text
    }

    /// Direct child elements in document order
    pub fn children(&self) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        let doc = self.doc;
        self.element()
            .children
            .iter()
            .map(move |id| ElementRef { doc, id: *id })
    }

    /// First direct child with the given name
    pub fn child(&self, name: &QName) -> Option<ElementRef<'a>> {
        self.children().find(|c| c.is(name))
    }

    /// All descendants (any depth, excluding self) with the given name, in
    /// document order
    pub fn descendants(&self, name: &QName) -> Vec<ElementRef<'a>> {
        let start = self.id.0 + 1;
        let end = self.element().end;
        (start..end)
            .map(|i| self.at(i))
            .filter(|e| e.is(name))
            .collect()
    }

    /// First descendant with the given name
    pub fn first(&self, name: &QName) -> Option<ElementRef<'a>> {
        let start = self.id.0 + 1;
        let end = self.element().end;
        (start..end).map(|i| self.at(i)).find(|e| e.is(name))
    }

    /// Descendants matching a local name in any namespace
    pub fn descendants_local(&self, local: &str) -> Vec<ElementRef<'a>> {
        let start = self.id.0 + 1;
        let end = self.element().end;
        (start..end)
            .map(|i| self.at(i))
            .filter(|e| e.local_name() == local)
            .collect()
    }

    /// Check whether `other` lies inside this element's subtree
    pub fn contains(&self, other: &ElementRef<'_>) -> bool {
        std::ptr::eq(self.doc, other.doc)
            && other.id.0 > self.id.0
            && other.id.0 < self.element().end
    }
}

/// Incremental arena construction from reader events
struct TreeBuilder<'p> {
    part: &'p str,
    nodes: Vec<Element>,
    /// Open elements, innermost last
    stack: Vec<usize>,
    /// In-scope prefix declarations: (prefix, uri); `None` is the default
    scopes: Vec<(Option<String>, String)>,
    /// Number of declarations pushed by each open element
    scope_counts: Vec<usize>,
    closed_root: bool,
}

impl<'p> TreeBuilder<'p> {
    fn new(part: &'p str) -> Self {
        Self {
            part,
            nodes: Vec::new(),
            stack: Vec::new(),
            scopes: Vec::new(),
            scope_counts: Vec::new(),
            closed_root: false,
        }
    }

    fn malformed(&self, offset: u64, message: impl Into<String>) -> OoxmlError {
        OoxmlError::MalformedXml {
            part: self.part.to_string(),
            offset: Some(offset),
            message: message.into(),
        }
    }

    fn resolve(&self, prefix: Option<&str>) -> Namespace {
        let declared = self
            .scopes
            .iter()
            .rev()
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.as_str());

        match (declared, prefix) {
            (Some(""), _) => Namespace::None,
            (Some(uri), _) => Namespace::from_uri(uri),
            (None, None) => Namespace::None,
            (None, Some(p)) => Namespace::from_well_known_prefix(p)
                .unwrap_or_else(|| Namespace::Other(p.to_string())),
        }
    }

    fn open(&mut self, e: &BytesStart, empty: bool, offset: u64) -> Result<()> {
        if self.stack.is_empty() && (self.closed_root || !self.nodes.is_empty()) {
            return Err(self.malformed(offset, "more than one root element"));
        }

        // Namespace declarations first, so they apply to this element's own name
        let mut raw_attributes = Vec::new();
        let mut declared = 0;
        for attr in e.attributes() {
            let attr = attr.map_err(|err| self.malformed(offset, err.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| self.malformed(offset, err.to_string()))?
                .into_owned();

            if key == "xmlns" {
                self.scopes.push((None, value));
                declared += 1;
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                self.scopes.push((Some(prefix.to_string()), value));
                declared += 1;
            } else {
                raw_attributes.push((key, value));
            }
        }

        let raw_name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let (prefix, local) = split_prefix(&raw_name);
        let name = QName::new(self.resolve(prefix), local);

        let attributes = raw_attributes
            .into_iter()
            .map(|(key, value)| {
                let (prefix, local) = split_prefix(&key);
                // Unprefixed attributes never take the default namespace
                let ns = match prefix {
                    Some(_) => self.resolve(prefix),
                    None => Namespace::None,
                };
                Attribute {
                    name: QName::new(ns, local),
                    value,
                }
            })
            .collect();

        let index = self.nodes.len();
        self.nodes.push(Element {
            name,
            attributes,
            children: Vec::new(),
            text: String::new(),
            end: index + 1,
        });
        if let Some(&parent) = self.stack.last() {
            self.nodes[parent].children.push(NodeId(index));
        }

        if empty {
            self.scopes.truncate(self.scopes.len() - declared);
            if self.stack.is_empty() {
                self.closed_root = true;
            }
        } else {
            self.stack.push(index);
            self.scope_counts.push(declared);
        }
        Ok(())
    }

    fn close(&mut self) {
        if let Some(index) = self.stack.pop() {
            self.nodes[index].end = self.nodes.len();
            let declared = self.scope_counts.pop().unwrap_or(0);
            self.scopes.truncate(self.scopes.len() - declared);
            if self.stack.is_empty() {
                self.closed_root = true;
            }
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(&index) = self.stack.last() {
            self.nodes[index].text.push_str(text);
        }
    }

    fn finish(self, offset: u64) -> Result<XmlDocument> {
        if !self.stack.is_empty() {
            return Err(self.malformed(offset, "unexpected end of document"));
        }
        if self.nodes.is_empty() {
            return Err(self.malformed(offset, "document has no root element"));
        }
        Ok(XmlDocument {
            part: self.part.to_string(),
            nodes: self.nodes,
        })
    }
}

fn split_prefix(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}
