//! # slidequery-ooxml
//!
//! Read-only OOXML package plumbing for slidequery.
//!
//! This crate provides:
//! - Bounded ZIP archive access ([`OoxmlArchive`])
//! - Namespaced XML trees with document-order traversal ([`XmlDocument`])
//! - Relationship parts and target resolution ([`Relationships`])
//!
//! ## Example
//!
//! ```no_run
//! use slidequery_ooxml::{resolve_relationships, OoxmlArchive, QName};
//!
//! let mut archive = OoxmlArchive::open("deck.pptx")?;
//! let rels = resolve_relationships(&mut archive, "ppt/presentation.xml")?;
//! let presentation = archive.read_xml("ppt/presentation.xml")?;
//!
//! for id in presentation.root().descendants(&QName::p("sldId")) {
//!     let target = id.attr(&QName::r("id")).and_then(|rid| rels.resolve(rid));
//!     println!("{:?}", target);
//! }
//! # Ok::<(), slidequery_ooxml::OoxmlError>(())
//! ```

pub mod archive;
pub mod error;
pub mod relationships;
pub mod xml;

pub use archive::{ArchiveLimits, OoxmlArchive};
pub use error::{OoxmlError, Result};
pub use relationships::{
    rels_path_for, resolve_relationships, resolve_target, RelationshipTarget, Relationships,
};
pub use xml::{ElementRef, Namespace, NodeId, QName, XmlDocument};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
