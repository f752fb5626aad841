//! slidequery CLI - Command-line interface library
//!
//! Every command opens one presentation, runs one query and prints a JSON
//! envelope `{ archive, result, warnings }` on stdout. Logs go to stderr.
//!
//! # Library Usage
//!
//! ```ignore
//! use slidequery_cli::{overview_command, run_cli, Options};
//!
//! // Run the full CLI
//! run_cli()?;
//!
//! // Or use individual commands programmatically
//! let json = overview_command(&input, &Options::default(), "detailed")?;
//! ```
//!
//! # Binary Usage
//!
//! ```bash
//! # Everything, with per-run formatting
//! slidequery extract deck.pptx
//!
//! # Selected attributes
//! slidequery attributes deck.pptx --attribute title,notes
//!
//! # One slide
//! slidequery slide deck.pptx 3
//!
//! # Runs that are bold and at least 24pt
//! slidequery formatted deck.pptx "bold+size>=24"
//!
//! # Same, on slides 2 and 3 only, as one line of JSON
//! slidequery --compact formatted deck.pptx bold --slides 2,3
//!
//! # Formatting statistics
//! slidequery analyze deck.pptx
//!
//! # Slides with a table whose title mentions revenue
//! slidequery query deck.pptx --criteria '{"title": {"contains": "revenue"}, "content": {"has_tables": true}}' -f title,table_info
//!
//! # Table rows as flat records
//! slidequery tables deck.pptx --format flat --columns '{"specific_columns": ["Region"]}'
//!
//! # Structure overview
//! slidequery overview deck.pptx --depth detailed
//! ```

pub mod app;

// Re-export main entry point and commands
pub use app::{
    analyze_command, attributes_command, extract_command, formatted_command, overview_command,
    query_command, slide_command, tables_command,
};
pub use app::{run_cli, Envelope, Options};
