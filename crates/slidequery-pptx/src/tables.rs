//! Table extraction
//!
//! Pulls tables out of selected slides as header-keyed data. The first row
//! of every table is its header row; the remaining rows are data. Tables
//! can be filtered by size and header content, columns narrowed by name or
//! pattern, and the result shaped three ways:
//!
//! - `structured`: one entry per table with headers and rows of cells
//! - `flat`: one record per data row across all tables
//! - `grouped_by_slide`: structured tables nested under their slide

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{PptxError, Result};
use crate::formatting::{effective_formatting, EffectiveFormatting, RunContext, DEFAULT_COLOR};
use crate::query::QueryEngine;
use crate::search::compile_pattern;
use crate::slide::{Geometry, Shape, ShapeKind, Slide, Table, TableCell};

/// Size and header conditions a table must meet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableCriteria {
    /// Bounds on the row count, header row included
    pub min_rows: Option<usize>,
    pub max_rows: Option<usize>,
    pub min_columns: Option<usize>,
    pub max_columns: Option<usize>,
    /// Each entry must appear in some header (case-insensitive substring)
    pub header_contains: Vec<String>,
    /// Each pattern must match some header
    pub header_patterns: Vec<String>,
}

impl TableCriteria {
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|err| PptxError::invalid_criteria(input, err))
    }
}

/// Which columns to keep
///
/// `specific_columns` wins over `column_patterns` when both are given;
/// `exclude_columns` is applied last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnSelection {
    /// Exact header names (case-insensitive)
    pub specific_columns: Vec<String>,
    pub column_patterns: Vec<String>,
    pub exclude_columns: Vec<String>,
}

impl ColumnSelection {
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|err| PptxError::invalid_criteria(input, err))
    }
}

/// Shape of the extraction result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableOutput {
    #[default]
    Structured,
    Flat,
    GroupedBySlide,
}

impl TableOutput {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Flat => "flat",
            Self::GroupedBySlide => "grouped_by_slide",
        }
    }
}

impl FromStr for TableOutput {
    type Err = PptxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "structured" => Ok(Self::Structured),
            "flat" => Ok(Self::Flat),
            "grouped_by_slide" => Ok(Self::GroupedBySlide),
            other => Err(PptxError::unknown_field(
                other,
                &["structured", "flat", "grouped_by_slide"],
            )),
        }
    }
}

impl fmt::Display for TableOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A table extraction request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRequest {
    /// 1-based slide numbers; empty selects every slide
    pub slides: Vec<usize>,
    pub criteria: TableCriteria,
    pub columns: ColumnSelection,
    pub output: TableOutput,
    pub include_metadata: bool,
}

impl Default for TableRequest {
    fn default() -> Self {
        Self {
            slides: Vec::new(),
            criteria: TableCriteria::default(),
            columns: ColumnSelection::default(),
            output: TableOutput::Structured,
            include_metadata: true,
        }
    }
}

/// Position and span of a cell in its table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellMetadata {
    /// Grid row, header row being 0
    pub row: usize,
    pub column: usize,
    pub row_span: u32,
    pub col_span: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedCell {
    pub column: String,
    pub value: String,
    /// Formatting of the first visible run; absent for empty cells
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatting: Option<EffectiveFormatting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CellMetadata>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableMetadata {
    pub has_formatting: bool,
    pub cell_count: usize,
    pub non_empty_cells: usize,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedTable {
    pub slide_number: usize,
    /// Position among the tables of its slide
    pub table_index: usize,
    pub shape_name: String,
    /// Grid rows, header row included
    pub rows: usize,
    pub columns: usize,
    /// Selected headers
    pub headers: Vec<String>,
    pub header_cells: Vec<ExtractedCell>,
    /// Data rows (the header row excluded), restricted to selected columns
    pub data: Vec<Vec<ExtractedCell>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TableMetadata>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlideTables {
    pub slide_number: usize,
    pub tables: Vec<ExtractedTable>,
}

/// Cell formatting tallies over all extracted cells
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CellFormattingCounts {
    pub bold_cells: usize,
    pub italic_cells: usize,
    pub highlighted_cells: usize,
    pub colored_cells: usize,
}

impl CellFormattingCounts {
    fn record(&mut self, formatting: &EffectiveFormatting) -> bool {
        let mut any = false;
        for (flag, count) in [
            (formatting.bold, &mut self.bold_cells),
            (formatting.italic, &mut self.italic_cells),
            (formatting.highlight.is_some(), &mut self.highlighted_cells),
            (formatting.color != DEFAULT_COLOR, &mut self.colored_cells),
        ] {
            if flag {
                *count += 1;
                any = true;
            }
        }
        any
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub slides_processed: usize,
    pub total_tables: usize,
    /// Data rows over all extracted tables
    pub total_rows: usize,
    pub slides_with_tables: Vec<usize>,
    pub formatting_found: CellFormattingCounts,
}

/// Extracted tables in the requested shape
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "format", content = "tables", rename_all = "snake_case")]
pub enum TableData {
    Structured(Vec<ExtractedTable>),
    Flat(Vec<BTreeMap<String, Value>>),
    GroupedBySlide(Vec<SlideTables>),
}

impl TableData {
    pub fn output(&self) -> TableOutput {
        match self {
            Self::Structured(_) => TableOutput::Structured,
            Self::Flat(_) => TableOutput::Flat,
            Self::GroupedBySlide(_) => TableOutput::GroupedBySlide,
        }
    }
}

/// Result of [`QueryEngine::extract_tables`]
#[derive(Debug, Clone, Serialize)]
pub struct TableExtraction {
    pub summary: TableSummary,
    #[serde(flatten)]
    pub data: TableData,
}

/// Criteria and column selection with their patterns compiled
struct TableFilter<'r> {
    request: &'r TableRequest,
    header_patterns: Vec<Regex>,
    column_patterns: Vec<Regex>,
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| compile_pattern(p)).collect()
}

fn eq_ci(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

impl<'r> TableFilter<'r> {
    fn new(request: &'r TableRequest) -> Result<Self> {
        let c = &request.criteria;
        for (what, min, max) in [
            ("rows", c.min_rows, c.max_rows),
            ("columns", c.min_columns, c.max_columns),
        ] {
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(PptxError::invalid_criteria(
                        format!("{} {}..{}", what, min, max),
                        "min is greater than max",
                    ));
                }
            }
        }
        Ok(Self {
            request,
            header_patterns: compile_all(&c.header_patterns)?,
            column_patterns: compile_all(&request.columns.column_patterns)?,
        })
    }

    fn accepts(&self, table: &Table, headers: &[String]) -> bool {
        let c = &self.request.criteria;
        let rows = table.row_count();
        let columns = table.columns;
        if c.min_rows.is_some_and(|n| rows < n) || c.max_rows.is_some_and(|n| rows > n) {
            return false;
        }
        if c.min_columns.is_some_and(|n| columns < n) || c.max_columns.is_some_and(|n| columns > n)
        {
            return false;
        }
        let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
        let contains_all = c
            .header_contains
            .iter()
            .all(|needle| lowered.iter().any(|h| h.contains(&needle.to_lowercase())));
        contains_all
            && self
                .header_patterns
                .iter()
                .all(|re| headers.iter().any(|h| re.is_match(h)))
    }

    /// Indices of the columns to keep
    fn select_columns(&self, headers: &[String]) -> Vec<usize> {
        let selection = &self.request.columns;
        let keep = |(i, header): (usize, &String)| -> Option<usize> {
            let chosen = if !selection.specific_columns.is_empty() {
                selection.specific_columns.iter().any(|c| eq_ci(c, header))
            } else if !self.column_patterns.is_empty() {
                self.column_patterns.iter().any(|re| re.is_match(header))
            } else {
                true
            };
            let excluded = selection.exclude_columns.iter().any(|c| eq_ci(c, header));
            (chosen && !excluded).then_some(i)
        };
        headers.iter().enumerate().filter_map(keep).collect()
    }
}

/// Header names from the first row: blanks become `Column N`, repeats get
/// a ` (2)`, ` (3)` suffix
fn header_names(table: &Table) -> Vec<String> {
    let first = table.grid().into_iter().next().unwrap_or_default();
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    (0..table.columns)
        .map(|i| {
            let raw = first.get(i).map(|s| s.trim()).unwrap_or("");
            let base = if raw.is_empty() {
                format!("Column {}", i + 1)
            } else {
                raw.to_string()
            };
            let n = seen.entry(base.clone()).or_insert(0);
            *n += 1;
            if *n == 1 {
                base
            } else {
                format!("{} ({})", base, n)
            }
        })
        .collect()
}

impl<'a> QueryEngine<'a> {
    /// Tables on the requested slides, filtered and shaped per `request`
    pub fn extract_tables(&self, request: &TableRequest) -> Result<TableExtraction> {
        let filter = TableFilter::new(request)?;
        let slides = self.select_slides(&request.slides)?;

        let mut summary = TableSummary {
            slides_processed: slides.len(),
            ..Default::default()
        };
        let mut extracted = Vec::new();
        for (number, slide) in slides {
            let tables = slide
                .all_shapes()
                .into_iter()
                .filter_map(|shape| match &shape.kind {
                    ShapeKind::Table(table) => Some((shape, table)),
                    _ => None,
                });
            let before = extracted.len();
            for (table_index, (shape, table)) in tables.enumerate() {
                let headers = header_names(table);
                if !filter.accepts(table, &headers) {
                    continue;
                }
                let columns = filter.select_columns(&headers);
                let table = self.extract_table(
                    TableSource {
                        number,
                        slide,
                        shape,
                        table,
                        table_index,
                    },
                    &headers,
                    &columns,
                    request.include_metadata,
                    &mut summary.formatting_found,
                );
                summary.total_rows += table.data.len();
                extracted.push(table);
            }
            if extracted.len() > before {
                summary.slides_with_tables.push(number);
            }
        }
        summary.total_tables = extracted.len();
        debug!(
            tables = summary.total_tables,
            rows = summary.total_rows,
            output = %request.output,
            "table extraction"
        );

        let data = match request.output {
            TableOutput::Structured => TableData::Structured(extracted),
            TableOutput::Flat => TableData::Flat(
                extracted
                    .iter()
                    .flat_map(|table| flat_rows(table, request.include_metadata))
                    .collect(),
            ),
            TableOutput::GroupedBySlide => TableData::GroupedBySlide(group_by_slide(extracted)),
        };
        Ok(TableExtraction { summary, data })
    }

    fn extract_table(
        &self,
        source: TableSource<'_>,
        headers: &[String],
        columns: &[usize],
        include_metadata: bool,
        counts: &mut CellFormattingCounts,
    ) -> ExtractedTable {
        let mut has_formatting = false;
        let mut cell_count = 0;
        let mut non_empty_cells = 0;

        let mut rows: Vec<Vec<ExtractedCell>> = Vec::with_capacity(source.table.row_count());
        for (r, row) in source.table.rows.iter().enumerate() {
            let mut cells = Vec::with_capacity(columns.len());
            for &c in columns {
                let Some(cell) = row.cells.get(c) else {
                    continue;
                };
                let value = cell.text.text();
                let formatting = self.cell_formatting(&source, cell);
                cell_count += 1;
                if !value.trim().is_empty() {
                    non_empty_cells += 1;
                }
                if let Some(f) = &formatting {
                    has_formatting |= counts.record(f);
                }
                cells.push(ExtractedCell {
                    column: headers[c].clone(),
                    value,
                    formatting,
                    metadata: include_metadata.then_some(CellMetadata {
                        row: r,
                        column: c,
                        row_span: cell.row_span.max(1),
                        col_span: cell.grid_span.max(1),
                    }),
                });
            }
            rows.push(cells);
        }

        let mut rows = rows.into_iter();
        let header_cells = rows.next().unwrap_or_default();
        ExtractedTable {
            slide_number: source.number,
            table_index: source.table_index,
            shape_name: source.shape.name.clone(),
            rows: source.table.row_count(),
            columns: source.table.columns,
            headers: columns.iter().map(|&c| headers[c].clone()).collect(),
            header_cells,
            data: rows.collect(),
            metadata: include_metadata.then(|| TableMetadata {
                has_formatting,
                cell_count,
                non_empty_cells,
                geometry: source.shape.geometry,
            }),
        }
    }

    fn cell_formatting(
        &self,
        source: &TableSource<'_>,
        cell: &TableCell,
    ) -> Option<EffectiveFormatting> {
        let (paragraph, run) = cell
            .text
            .runs()
            .find(|(_, run)| !run.is_break() && !run.text.trim().is_empty())?;
        let ctx = RunContext {
            slide: source.slide,
            shape: source.shape,
            frame: &cell.text,
            paragraph,
            run,
        };
        Some(effective_formatting(self.presentation, &ctx))
    }
}

/// Where a table sits in the deck
struct TableSource<'s> {
    number: usize,
    slide: &'s Slide,
    shape: &'s Shape,
    table: &'s Table,
    table_index: usize,
}

fn flat_rows(table: &ExtractedTable, include_metadata: bool) -> Vec<BTreeMap<String, Value>> {
    table
        .data
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut record = BTreeMap::new();
            record.insert("slide_number".to_string(), Value::from(table.slide_number));
            record.insert("table_index".to_string(), Value::from(table.table_index));
            record.insert("row_index".to_string(), Value::from(i));
            for cell in row {
                record.insert(cell.column.clone(), Value::from(cell.value.clone()));
                if !include_metadata {
                    continue;
                }
                if let Some(f) = &cell.formatting {
                    record.insert(format!("{}_bold", cell.column), Value::from(f.bold));
                    record.insert(format!("{}_italic", cell.column), Value::from(f.italic));
                    record.insert(
                        format!("{}_highlight", cell.column),
                        f.highlight.clone().map_or(Value::Null, Value::from),
                    );
                    record.insert(format!("{}_color", cell.column), Value::from(f.color.clone()));
                }
            }
            record
        })
        .collect()
}

fn group_by_slide(tables: Vec<ExtractedTable>) -> Vec<SlideTables> {
    let mut groups: Vec<SlideTables> = Vec::new();
    for table in tables {
        match groups.last_mut() {
            Some(group) if group.slide_number == table.slide_number => group.tables.push(table),
            _ => groups.push(SlideTables {
                slide_number: table.slide_number,
                tables: vec![table],
            }),
        }
    }
    groups
}
