//! CLI Application logic
//!
//! Contains the command-line interface implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use slidequery_pptx::search::DEFAULT_LIMIT;
use slidequery_pptx::{
    BuildWarning, ColumnSelection, Deck, ExtractorConfig, FormattingPredicate, OverviewDepth,
    SlideCriteria, SlideField, SlideQuery, TableCriteria, TableOutput, TableRequest,
};

#[derive(Parser)]
#[command(name = "slidequery")]
#[command(author, version, about = "Query the structure and text of PPTX presentations", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print compact JSON instead of pretty-printed
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the full presentation model with per-run formatting
    Extract {
        /// Input PPTX file
        input: PathBuf,
    },

    /// Extract selected attributes (all of them when none are given)
    Attributes {
        /// Input PPTX file
        input: PathBuf,

        /// Attribute names, repeated or comma separated
        #[arg(short, long = "attribute", value_delimiter = ',')]
        attributes: Vec<String>,
    },

    /// Show one slide by its 1-based number
    Slide {
        /// Input PPTX file
        input: PathBuf,

        /// Slide number, starting at 1
        number: usize,
    },

    /// List text runs matching a formatting predicate
    Formatted {
        /// Input PPTX file
        input: PathBuf,

        /// Predicate such as `bold`, `font:Arial`, `color:#FF0000`,
        /// `size>=24`, `bold+italic` or `font:"Name+With+Plus"`
        predicate: String,

        /// Only these 1-based slide numbers, comma separated
        #[arg(short, long, value_delimiter = ',')]
        slides: Vec<usize>,
    },

    /// Count formatting properties, fonts, sizes and colours
    Analyze {
        /// Input PPTX file
        input: PathBuf,

        /// Only these 1-based slide numbers, comma separated
        #[arg(short, long, value_delimiter = ',')]
        slides: Vec<usize>,
    },

    /// Find slides by title, content, layout or section
    Query {
        /// Input PPTX file
        input: PathBuf,

        /// Search criteria as a JSON object
        #[arg(long)]
        criteria: Option<String>,

        /// Fields to return, repeated or comma separated
        #[arg(short, long = "field", value_delimiter = ',')]
        fields: Vec<String>,

        /// Maximum number of slides returned, 0 for no limit
        #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },

    /// Extract table data
    Tables {
        /// Input PPTX file
        input: PathBuf,

        /// Only these 1-based slide numbers, comma separated
        #[arg(short, long, value_delimiter = ',')]
        slides: Vec<usize>,

        /// Table criteria as a JSON object
        #[arg(long)]
        criteria: Option<String>,

        /// Column selection as a JSON object
        #[arg(long)]
        columns: Option<String>,

        /// `structured`, `flat` or `grouped_by_slide`
        #[arg(short, long, default_value = "structured")]
        format: String,

        /// Leave out cell positions and table metadata
        #[arg(long)]
        no_metadata: bool,
    },

    /// Summarise the presentation structure
    Overview {
        /// Input PPTX file
        input: PathBuf,

        /// `summary` or `detailed`
        #[arg(short, long, default_value = "summary")]
        depth: String,
    },
}

/// Settings shared by every command
#[derive(Debug, Clone, Copy, Default)]
pub struct Options<'a> {
    /// Configuration file; built-in defaults when absent
    pub config: Option<&'a Path>,
    /// Single-line JSON output
    pub compact: bool,
}

/// JSON document printed by every command
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize> {
    pub archive: &'a str,
    pub result: T,
    pub warnings: &'a [BuildWarning],
}

/// Run the CLI application
///
/// This is the main entry point for the command-line interface.
/// It parses arguments and dispatches to the appropriate command.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let opts = Options {
        config: cli.config.as_deref(),
        compact: cli.compact,
    };
    let json = match cli.command {
        Commands::Extract { input } => extract_command(&input, &opts)?,
        Commands::Attributes { input, attributes } => {
            attributes_command(&input, &opts, &attributes)?
        }
        Commands::Slide { input, number } => slide_command(&input, &opts, number)?,
        Commands::Formatted {
            input,
            predicate,
            slides,
        } => formatted_command(&input, &opts, &predicate, &slides)?,
        Commands::Analyze { input, slides } => analyze_command(&input, &opts, &slides)?,
        Commands::Query {
            input,
            criteria,
            fields,
            limit,
        } => query_command(&input, &opts, criteria.as_deref(), &fields, limit)?,
        Commands::Tables {
            input,
            slides,
            criteria,
            columns,
            format,
            no_metadata,
        } => tables_command(
            &input,
            &opts,
            &slides,
            criteria.as_deref(),
            columns.as_deref(),
            &format,
            !no_metadata,
        )?,
        Commands::Overview { input, depth } => overview_command(&input, &opts, &depth)?,
    };

    println!("{}", json);
    Ok(())
}

/// Install the stderr log subscriber; `RUST_LOG` overrides the `info` default
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<ExtractorConfig> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading configuration");
            ExtractorConfig::load(path)
                .with_context(|| format!("Failed to load configuration: {}", path.display()))
        }
        None => Ok(ExtractorConfig::default()),
    }
}

fn open_deck(input: &Path, opts: &Options<'_>) -> Result<Deck> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    let config = load_config(opts.config)?;

    let deck = Deck::open(input, &config)
        .with_context(|| format!("Failed to open presentation: {}", input.display()))?;
    info!(
        input = %input.display(),
        slides = deck.slide_count(),
        warnings = deck.warnings().len(),
        "presentation loaded"
    );
    Ok(deck)
}

fn render<T: Serialize>(deck: &Deck, opts: &Options<'_>, result: T) -> Result<String> {
    let envelope = Envelope {
        archive: deck.label(),
        result,
        warnings: deck.warnings(),
    };
    let json = if opts.compact {
        serde_json::to_string(&envelope)
    } else {
        serde_json::to_string_pretty(&envelope)
    };
    json.context("Failed to serialize result to JSON")
}

/// Execute the extract command
pub fn extract_command(input: &Path, opts: &Options<'_>) -> Result<String> {
    let deck = open_deck(input, opts)?;
    render(&deck, opts, deck.extract_full())
}

/// Execute the attributes command
pub fn attributes_command(
    input: &Path,
    opts: &Options<'_>,
    attributes: &[String],
) -> Result<String> {
    let deck = open_deck(input, opts)?;
    let report = deck
        .get_attributes(attributes)
        .context("Invalid attribute request")?;
    render(&deck, opts, report)
}

/// Execute the slide command
pub fn slide_command(input: &Path, opts: &Options<'_>, number: usize) -> Result<String> {
    let deck = open_deck(input, opts)?;
    let slide = deck
        .get_slide_info(number)
        .with_context(|| format!("Cannot show slide {}", number))?;
    render(&deck, opts, slide)
}

/// Execute the formatted command
pub fn formatted_command(
    input: &Path,
    opts: &Options<'_>,
    predicate: &str,
    slides: &[usize],
) -> Result<String> {
    let predicate: FormattingPredicate = predicate
        .parse()
        .context("Invalid formatting predicate")?;
    let deck = open_deck(input, opts)?;
    let result = deck
        .extract_formatted_text_in(&predicate, slides)
        .context("Invalid slide selection")?;
    render(&deck, opts, result)
}

/// Execute the analyze command
pub fn analyze_command(input: &Path, opts: &Options<'_>, slides: &[usize]) -> Result<String> {
    let deck = open_deck(input, opts)?;
    let analysis = deck
        .analyze_formatting(slides)
        .context("Invalid slide selection")?;
    render(&deck, opts, analysis)
}

/// Execute the query command
pub fn query_command(
    input: &Path,
    opts: &Options<'_>,
    criteria: Option<&str>,
    fields: &[String],
    limit: usize,
) -> Result<String> {
    let query = SlideQuery {
        criteria: criteria
            .map(SlideCriteria::from_json)
            .transpose()
            .context("Invalid slide criteria")?
            .unwrap_or_default(),
        fields: SlideField::parse_list(fields).context("Invalid field list")?,
        limit,
    };
    let deck = open_deck(input, opts)?;
    let result = deck.query_slides(&query).context("Invalid slide query")?;
    render(&deck, opts, result)
}

/// Execute the tables command
pub fn tables_command(
    input: &Path,
    opts: &Options<'_>,
    slides: &[usize],
    criteria: Option<&str>,
    columns: Option<&str>,
    format: &str,
    include_metadata: bool,
) -> Result<String> {
    let request = TableRequest {
        slides: slides.to_vec(),
        criteria: criteria
            .map(TableCriteria::from_json)
            .transpose()
            .context("Invalid table criteria")?
            .unwrap_or_default(),
        columns: columns
            .map(ColumnSelection::from_json)
            .transpose()
            .context("Invalid column selection")?
            .unwrap_or_default(),
        output: format.parse::<TableOutput>().context("Invalid table format")?,
        include_metadata,
    };
    let deck = open_deck(input, opts)?;
    let result = deck
        .extract_tables(&request)
        .context("Invalid table request")?;
    render(&deck, opts, result)
}

/// Execute the overview command
pub fn overview_command(input: &Path, opts: &Options<'_>, depth: &str) -> Result<String> {
    let depth: OverviewDepth = depth.parse().context("Invalid overview depth")?;
    let deck = open_deck(input, opts)?;
    render(&deck, opts, deck.get_overview(depth))
}
