//! Extract command - read counters from a single OCR file.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use pachi_core::{build_extractor, ExtractionResult, StrategyKind};

use super::{load_config, read_document};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input file (.txt OCR text, or .json document / Vision response)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Extraction strategy (default: from config)
    #[arg(short, long, value_enum)]
    strategy: Option<Strategy>,

    /// Leave the debug payload out of JSON output
    #[arg(long)]
    values_only: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum Strategy {
    /// Numbers next to display labels
    Keyword,
    /// Numbers by position on the display grid
    Grid,
    /// Keyword, then grid for whatever is still missing
    Chain,
}

impl From<Strategy> for StrategyKind {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Keyword => StrategyKind::Keyword,
            Strategy::Grid => StrategyKind::Grid,
            Strategy::Chain => StrategyKind::Chain,
        }
    }
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;
    let kind = args
        .strategy
        .map(StrategyKind::from)
        .unwrap_or(config.extraction.strategy);

    let document = read_document(&args.input)?;
    info!(
        "Extracting from {} ({} tokens) with {} strategy",
        args.input.display(),
        document.tokens.len(),
        kind
    );

    let extractor = build_extractor(&config, kind)?;
    let result = extractor.extract(&document);

    let output = format_result(&result, args.format, args.values_only)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Render a result in the requested format.
pub fn format_result(
    result: &ExtractionResult,
    format: OutputFormat,
    values_only: bool,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json if values_only => {
            Ok(serde_json::to_string_pretty(&result.extracted_values)?)
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Csv => format_result_csv(result),
        OutputFormat::Text => Ok(format_result_text(result)),
    }
}

fn format_result_csv(result: &ExtractionResult) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["field", "value", "source"])?;

    for (field, value) in &result.extracted_values {
        let source = result
            .debug
            .sources
            .get(field)
            .map(String::as_str)
            .unwrap_or(result.debug.strategy.as_str());
        wtr.write_record([field.as_str(), &value.to_string(), source])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_result_text(result: &ExtractionResult) -> String {
    let mut output = String::new();

    output.push_str(&format!("Strategy: {}\n", result.debug.strategy));
    output.push_str(&format!(
        "Tokens: {}, numbers: {}\n",
        result.debug.token_count, result.debug.number_count
    ));
    output.push('\n');

    if result.extracted_values.is_empty() {
        output.push_str("No fields extracted\n");
    } else {
        output.push_str("Fields:\n");
        for (field, value) in &result.extracted_values {
            output.push_str(&format!("  {:<3} {}\n", field, value));
        }
    }

    let missing: Vec<&str> = result
        .debug
        .anchors
        .iter()
        .filter(|(_, offset)| offset.is_none())
        .map(|(keyword, _)| keyword.as_str())
        .collect();
    if !missing.is_empty() {
        output.push_str(&format!("\nLabels not found: {}\n", missing.join(", ")));
    }

    if !result.debug.dropped.is_empty() {
        output.push_str("\nOut of range:\n");
        for dropped in &result.debug.dropped {
            output.push_str(&format!(
                "  {} = {} (allowed {}..={})\n",
                dropped.field, dropped.value, dropped.min, dropped.max
            ));
        }
    }

    output
}
