//! Aggregate command - total a pair of daily history screens.

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use tracing::info;

use pachi_core::{summarize_pair, DailyTotal, PairSummary};

use super::{load_config, read_document};

/// Arguments for the aggregate command.
#[derive(Args)]
pub struct AggregateArgs {
    /// First history screen (.txt or .json)
    #[arg(required = true)]
    first: PathBuf,

    /// Second history screen (.txt or .json)
    #[arg(required = true)]
    second: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: AggregateFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum AggregateFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

pub async fn run(args: AggregateArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    // The two screens are independent; read both before combining.
    let (first, second) = tokio::join!(load_text(&args.first), load_text(&args.second));
    let (first, second) = (first?, second?);

    let summary = summarize_pair(&first, &second, &config.aggregation)?;
    info!(
        "Wins read from {}",
        if summary.wins_input == 0 {
            args.first.display()
        } else {
            args.second.display()
        }
    );

    match args.format {
        AggregateFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        AggregateFormat::Text => print!("{}", format_summary_text(&summary)),
    }

    if summary.wins.source.is_fallback() || summary.starts.source.is_fallback() {
        eprintln!(
            "{} Day labels were not recognized on every screen; totals are estimates.",
            style("⚠").yellow()
        );
    }

    Ok(())
}

async fn load_text(path: &Path) -> anyhow::Result<String> {
    let path = path.to_path_buf();
    let document = tokio::task::spawn_blocking(move || read_document(&path)).await??;
    Ok(document.full_text())
}

fn format_total(name: &str, total: &DailyTotal) -> String {
    let mut output = format!("{}: {}", name, total.total);
    if total.source.is_fallback() {
        output.push_str(" (fallback)");
    }
    output.push('\n');
    for day in &total.details {
        output.push_str(&format!("  {:<5} {}\n", day.label, day.value));
    }
    output
}

fn format_summary_text(summary: &PairSummary) -> String {
    let mut output = String::new();
    output.push_str(&format_total("Wins", &summary.wins));
    output.push_str(&format_total("Starts", &summary.starts));
    output.push_str(&format!("\nOdds: {}\n", summary.odds_text()));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use pachi_core::AggregationConfig;

    #[test]
    fn test_text_summary() {
        let summary = summarize_pair(
            "本日 300\n1日前 200",
            "大当り\n本日 2\n1日前 3",
            &AggregationConfig::default(),
        )
        .unwrap();

        let text = format_summary_text(&summary);
        assert!(text.starts_with("Wins: 5\n"));
        assert!(text.contains("Starts: 500\n"));
        assert!(text.contains("Odds: 1/100.0"));
        assert!(!text.contains("fallback"));
    }
}
