use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use tracing::info;

use gembid::config::AppConfig;
use gembid::models::{BidRecord, ScrapeRequest};
use gembid::runner::ScrapeRunner;
use gembid::session::ChromeSession;
use gembid::BidSheet;

#[derive(Parser)]
#[command(name = "gembid", about = "Extract procurement bids from the GeM tender portal")]
struct Cli {
    /// Consignee state exactly as shown in the location facet,
    /// e.g. "ANDHRA PRADESH". Empty skips the location filter.
    #[arg(long, default_value = "")]
    state: String,

    /// Earliest bid start date (YYYY-MM-DD).
    #[arg(long)]
    start_date: NaiveDate,

    /// Latest bid start date (YYYY-MM-DD); whole day included.
    /// Without it, every bid starting on or after --start-date is kept.
    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// Stop after this many result pages.
    #[arg(long)]
    max_pages: Option<u32>,

    /// Write here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gembid=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("failed to load configuration")?;

    let request = ScrapeRequest {
        state: cli.state.clone(),
        start_date: cli.start_date,
        end_date: cli.end_date,
        max_pages: cli.max_pages,
    };

    let session = Arc::new(
        ChromeSession::launch(&config.scraper).context("failed to launch browser session")?,
    );
    let runner = ScrapeRunner::new(session, config);
    let records = runner.run(&request).await.context("scrape failed")?;
    info!("scraped {} bid(s)", records.len());

    let rendered = match cli.format {
        Format::Json => serde_json::to_string_pretty(&records)?,
        Format::Csv => to_csv(&records),
    };

    match &cli.output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }

    Ok(())
}

fn to_csv(records: &[BidRecord]) -> String {
    let mut out = String::new();
    push_csv_row(&mut out, BidSheet::headers().iter().copied());
    for record in records {
        push_csv_row(&mut out, record.to_row().into_iter());
    }
    out
}

fn push_csv_row<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        first = false;
        if field.contains([',', '"', '\n']) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push('\n');
}
