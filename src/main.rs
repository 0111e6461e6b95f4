use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use domain_sieve::catalog::{CatalogClient, CatalogConfig, DataLayout, ListKind};
use domain_sieve::{
    CsvRecordSink, CsvRecordSource, EngineOptions, ExtractionEngine, TargetSet, TerminationReason,
};

#[derive(Parser)]
#[command(
    name = "domain-sieve",
    about = "Extract domain records matching a technology's domain list",
    version
)]
struct Cli {
    /// Data directory root
    #[arg(long, default_value = "data", env = "DOMAIN_SIEVE_DATA_DIR", global = true)]
    data_dir: PathBuf,

    /// Catalog service access token
    #[arg(long, env = "TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Catalog service base URL
    #[arg(long, env = "BASE_URL", global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch the technology catalog and list its entries
    Technologies,

    /// Download domain lists for every catalog technology
    FetchLists,

    /// Download the full detailed dataset archive
    FetchDetailed,

    /// Extract records matching one technology's domain list
    Extract {
        /// Technology whose domain list is the target set
        #[arg(long)]
        technology: String,

        /// Use the daily delta list instead of the full list
        #[arg(long)]
        daily: bool,

        /// Detailed dataset CSV (defaults to the data layout path)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Output CSV (defaults to the data layout path)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let layout = DataLayout::new(&cli.data_dir);

    match &cli.command {
        Command::Technologies => {
            let client = catalog_client(&cli, &layout)?;
            let technologies = client.fetch_technologies()?;
            for (i, tech) in technologies.iter().enumerate() {
                println!(
                    "{:>4}. {} (daily count: {})",
                    i + 1,
                    tech.name,
                    if tech.count_daily.is_empty() {
                        "0"
                    } else {
                        tech.count_daily.as_str()
                    }
                );
            }
            Ok(())
        }
        Command::FetchLists => {
            let client = catalog_client(&cli, &layout)?;
            let technologies = match client.cached_technologies() {
                Ok(technologies) => technologies,
                Err(_) => client.fetch_technologies()?,
            };
            let (succeeded, failed) = client.download_all_lists(&technologies);
            info!(succeeded, failed, "list download complete");
            if failed > 0 {
                bail!("{failed} list download(s) failed");
            }
            Ok(())
        }
        Command::FetchDetailed => {
            let client = catalog_client(&cli, &layout)?;
            client.download_detailed()?;
            Ok(())
        }
        Command::Extract {
            technology,
            daily,
            input,
            output,
        } => extract(&layout, technology, *daily, input.clone(), output.clone()),
    }
}

fn catalog_client(cli: &Cli, layout: &DataLayout) -> Result<CatalogClient> {
    let token = cli
        .token
        .clone()
        .context("catalog access token not set (use --token or TOKEN in the environment)")?;
    let base_url = cli
        .base_url
        .clone()
        .context("catalog base URL not set (use --base-url or BASE_URL in the environment)")?;
    Ok(CatalogClient::new(
        CatalogConfig::new(base_url, token),
        layout.clone(),
    ))
}

fn extract(
    layout: &DataLayout,
    technology: &str,
    daily: bool,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let kind = if daily { ListKind::Daily } else { ListKind::Full };

    let list_path = layout.technology_list(technology, kind);
    let mut targets = TargetSet::load_path(&list_path)
        .with_context(|| format!("loading domain list '{}'", list_path.display()))?;
    info!(
        technology,
        targets = targets.len(),
        "loaded target domain list"
    );

    let input = input.unwrap_or_else(|| layout.detailed_csv());
    let output = output.unwrap_or_else(|| layout.extracted_output(technology, kind));
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory '{}'", parent.display()))?;
    }

    let source = CsvRecordSource::open(&input)
        .with_context(|| format!("opening dataset '{}'", input.display()))?;
    let sink = CsvRecordSink::create(&output)
        .with_context(|| format!("creating output '{}'", output.display()))?;

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || {
            cancel.store(true, Ordering::Relaxed);
        })
        .context("failed to set ctrl-c handler")?;
    }

    let engine =
        ExtractionEngine::with_options(EngineOptions::new().with_cancel_flag(cancel));
    let report = engine.run(&mut targets, source, sink);

    info!(
        matched = report.matched,
        records_read = report.records_read,
        skipped = report.skipped,
        "extraction finished: {}",
        report.reason
    );
    if !report.missing_keys.is_empty() {
        warn!(
            missing = report.missing_keys.len(),
            "some target domains were not found in the dataset"
        );
    }
    println!(
        "{} matching records written to {}",
        report.matched,
        output.display()
    );

    match report.reason {
        TerminationReason::Aborted(cause) => bail!("extraction aborted: {cause}"),
        _ => Ok(()),
    }
}
