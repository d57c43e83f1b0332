mod config;
mod db;
mod error;
mod export;
mod fetch;
mod parser;
mod pipeline;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::db::CacheStore;
use crate::fetch::{HttpSource, PdfTextExtractor, PlainTextExtractor, TextExtractor};
use crate::parser::{CaseRecord, ListingEntry, ListingScanner, RecordExtractor};
use crate::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "causelist_scraper", about = "Supreme Court cause list scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the listing page, download every cause list and extract case records
    Run {
        /// Listing page URL
        #[arg(long)]
        url: Option<String>,
        /// SQLite cache database
        #[arg(long)]
        db: Option<PathBuf>,
        /// CSV output path
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Concurrent document downloads
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,
        /// Hit date used in the snapshot name (MM/DD/YYYY)
        #[arg(long)]
        date: Option<String>,
    },
    /// Scan a saved listing page and print the documents it links
    Scan {
        file: PathBuf,
        /// Year marker for the date column (default: current year)
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// Extract case records from a single cause list (.pdf or .txt)
    Extract {
        file: PathBuf,
        /// Write records to this CSV instead of printing them
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Section masthead (default: SUPREME COURT OF INDIA)
        #[arg(long)]
        masthead: Option<String>,
    },
    /// Export the latest stored run to CSV
    Export {
        /// Output path (default: configured csv_path)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// List cached listing entries, or show one by cache key
    Cached {
        key: Option<String>,
    },
    /// Show cache and record statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load()?;

    let result = match cli.command {
        Commands::Run {
            url,
            db,
            csv,
            concurrency,
            date,
        } => {
            if let Some(url) = url {
                settings.listing_url = url;
            }
            if let Some(db) = db {
                settings.db_path = db;
            }
            if let Some(csv) = csv {
                settings.csv_path = csv;
            }
            if let Some(n) = concurrency {
                settings.concurrency = n;
            }
            if date.is_some() {
                settings.hit_date = date;
            }
            run(&settings).await
        }
        Commands::Scan { file, year } => {
            let html = read_file(&file)?;
            let listing = match year {
                Some(y) => ListingScanner::for_year(y).scan(&html),
                None => parser::scan_listing(&html),
            };
            if listing.is_empty() {
                println!("No cause list documents found in {:?}.", file);
                return Ok(());
            }
            println!("{:<36} | {:<10} | {:<32}", "Id", "Date", "Category");
            println!("{}", "-".repeat(84));
            for (id, entry) in &listing {
                println!(
                    "{:<36} | {:<10} | {:<32}",
                    truncate(id, 36),
                    entry.hearing_date,
                    entry.category_label()
                );
            }
            println!("\n{} documents", listing.len());
            Ok(())
        }
        Commands::Extract {
            file,
            csv,
            masthead,
        } => {
            let bytes = std::fs::read(&file).with_context(|| format!("Failed to read {:?}", file))?;
            let name = file.to_string_lossy();
            let is_pdf = file
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
            let text = if is_pdf {
                PdfTextExtractor.extract_text(&name, &bytes)?
            } else {
                PlainTextExtractor.extract_text(&name, &bytes)?
            };
            let records = match masthead {
                Some(m) => RecordExtractor::new(m).extract(&text),
                None => parser::extract_records(&text),
            };
            match csv {
                Some(path) => {
                    export::write_csv_file(&path, &records)?;
                    println!("Wrote {} records to {:?}", records.len(), path);
                }
                None => print_records(&records),
            }
            Ok(())
        }
        Commands::Export { out } => {
            let store = CacheStore::open(&settings.db_path)?;
            let Some(run_at) = store.latest_run()? else {
                println!("No stored runs. Run 'run' first.");
                return Ok(());
            };
            let records = store.fetch_records(&run_at)?;
            let path = out.unwrap_or_else(|| settings.csv_path.clone());
            export::write_csv_file(&path, &records)?;
            println!("Exported {} records from run {} to {:?}", records.len(), run_at, path);
            Ok(())
        }
        Commands::Cached { key } => {
            let store = CacheStore::open(&settings.db_path)?;
            if let Some(key) = key {
                match store.get_value::<ListingEntry>(&key)? {
                    Some(entry) => println!("{}", serde_json::to_string_pretty(&entry)?),
                    None => println!("{} is not cached (missing or expired).", key),
                }
                return Ok(());
            }
            let keys: Vec<String> = store
                .cached_ids()?
                .iter()
                .map(|id| db::cache_key(id))
                .collect();
            let entries = store.get_many::<ListingEntry>(&keys)?;
            for (key, entry) in &entries {
                println!("{}  {}", key, entry.document_link);
            }
            println!("\n{} live of {} cached ids", entries.len(), keys.len());
            Ok(())
        }
        Commands::Stats => {
            let store = CacheStore::open(&settings.db_path)?;
            let s = store.stats()?;
            println!("Cached:    {}", s.cached);
            println!("Expired:   {}", s.expired);
            println!("Records:   {}", s.records);
            println!("Documents: {}", s.documents);
            println!("Runs:      {}", s.runs);
            if let Some(run_at) = store.latest_run()? {
                println!("Latest:    {}", run_at);
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn run(settings: &Settings) -> anyhow::Result<()> {
    let source = Arc::new(HttpSource::new(settings)?);
    let scanner = settings
        .listing_year
        .map(ListingScanner::for_year)
        .unwrap_or_default();
    let pipeline = Pipeline::new(
        source,
        PdfTextExtractor,
        scanner,
        RecordExtractor::new(settings.masthead.clone()),
        settings.concurrency,
    );

    // Phase 1: listing
    let html = fetch::fetch_listing(pipeline.source(), &settings.listing_url).await?;
    let snapshot =
        pipeline::save_snapshot(&settings.snapshot_dir, &settings.hit_date_slug(), &html)?;
    println!("Saved listing snapshot to {:?}", snapshot);

    let listing = pipeline.scan(&html);
    if listing.is_empty() {
        println!("No cause list documents found on the listing page.");
        return Ok(());
    }

    let store = CacheStore::open(&settings.db_path)?;
    let ids = store.save_listing(&listing, settings.cache_ttl())?;
    println!("Cached {} listing entries.", ids.len());

    // Phase 2: documents
    let t_docs = Instant::now();
    println!("Downloading {} cause lists...", listing.len());
    let out = pipeline.run_listing(listing).await?;
    println!(
        "Fetched {}/{} listed documents ({} ok, {} errors), {} unreadable, in {:.1}s",
        out.fetch.total,
        out.listing.len(),
        out.fetch.ok,
        out.fetch.errors,
        out.failed_extractions,
        t_docs.elapsed().as_secs_f64()
    );

    // Phase 3: persist
    let run_at = chrono::Utc::now().to_rfc3339();
    let saved = store.save_records(&run_at, &out.documents)?;
    let mut records: Vec<CaseRecord> = Vec::with_capacity(out.record_count());
    records.extend(out.records().cloned());
    export::write_csv_file(&settings.csv_path, &records)?;
    println!(
        "Saved {} records from {} documents; CSV written to {:?}",
        saved,
        out.documents.len(),
        settings.csv_path
    );
    Ok(())
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn print_records(records: &[CaseRecord]) {
    if records.is_empty() {
        println!("No case records found.");
        return;
    }
    println!(
        "{:>5} | {:<34} | {:<12} | {:>6} | {:<40}",
        "Sno", "Case", "Diary", "Court", "Judges"
    );
    println!("{}", "-".repeat(110));
    for r in records {
        println!(
            "{:>5} | {:<34} | {:<12} | {:>6} | {:<40}",
            r.serial_no,
            truncate(&r.case_no_display, 34),
            r.diary_no,
            r.court_no,
            truncate(&r.judge_names, 40)
        );
    }
    println!("\n{} records", records.len());
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
