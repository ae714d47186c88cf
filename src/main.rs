mod applications;
mod classify;
mod config;
mod db;
mod digest;
mod enrich;
mod error;
mod identity;
mod models;

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use applications::{Tracker, new_application_id};
use config::Config;
use db::Database;
use digest::{DigestDocument, RankedJob, Section};
use enrich::CommandEnricher;
use identity::{KnownJobs, Resolution};
use models::{Application, ApplicationStatus, JobPosting, Origin, RawJobRecord};

#[derive(Parser)]
#[command(name = "huntlog")]
#[command(about = "Job digest reconciliation and application tracking")]
struct Cli {
    /// Directory holding huntlog.db (overrides the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Path to config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Resolve raw job records and merge them into a digest
    Ingest {
        /// Digest id or path to a digest file (default: today's date)
        digest: Option<String>,

        /// JSON array of raw job records
        #[arg(short, long)]
        input: PathBuf,
    },

    /// List jobs in a digest still waiting for enrichment
    Pending {
        /// Digest id or path
        digest: String,
    },

    /// Run one bounded enrichment batch over a digest
    Enrich {
        /// Digest id or path
        digest: String,

        /// Maximum number of jobs to check (default: batch_size from config)
        #[arg(short, long)]
        batch: Option<usize>,
    },

    /// Record that you applied somewhere
    Apply {
        #[arg(short, long)]
        role: String,

        #[arg(short, long)]
        org: String,

        /// Date applied, YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<String>,

        #[arg(short, long, default_value = "manual")]
        source: String,

        #[arg(short, long)]
        url: Option<String>,

        /// Where the record came from: manual, resume-scan, reply-email
        #[arg(long, default_value = "manual")]
        origin: String,
    },

    /// Record applications for digest lines marked [x]
    SyncDigest {
        /// Digest id or path
        digest: String,

        /// Date applied, YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Move an application to a new status
    Advance {
        /// Application ID
        id: String,

        /// applied, responded, interview, offer, rejected, withdrawn
        status: String,

        /// Date of the event, YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<String>,

        #[arg(short, long)]
        note: Option<String>,
    },

    /// Attach feedback received for an application
    Feedback {
        /// Application ID
        id: String,

        /// Kind of feedback (e.g. rejection, interview)
        kind: String,

        text: String,
    },

    /// List applications
    List {
        /// Filter by status
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show application details
    Show {
        /// Application ID
        id: String,
    },

    /// Show response and conversion rates
    Stats,

    /// Merge duplicate applications
    Dedupe {
        /// Show what would be merged without merging
        #[arg(long)]
        dry_run: bool,
    },
}

fn init_tracing(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), level))),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn parse_date(value: Option<&str>) -> Result<NaiveDate> {
    match value {
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s)),
        None => Ok(Local::now().date_naive()),
    }
}

/// A digest argument is either an id (`2026-10-18`, looked up in the digests
/// directory) or a path to a `.md` file. The id is the file stem either way.
fn digest_location(config: &Config, arg: &str) -> Result<(String, PathBuf)> {
    let as_path = Path::new(arg);
    let path = if arg.ends_with(".md") || as_path.components().count() > 1 {
        as_path.to_path_buf()
    } else {
        config.digests_dir().join(format!("{}.md", arg))
    };
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid digest '{}'", arg))?;
    Ok((id, path))
}

fn load_tracker(db: &Database, config: &Config) -> Result<Tracker> {
    Ok(Tracker::new(db.list_applications()?, config.date_tolerance_days))
}

/// Record one application and persist the survivor, dropping absorbed rows.
fn record_application(db: &Database, tracker: &mut Tracker, app: Application) -> Result<(String, bool)> {
    let recorded = tracker.record(app);
    let saved = tracker
        .get(&recorded.id)
        .ok_or_else(|| anyhow!("Application {} vanished after recording", recorded.id))?;
    db.save_application(saved, &recorded.absorbed)?;
    Ok((recorded.id, recorded.merged))
}

fn ingest(db: &Database, config: &Config, digest_id: &str, path: &Path, input: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let items: Vec<serde_json::Value> = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid job records in {}", input.display()))?;
    let total = items.len();

    let exclusions: HashSet<String> = digest::exclusion_set(&config.digests_dir(), Some(path))?;
    let removed = enrich::removed_identities(db, digest_id)?;
    let mut known = KnownJobs::new();
    let mut dropped: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut merged = 0;

    let mut records = Vec::with_capacity(total);
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<RawJobRecord>(item) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(index, error = %e, "skipping malformed record");
                *dropped.entry("malformed").or_default() += 1;
            }
        }
    }

    for record in &records {
        match identity::resolve(record, &mut known, &exclusions, config) {
            Resolution::Admitted(resolved) => {
                debug!(identity = %resolved.identity, title = %resolved.posting.title, new = resolved.is_new, "admitted record");
                if !resolved.is_new {
                    merged += 1;
                }
            }
            Resolution::Dropped(reason) => {
                debug!(title = %record.title, reason = reason.kind(), "dropped record");
                *dropped.entry(reason.kind()).or_default() += 1;
            }
        }
    }

    let jobs: Vec<RankedJob> = known
        .iter()
        .map(|posting| RankedJob {
            posting: JobPosting {
                excluded: removed.contains(&posting.identity),
                ..posting.clone()
            },
            section: Section::for_score(posting.score, config.best_match_threshold),
        })
        .collect();

    let document = DigestDocument::load_or_create(path, digest_id)?;
    let (document, report) = digest::reconcile(document, &jobs, &exclusions);
    document.save()?;
    enrich::register(db, &document, digest_id)?;

    info!(digest = digest_id, records = total, unique = known.len(), "ingested records");
    println!("Digest {} ({})", digest_id, path.display());
    println!("  Records read:     {}", total);
    println!("  Unique jobs:      {}", known.len());
    println!("  Merged in run:    {}", merged);
    println!("  Inserted:         {}", report.inserted);
    println!("  Updated:          {}", report.updated);
    println!("  Already resolved: {}", report.excluded);
    for (kind, count) in &dropped {
        println!("  Dropped ({}): {}", kind, count);
    }
    let (best, other) = document.body_counts();
    println!("  Best match: {} · Other: {}", best, other);
    Ok(())
}

fn print_application(app: &Application) {
    println!("Application {}", app.id);
    println!("Role: {}", app.role);
    println!("Organization: {}", app.organization);
    println!("Status: {}", app.status);
    println!("Applied: {}", app.applied_date);
    println!("Source: {}", app.source);
    if let Some(url) = &app.url {
        println!("URL: {}", url);
    }
    if let Some(days) = app.response_days {
        println!("Days to response: {}", days);
    }
    if !app.interview_dates.is_empty() {
        let dates: Vec<String> = app.interview_dates.iter().map(|d| d.to_string()).collect();
        println!("Interviews: {}", dates.join(", "));
    }
    if let Some(date) = app.offer_date {
        println!("Offer: {}", date);
    }
    if let Some(date) = app.rejection_date {
        println!("Rejected: {}", date);
    }
    if let Some(feedback) = &app.feedback {
        println!("Feedback ({}): {}", feedback.kind, feedback.text);
    }
    println!("\n--- History ---");
    for entry in &app.status_history {
        match &entry.note {
            Some(note) => println!("  {} {:<10} {}", entry.date, entry.status, note),
            None => println!("  {} {}", entry.date, entry.status),
        }
    }
}

fn percent(rate: f64) -> String {
    format!("{:.0}%", rate * 100.0)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    init_tracing(&config.log_level);

    let db = Database::open(&config.db_path())?;

    match cli.command {
        Commands::Init => {
            db.init()?;
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Ingest { digest, input } => {
            db.ensure_initialized()?;
            let digest = digest.unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string());
            let (digest_id, path) = digest_location(&config, &digest)?;
            ingest(&db, &config, &digest_id, &path, &input)?;
        }

        Commands::Pending { digest } => {
            db.ensure_initialized()?;
            let (digest_id, path) = digest_location(&config, &digest)?;
            let document = DigestDocument::load(&path)?;
            let pending = enrich::pending(&db, &document, &digest_id)?;
            if pending.is_empty() {
                println!("Nothing pending in {}.", digest_id);
            } else {
                println!("{:<24} {}", "IDENTITY", "JOB");
                println!("{}", "-".repeat(76));
                for id in &pending {
                    let label = document.entry(id).map(|e| e.label()).unwrap_or_default();
                    println!("{:<24} {}", truncate(id, 22), truncate(&label, 50));
                }
                println!("\n{} pending.", pending.len());
            }
        }

        Commands::Enrich { digest, batch } => {
            db.ensure_initialized()?;
            let command = config
                .enricher_command
                .as_deref()
                .ok_or_else(|| anyhow!("No enricher_command set in config"))?;
            let mut enricher = CommandEnricher::new(command)?;
            let (digest_id, path) = digest_location(&config, &digest)?;
            let mut document = DigestDocument::load(&path)?;
            let batch = batch.unwrap_or(config.batch_size);

            let report = enrich::run_batch(&db, &mut document, &digest_id, batch, &mut enricher, &config)?;
            if report.replayed > 0 {
                println!("Re-applied {} saved result(s) to the digest.", report.replayed);
            }
            println!(
                "Completed {} (enriched {}, removed {}).",
                report.completed, report.enriched, report.removed
            );
            match &report.aborted {
                Some(reason) => {
                    println!("Stopped early: {}", reason);
                    println!("{} items remaining, re-run to continue.", report.remaining);
                }
                None if report.remaining > 0 => {
                    println!("{} items remaining, re-run to continue.", report.remaining);
                }
                None => println!("All jobs in {} are enriched.", digest_id),
            }
        }

        Commands::Apply {
            role,
            org,
            date,
            source,
            url,
            origin,
        } => {
            db.ensure_initialized()?;
            let origin: Origin = origin.parse()?;
            let mut app = Application::new(
                new_application_id(),
                &role,
                &org,
                parse_date(date.as_deref())?,
                &source,
                origin,
            );
            app.job_identity = url.as_deref().and_then(identity::extract_identity);
            app.url = url;

            let mut tracker = load_tracker(&db, &config)?;
            let (id, merged) = record_application(&db, &mut tracker, app)?;
            if merged {
                println!("Merged into existing application {}.", id);
            } else {
                println!("Recorded application {}.", id);
            }
        }

        Commands::SyncDigest { digest, date } => {
            db.ensure_initialized()?;
            let (_, path) = digest_location(&config, &digest)?;
            let document = DigestDocument::load(&path)?;
            let candidates = applications::candidates_from_digest(&document, parse_date(date.as_deref())?);

            let mut tracker = load_tracker(&db, &config)?;
            let (mut created, mut merged) = (0, 0);
            for app in candidates {
                match record_application(&db, &mut tracker, app)? {
                    (_, true) => merged += 1,
                    (_, false) => created += 1,
                }
            }
            println!("New applications: {}", created);
            println!("Already tracked:  {}", merged);
        }

        Commands::Advance {
            id,
            status,
            date,
            note,
        } => {
            db.ensure_initialized()?;
            let status: ApplicationStatus = status.parse()?;
            let mut tracker = load_tracker(&db, &config)?;
            let app = tracker.transition(&id, status, parse_date(date.as_deref())?, note)?;
            db.save_application(app, &[])?;
            println!("{} is now {}.", app.id, app.status);
            if let (ApplicationStatus::Responded, Some(days)) = (status, app.response_days) {
                println!("Days to response: {}", days);
            }
        }

        Commands::Feedback { id, kind, text } => {
            db.ensure_initialized()?;
            let mut tracker = load_tracker(&db, &config)?;
            let app = tracker.add_feedback(&id, &kind, &text)?;
            db.save_application(app, &[])?;
            println!("Feedback saved for {}.", app.id);
        }

        Commands::List { status } => {
            db.ensure_initialized()?;
            let filter: Option<ApplicationStatus> = status.as_deref().map(str::parse::<ApplicationStatus>).transpose()?;
            let apps: Vec<Application> = db
                .list_applications()?
                .into_iter()
                .filter(|a| filter.is_none_or(|s| a.status == s))
                .collect();
            if apps.is_empty() {
                println!("No applications found.");
            } else {
                println!(
                    "{:<13} {:<10} {:<28} {:<20} {:<11} {:<10}",
                    "ID", "STATUS", "ROLE", "ORGANIZATION", "APPLIED", "SOURCE"
                );
                println!("{}", "-".repeat(97));
                for app in apps {
                    println!(
                        "{:<13} {:<10} {:<28} {:<20} {:<11} {:<10}",
                        app.id,
                        app.status,
                        truncate(&app.role, 26),
                        truncate(&app.organization, 18),
                        app.applied_date,
                        truncate(&app.source, 10)
                    );
                }
            }
        }

        Commands::Show { id } => {
            db.ensure_initialized()?;
            match db.get_application(&id)? {
                Some(app) => print_application(&app),
                None => println!("Application {} not found.", id),
            }
        }

        Commands::Stats => {
            db.ensure_initialized()?;
            let tracker = load_tracker(&db, &config)?;
            let metrics = tracker.metrics();
            if metrics.total == 0 {
                println!("No applications yet.");
                return Ok(());
            }

            println!("Applications:         {}", metrics.total);
            for (status, count) in &metrics.by_status {
                println!("  {:<19} {}", status, count);
            }
            println!("Response rate:        {}", percent(metrics.response_rate));
            println!("Response → interview: {}", percent(metrics.interview_conversion_rate));
            println!("Interview → offer:    {}", percent(metrics.offer_conversion_rate));
            if let Some(days) = metrics.average_response_days {
                println!("Avg days to response: {:.1}", days);
            }

            for (title, breakdown) in [("SOURCE", &metrics.by_source), ("ROLE", &metrics.by_role)] {
                println!();
                println!("{:<30} {:>6} {:>9} {:>10} {:>6} {:>8}", title, "TOTAL", "REPLIED", "INTERVIEW", "OFFER", "REJECTED");
                println!("{}", "-".repeat(74));
                for (key, b) in breakdown {
                    println!(
                        "{:<30} {:>6} {:>9} {:>10} {:>6} {:>8}",
                        truncate(key, 28),
                        b.total,
                        b.responded,
                        b.interviews,
                        b.offers,
                        b.rejected
                    );
                }
            }
            if let Some(updated) = db.applications_updated_at()? {
                println!("\nLast updated: {}", updated);
            }
        }

        Commands::Dedupe { dry_run } => {
            db.ensure_initialized()?;
            let mut tracker = load_tracker(&db, &config)?;
            let merges = tracker.dedupe();
            if merges.is_empty() {
                println!("No duplicate applications found.");
                return Ok(());
            }

            let mut total = 0;
            for recorded in &merges {
                println!("{} <- {}", recorded.id, recorded.absorbed.join(", "));
                total += recorded.absorbed.len();
                if !dry_run {
                    let survivor = tracker
                        .get(&recorded.id)
                        .ok_or_else(|| anyhow!("Application {} vanished during dedupe", recorded.id))?;
                    db.save_application(survivor, &recorded.absorbed)?;
                }
            }
            if dry_run {
                println!("\nWould merge {} duplicate(s).", total);
            } else {
                println!("\nMerged {} duplicate(s).", total);
            }
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
