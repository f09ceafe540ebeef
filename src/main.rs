//! URL Analyzer main entry point
//!
//! This is the command-line interface for the URL Analyzer background workers
//! and the job queue they serve.

use clap::{ArgGroup, Parser};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use url_analyzer::config::{load_config_with_hash, Config};
use url_analyzer::crawler::{parse_target_url, Crawler};
use url_analyzer::output::{format_job_detail, format_job_line, load_statistics, print_statistics};
use url_analyzer::state::JobStatus;
use url_analyzer::storage::{open_store, JobQuery, JobStore};
use url_analyzer::worker::Dispatcher;

/// URL Analyzer: background page analysis for queued URLs
///
/// Without a mode flag the analyzer runs its worker pool against the job
/// store until interrupted. The other modes manage the queue and exit.
#[derive(Parser, Debug)]
#[command(name = "url-analyzer")]
#[command(version)]
#[command(about = "Background analyzer for queued web pages", long_about = None)]
#[command(group(
    ArgGroup::new("mode")
        .args(["submit", "requeue", "stop", "delete", "show", "list", "stats", "dry_run"])
        .multiple(false)
))]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Queue one or more URLs for analysis and exit
    #[arg(long, value_name = "URL", num_args = 1..)]
    submit: Vec<String>,

    /// Owner recorded on submitted jobs
    #[arg(long, requires = "submit")]
    owner: Option<String>,

    /// Put jobs back in the queue
    #[arg(long, value_name = "ID", num_args = 1..)]
    requeue: Vec<i64>,

    /// Mark running jobs as stopped
    #[arg(long, value_name = "ID", num_args = 1..)]
    stop: Vec<i64>,

    /// Delete jobs and their broken-link records
    #[arg(long, value_name = "ID", num_args = 1..)]
    delete: Vec<i64>,

    /// Show one job with its results and broken links
    #[arg(long, value_name = "ID")]
    show: Option<i64>,

    /// List jobs, oldest first
    #[arg(long)]
    list: bool,

    /// Only list jobs with this status
    #[arg(long, requires = "list", value_parser = parse_status)]
    status: Option<JobStatus>,

    /// Only list jobs whose URL contains this text
    #[arg(long, requires = "list")]
    search: Option<String>,

    /// Maximum number of jobs to list
    #[arg(long, default_value_t = 50)]
    limit: u32,

    /// Show statistics from the database and exit
    #[arg(long)]
    stats: bool,

    /// Validate config and show the effective settings without running
    #[arg(long)]
    dry_run: bool,
}

fn parse_status(raw: &str) -> Result<JobStatus, String> {
    JobStatus::from_db_string(&raw.to_ascii_lowercase()).ok_or_else(|| {
        let known = JobStatus::ALL
            .iter()
            .map(JobStatus::to_db_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!("unknown status '{}' (expected one of: {})", raw, known)
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if !cli.submit.is_empty() {
        handle_submit(&config, &cli.submit, cli.owner.as_deref())?;
    } else if !cli.requeue.is_empty() {
        handle_set_status(&config, &cli.requeue, None, JobStatus::Queued)?;
    } else if !cli.stop.is_empty() {
        handle_set_status(&config, &cli.stop, Some(JobStatus::Running), JobStatus::Stopped)?;
    } else if !cli.delete.is_empty() {
        handle_delete(&config, &cli.delete)?;
    } else if let Some(job_id) = cli.show {
        handle_show(&config, job_id)?;
    } else if cli.list {
        let query = JobQuery {
            status: cli.status,
            search: cli.search,
            limit: cli.limit,
            ..JobQuery::default()
        };
        handle_list(&config, &query)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_run(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("url_analyzer=info,warn"),
            1 => EnvFilter::new("url_analyzer=debug,info"),
            2 => EnvFilter::new("url_analyzer=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_database(config: &Config) -> Result<Arc<dyn JobStore>, Box<dyn std::error::Error>> {
    let store = open_store(Path::new(&config.database.path))?;
    Ok(Arc::new(store))
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== URL Analyzer Dry Run ===\n");

    println!("Worker Configuration:");
    println!("  Pool size: {}", config.worker.pool_size);
    println!("  Poll interval: {}ms", config.worker.poll_interval_ms);
    println!("  Stale after: {}s", config.worker.stale_after_secs);
    match config.worker.job_timeout() {
        Some(timeout) => println!("  Job timeout: {}s", timeout.as_secs()),
        None => println!("  Job timeout: disabled"),
    }
    match config.worker.sweep_interval() {
        Some(every) => println!("  Periodic sweep: every {}s", every.as_secs()),
        None => println!("  Periodic sweep: startup only"),
    }
    println!("  Shutdown grace: {}s", config.worker.shutdown_grace_secs);

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Request timeout: {}s", config.http.request_timeout_secs);
    println!("  Connect timeout: {}s", config.http.connect_timeout_secs);
    println!(
        "  Link check concurrency: {}",
        config.http.link_check_concurrency
    );

    println!("\nDatabase:");
    println!("  Path: {}", config.database.path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --submit mode: queues new jobs
fn handle_submit(
    config: &Config,
    urls: &[String],
    owner: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Validate everything before queueing anything
    let targets = urls
        .iter()
        .map(|raw| parse_target_url(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let store = open_database(config)?;
    for target in targets {
        let job_id = store.create_job(target.as_str(), owner)?;
        tracing::info!(job_id, url = %target, "Queued job");
        println!("{}\t{}", job_id, target);
    }

    Ok(())
}

/// Handles the --requeue and --stop modes
fn handle_set_status(
    config: &Config,
    ids: &[i64],
    from: Option<JobStatus>,
    to: JobStatus,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_database(config)?;
    let changed = store.bulk_set_status(ids, from, to)?;
    println!("{} of {} job(s) set to {}", changed, ids.len(), to);
    Ok(())
}

/// Handles the --delete mode
fn handle_delete(config: &Config, ids: &[i64]) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_database(config)?;
    let deleted = store.delete_jobs(ids)?;
    println!("{} of {} job(s) deleted", deleted, ids.len());
    Ok(())
}

/// Handles the --show mode
fn handle_show(config: &Config, job_id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_database(config)?;
    let job = store.get_job(job_id)?;
    let broken = store.get_broken_links(job_id)?;
    print!("{}", format_job_detail(&job, &broken));
    Ok(())
}

/// Handles the --list mode
fn handle_list(config: &Config, query: &JobQuery) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_database(config)?;
    let jobs = store.list_jobs(query)?;
    if jobs.is_empty() {
        println!("No jobs found");
        return Ok(());
    }
    for job in &jobs {
        println!("{}", format_job_line(job));
    }
    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.database.path);

    let store = open_database(config)?;
    let stats = load_statistics(store.as_ref())?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the default mode: runs the dispatcher until interrupted
async fn handle_run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_database(&config)?;
    let analyzer = Arc::new(Crawler::new(&config.http, store.clone())?);
    let grace = config.worker.shutdown_grace();

    let shutdown = CancellationToken::new();
    let mut handle = Dispatcher::new(config.worker, store, analyzer).start(shutdown.clone());

    tokio::select! {
        _ = wait_for_signal() => {
            tracing::info!("Shutdown signal received");
        }
        joined = &mut handle => {
            // The dispatcher only returns on its own if the pool died
            let report = joined?;
            tracing::error!(?report, "Dispatcher exited unexpectedly");
            return Ok(());
        }
    }

    shutdown.cancel();
    match tokio::time::timeout(grace, &mut handle).await {
        Ok(Ok(report)) => {
            tracing::info!(
                claimed = report.claimed,
                completed = report.completed,
                failed = report.failed,
                "Shutdown complete"
            );
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Dispatcher task failed");
            return Err(e.into());
        }
        Err(_) => {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "In-flight jobs did not finish within the grace period; they will be recovered by the next sweep"
            );
            handle.abort();
        }
    }

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
