//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use url::Url;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use mrfscan_core::pipeline::{ScanProgress, ScanResult, run_scan};
use mrfscan_enrich::DisplayNameResolver;
use mrfscan_shared::{ScanConfig, config_file_path, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// mrfscan — stream a price-transparency index into a region URL set.
#[derive(Parser)]
#[command(
    name = "mrfscan",
    version,
    about = "Scan a gzip-compressed plan index and collect target-region rate-file URLs.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run a full index scan.
    Scan {
        /// Index URL (overrides the configured one).
        url: Option<String>,

        /// Target region code, e.g. NY.
        #[arg(short, long)]
        region: Option<String>,

        /// Worker count (0 = one per available core).
        #[arg(short, long)]
        workers: Option<usize>,

        /// Decompressed chunk size in bytes.
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Output file for the URL set.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Output file for the failure log.
        #[arg(long)]
        failures: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "mrfscan=info",
        1 => "mrfscan=debug",
        _ => "mrfscan=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Scan {
            url,
            region,
            workers,
            chunk_size,
            out,
            failures,
        } => cmd_scan(url, region, workers, chunk_size, out, failures).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

async fn cmd_scan(
    url: Option<String>,
    region: Option<String>,
    workers: Option<usize>,
    chunk_size: Option<usize>,
    out: Option<PathBuf>,
    failures: Option<PathBuf>,
) -> Result<()> {
    let app_config = load_config()?;

    let mut config = ScanConfig::from(&app_config);
    if let Some(url) = url {
        config.index_url = url;
    }
    if let Some(region) = region {
        config.target_region = region;
    }
    if let Some(workers) = workers {
        config.workers = workers;
    }
    if let Some(chunk_size) = chunk_size {
        config.chunk_size_bytes = chunk_size;
    }

    Url::parse(&config.index_url)
        .map_err(|e| eyre!("invalid index URL '{}': {e}", config.index_url))?;

    let urls_path = out.unwrap_or_else(|| PathBuf::from(&app_config.output.urls_path));
    let failures_path =
        failures.unwrap_or_else(|| PathBuf::from(&app_config.output.failures_path));

    info!(
        url = %config.index_url,
        region = %config.target_region,
        workers = config.effective_workers(),
        "starting index scan"
    );

    let resolver = Arc::new(DisplayNameResolver::new(&config.date_tag));
    let progress = Arc::new(CliProgress::new());

    let result = run_scan(&config, resolver, progress).await?;

    // Sorted output keeps runs diffable regardless of worker scheduling.
    let mut urls: Vec<&String> = result.urls.iter().collect();
    urls.sort();
    let mut body = urls
        .iter()
        .map(|u| u.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    if !body.is_empty() {
        body.push('\n');
    }
    std::fs::write(&urls_path, body)
        .wrap_err_with(|| format!("writing URL set to '{}'", urls_path.display()))?;

    if !result.failures.is_empty() {
        let log = result
            .failures
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join("\n")
            + "\n";
        std::fs::write(&failures_path, log).wrap_err_with(|| {
            format!("writing failure log to '{}'", failures_path.display())
        })?;
    }

    println!();
    println!("  Scan complete!");
    println!("  Region:     {}", config.target_region);
    println!("  URLs:       {}", result.urls.len());
    println!("  Records:    {}", result.records_dispatched);
    println!("  Lines:      {}", result.lines_seen);
    println!("  Failures:   {}", result.failures.len());
    println!("  Output:     {}", urls_path.display());
    if !result.failures.is_empty() {
        println!("  Failure log: {}", failures_path.display());
    }
    println!("  Time:       {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif byte bar.
struct CliProgress {
    bar: ProgressBar,
    sized: AtomicBool,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} {msg} {bytes:>10}/{total_bytes:<10} \
                 {bytes_per_sec}  elapsed: {elapsed_precise}",
            )
            .unwrap(),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        Self {
            bar,
            sized: AtomicBool::new(false),
        }
    }
}

impl ScanProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn bytes_read(&self, read: u64, hint: Option<u64>) {
        if !self.sized.swap(true, Ordering::Relaxed) {
            // The declared length is only an estimate.
            if let Some(hint) = hint {
                self.bar.set_length(hint);
            }
        }
        if let Some(len) = self.bar.length() {
            if read > len {
                self.bar.set_length(read);
            }
        }
        self.bar.set_position(read);
    }

    fn records_dispatched(&self, count: u64) {
        self.bar.set_message(format!("Streaming index ({count} records)"));
    }

    fn done(&self, _result: &ScanResult) {
        self.bar.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config written to {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let path = config_file_path()?;
    let config = load_config()?;
    println!("# {}", path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
