//! Application configuration for mrfscan.
//!
//! User config lives at `~/.mrfscan/mrfscan.toml`.
//! CLI flags override config file values, which override defaults.
//! Defaults target the monthly transparency index this tool was built for;
//! every knob is overridable for other payers or months.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MrfScanError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "mrfscan.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".mrfscan";

// ---------------------------------------------------------------------------
// Config structs (matching mrfscan.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Index download settings.
    #[serde(default)]
    pub index: IndexConfig,

    /// Per-EIN lookup settings.
    #[serde(default)]
    pub lookup: LookupSettings,

    /// Fan-out / worker pool settings.
    #[serde(default)]
    pub fanout: FanoutConfig,

    /// Region filtering settings.
    #[serde(default)]
    pub filter: FilterConfig,

    /// Output file settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[index]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// URL of the gzip-compressed index document.
    #[serde(default = "default_index_url")]
    pub url: String,

    /// Decompressed chunk size in bytes handed to the line framer.
    #[serde(default = "default_chunk_size")]
    pub chunk_size_bytes: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: default_index_url(),
            chunk_size_bytes: default_chunk_size(),
        }
    }
}

fn default_index_url() -> String {
    "https://antm-pt-prod-dataz-nogbd-nophi-us-east1.s3.amazonaws.com/anthem/2023-04-01_anthem_index.json.gz".into()
}
fn default_chunk_size() -> usize {
    10 * 1024 * 1024
}

/// `[lookup]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupSettings {
    /// Lookup URL template; `{ein}` is replaced by the identifier value.
    #[serde(default = "default_lookup_template")]
    pub url_template: String,

    /// Maximum attempts per identifier before recording a failure.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base backoff in milliseconds, doubled on each retry.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Cheap substring pre-filter applied to the raw response body.
    ///
    /// A body without this marker is treated as having no matching files,
    /// skipping the full parse. The marker must never cause a false
    /// negative relative to full parsing — it is a performance filter,
    /// not a correctness requirement. Empty string disables it.
    #[serde(default = "default_prefilter_marker")]
    pub prefilter_marker: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_lookup_timeout")]
    pub timeout_secs: u64,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            url_template: default_lookup_template(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            prefilter_marker: default_prefilter_marker(),
            timeout_secs: default_lookup_timeout(),
        }
    }
}

fn default_lookup_template() -> String {
    "https://antm-pt-prod-dataz-nogbd-nophi-us-east1.s3.amazonaws.com/anthem/{ein}.json".into()
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    250
}
fn default_prefilter_marker() -> String {
    "_PPO_".into()
}
fn default_lookup_timeout() -> u64 {
    60
}

/// `[fanout]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutConfig {
    /// Worker pool size; 0 means available parallelism.
    #[serde(default)]
    pub workers: usize,

    /// Bounded depth of the record queue between framer and workers.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// Records a worker looks up concurrently in one batch.
    #[serde(default = "default_worker_batch")]
    pub worker_batch: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            queue_depth: default_queue_depth(),
            worker_batch: default_worker_batch(),
        }
    }
}

fn default_queue_depth() -> usize {
    1024
}
fn default_worker_batch() -> usize {
    32
}

/// `[filter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Two-letter region code candidate URLs must resolve to.
    #[serde(default = "default_target_region")]
    pub target_region: String,

    /// Date tag preceding the region code in display names.
    #[serde(default = "default_date_tag")]
    pub date_tag: String,

    /// Inline file descriptions that never trigger enrichment.
    #[serde(default = "default_skip_descriptions")]
    pub skip_descriptions: Vec<String>,

    /// Lookup response categories inspected for candidate URLs.
    #[serde(default = "default_category_keys")]
    pub category_keys: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            target_region: default_target_region(),
            date_tag: default_date_tag(),
            skip_descriptions: default_skip_descriptions(),
            category_keys: default_category_keys(),
        }
    }
}

fn default_target_region() -> String {
    "NY".into()
}
fn default_date_tag() -> String {
    "2023-04_".into()
}
fn default_skip_descriptions() -> Vec<String> {
    vec!["Dental Vision".into()]
}
fn default_category_keys() -> Vec<String> {
    vec![
        "In-Network Negotiated Rates Files".into(),
        "Blue Cross Blue Shield Association Out-of-Area Rates Files".into(),
    ]
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// File the deduplicated URL set is written to.
    #[serde(default = "default_urls_path")]
    pub urls_path: String,

    /// Append-only failure log path.
    #[serde(default = "default_failures_path")]
    pub failures_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            urls_path: default_urls_path(),
            failures_path: default_failures_path(),
        }
    }
}

fn default_urls_path() -> String {
    "region_urls.txt".into()
}
fn default_failures_path() -> String {
    "failed_lookups.txt".into()
}

// ---------------------------------------------------------------------------
// Scan config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime scan configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Index document URL.
    pub index_url: String,
    /// Decompressed chunk size in bytes.
    pub chunk_size_bytes: usize,
    /// Lookup URL template with `{ein}` placeholder.
    pub lookup_url_template: String,
    /// Maximum lookup attempts per identifier.
    pub retry_attempts: u32,
    /// Base retry backoff in milliseconds.
    pub retry_backoff_ms: u64,
    /// Pre-filter substring; `None` disables the short-circuit.
    pub prefilter_marker: Option<String>,
    /// Per-lookup timeout in seconds.
    pub lookup_timeout_secs: u64,
    /// Worker pool size; 0 means available parallelism.
    pub workers: usize,
    /// Bounded record queue depth.
    pub queue_depth: usize,
    /// Concurrent lookups per worker batch.
    pub worker_batch: usize,
    /// Target region code.
    pub target_region: String,
    /// Date tag used by the display-name resolver.
    pub date_tag: String,
    /// Inline file descriptions excluded from enrichment.
    pub skip_descriptions: Vec<String>,
    /// Lookup categories inspected for candidates.
    pub category_keys: Vec<String>,
}

impl From<&AppConfig> for ScanConfig {
    fn from(config: &AppConfig) -> Self {
        let marker = config.lookup.prefilter_marker.clone();
        Self {
            index_url: config.index.url.clone(),
            chunk_size_bytes: config.index.chunk_size_bytes,
            lookup_url_template: config.lookup.url_template.clone(),
            retry_attempts: config.lookup.retry_attempts,
            retry_backoff_ms: config.lookup.retry_backoff_ms,
            prefilter_marker: (!marker.is_empty()).then_some(marker),
            lookup_timeout_secs: config.lookup.timeout_secs,
            workers: config.fanout.workers,
            queue_depth: config.fanout.queue_depth,
            worker_batch: config.fanout.worker_batch,
            target_region: config.filter.target_region.clone(),
            date_tag: config.filter.date_tag.clone(),
            skip_descriptions: config.filter.skip_descriptions.clone(),
            category_keys: config.filter.category_keys.clone(),
        }
    }
}

impl ScanConfig {
    /// Worker pool size with the 0 = auto rule applied.
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.mrfscan/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| MrfScanError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.mrfscan/mrfscan.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MrfScanError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        MrfScanError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| MrfScanError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| MrfScanError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| MrfScanError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
