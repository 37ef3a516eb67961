//! Shared types, error model, and configuration for mrfscan.
//!
//! This crate is the foundation depended on by all other mrfscan crates.
//! It provides:
//! - [`MrfScanError`] — the unified error type
//! - Domain types ([`IndexEntry`], [`PlanRecord`], [`LookupDocument`], [`FailureRecord`])
//! - Configuration ([`AppConfig`], [`ScanConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, FanoutConfig, FilterConfig, IndexConfig, LookupSettings, OutputConfig,
    ScanConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{MrfScanError, Result};
pub use types::{
    EIN_ID_TYPE, FailureRecord, FileRef, IndexEntry, LookupDocument, LookupFile, PlanRecord,
    ReportingPlan,
};
