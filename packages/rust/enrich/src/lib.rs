//! Per-record enrichment: EIN lookups and region filtering.
//!
//! This crate provides:
//! - [`EnrichmentClient`] — templated per-EIN lookups with a named
//!   pre-filter step and bounded retry
//! - [`RegionResolver`] — the injected region-mapping collaborator, with
//!   [`DisplayNameResolver`] as the stateless default

pub mod client;
pub mod region;

pub use client::{EnrichmentClient, LookupConfig};
pub use region::{DisplayNameResolver, RegionResolver};
