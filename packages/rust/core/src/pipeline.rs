//! End-to-end scan pipeline: index stream → records → fan-out → URL set.
//!
//! Stage layout: the download pump runs async; decompression, framing,
//! and parsing run stream-ordered on one blocking task (the producer);
//! enrichment fans out across the worker pool; the aggregator merges the
//! partial sets once every worker has reported.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use mrfscan_enrich::{EnrichmentClient, LookupConfig, RegionResolver};
use mrfscan_index::{ChunkedDecompressor, IndexSource, LineFramer, build_client, is_record_line,
    parse_record};
use mrfscan_shared::{FailureRecord, MrfScanError, PlanRecord, Result, ScanConfig};

use crate::aggregate;
use crate::scheduler::FanoutScheduler;

/// Compressed chunks buffered between the download pump and the decoder.
const BYTE_CHANNEL_CAP: usize = 16;

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting scan status.
pub trait ScanProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called as compressed bytes arrive. `hint` is the declared content
    /// length — an estimate only, routinely exceeded.
    fn bytes_read(&self, read: u64, hint: Option<u64>);
    /// Called as records are dispatched to the workers.
    fn records_dispatched(&self, count: u64);
    /// Called when the pipeline completes.
    fn done(&self, result: &ScanResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ScanProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn bytes_read(&self, _read: u64, _hint: Option<u64>) {}
    fn records_dispatched(&self, _count: u64) {}
    fn done(&self, _result: &ScanResult) {}
}

// ---------------------------------------------------------------------------
// ScanResult
// ---------------------------------------------------------------------------

/// Final result of a scan.
#[derive(Debug)]
pub struct ScanResult {
    /// The deduplicated set of target-region URLs. The sole output.
    pub urls: HashSet<String>,
    /// Diagnostic side-channel: lines and identifiers that were skipped.
    /// A non-empty log is a signal for follow-up, not a run failure.
    pub failures: Vec<FailureRecord>,
    /// Lines framed from the decompressed stream (noise included).
    pub lines_seen: u64,
    /// Eligible records handed to the worker pool.
    pub records_dispatched: u64,
    /// Total elapsed time.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Counters and local failures from the producer stage.
#[derive(Debug, Default)]
struct ProducerStats {
    lines_seen: u64,
    records_dispatched: u64,
    parse_failures: Vec<FailureRecord>,
}

/// Run the full scan pipeline.
///
/// Transport and decompression failures are fatal; every per-record and
/// per-identifier failure is recorded and skipped, so a result set is
/// produced whenever the index stream itself survives.
#[instrument(skip_all, fields(url = %config.index_url))]
pub async fn run_scan(
    config: &ScanConfig,
    resolver: Arc<dyn RegionResolver>,
    progress: Arc<dyn ScanProgress>,
) -> Result<ScanResult> {
    let start = Instant::now();
    let workers = config.effective_workers();

    info!(
        workers,
        queue_depth = config.queue_depth,
        chunk_size = config.chunk_size_bytes,
        target_region = %config.target_region,
        "starting scan"
    );

    // --- Open the index stream (non-success status here is fatal) ---
    progress.phase("Opening index stream");
    let client = build_client()?;
    let source = IndexSource::open(&client, &config.index_url).await?;
    let size_hint = source.content_length();

    let bytes_read = Arc::new(AtomicU64::new(0));
    let (reader, pump) = source.into_byte_reader(BYTE_CHANNEL_CAP, bytes_read.clone());

    // --- Worker pool over the bounded record queue ---
    let lookup_client = Arc::new(EnrichmentClient::new(
        LookupConfig::from(config),
        resolver,
    )?);
    let (work_tx, work_rx) = mpsc::channel::<PlanRecord>(config.queue_depth);
    let (report_rx, worker_handles) =
        FanoutScheduler::new(workers, config.worker_batch).spawn(lookup_client, work_rx);

    // --- Producer: decompress → frame → parse, with backpressure ---
    progress.phase("Streaming index");
    let producer = {
        let chunk_size = config.chunk_size_bytes;
        let skip_descriptions = config.skip_descriptions.clone();
        let progress = progress.clone();
        let bytes_read = bytes_read.clone();

        tokio::task::spawn_blocking(move || -> Result<ProducerStats> {
            let mut stats = ProducerStats::default();
            let mut decompressor = ChunkedDecompressor::new(reader, chunk_size);
            let mut framer = LineFramer::new();

            while let Some(chunk) = decompressor.next_chunk()? {
                for line in framer.push(&chunk) {
                    stats.lines_seen += 1;
                    if !is_record_line(&line) {
                        continue;
                    }
                    match parse_record(&line, &skip_descriptions) {
                        Ok(Some(record)) => {
                            // Full queue blocks here: backpressure on the
                            // framer, never unbounded buffering.
                            if work_tx.blocking_send(record).is_err() {
                                warn!("record queue closed early, stopping producer");
                                return Ok(stats);
                            }
                            stats.records_dispatched += 1;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            stats.parse_failures.push(FailureRecord::new(
                                preview(&line),
                                e.to_string(),
                            ));
                        }
                    }
                }
                progress.bytes_read(bytes_read.load(Ordering::Relaxed), size_hint);
                progress.records_dispatched(stats.records_dispatched);
            }

            // An unterminated record line at end of stream is parsed on a
            // best-effort basis; anything malformed there is dropped
            // silently (the format terminates all meaningful lines).
            if let Some(line) = framer.finish() {
                stats.lines_seen += 1;
                if let Ok(Some(record)) = parse_record(&line, &skip_descriptions) {
                    if work_tx.blocking_send(record).is_ok() {
                        stats.records_dispatched += 1;
                    }
                }
            }

            Ok(stats)
        })
    };

    // Producer finishing (and dropping the sender) is the workers'
    // termination sentinel; collect exactly one report per worker.
    let produced = match producer.await {
        Ok(result) => result,
        Err(e) => Err(MrfScanError::Decompress(format!("index stage panicked: {e}"))),
    };
    let merged = aggregate::collect(report_rx, workers).await;
    for handle in worker_handles {
        let _ = handle.await;
    }
    let _ = pump.await;

    // Fatal stream errors surface only after the dispatched work is
    // accounted for, so nothing is left running.
    let stats = produced?;

    let mut failures = stats.parse_failures;
    failures.extend(merged.failures);

    let result = ScanResult {
        urls: merged.urls,
        failures,
        lines_seen: stats.lines_seen,
        records_dispatched: stats.records_dispatched,
        elapsed: start.elapsed(),
    };

    progress.done(&result);
    info!(
        urls = result.urls.len(),
        failures = result.failures.len(),
        lines_seen = result.lines_seen,
        records_dispatched = result.records_dispatched,
        elapsed_ms = result.elapsed.as_millis(),
        "scan complete"
    );

    Ok(result)
}

/// Short line preview for the failure log.
fn preview(line: &str) -> String {
    const MAX: usize = 120;
    match line.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}…", &line[..idx]),
        None => line.to_string(),
    }
}
