//! Merging of per-worker partial results.
//!
//! Workers never share a mutable set: each one accumulates its own
//! partial result and sends exactly one [`WorkerReport`] when the work
//! channel closes. The aggregator owns the final set and finalizes only
//! after every worker is accounted for.

use std::collections::HashSet;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use mrfscan_shared::FailureRecord;

/// One worker's complete partial result.
#[derive(Debug, Default)]
pub struct WorkerReport {
    /// Target-region URLs this worker found.
    pub urls: HashSet<String>,
    /// Identifiers this worker gave up on.
    pub failures: Vec<FailureRecord>,
    /// Records this worker processed.
    pub records: u64,
}

/// Union of all worker reports.
#[derive(Debug, Default)]
pub struct Merged {
    /// Deduplicated URL set; grows monotonically, never shrinks.
    pub urls: HashSet<String>,
    /// All recorded failures, worker order unspecified.
    pub failures: Vec<FailureRecord>,
    /// Total records processed across workers.
    pub records: u64,
}

/// Merge reports by set union. Order-insensitive and idempotent:
/// merging the same multiset of reports always yields the same set.
pub fn merge(reports: impl IntoIterator<Item = WorkerReport>) -> Merged {
    let mut merged = Merged::default();
    for report in reports {
        merged.urls.extend(report.urls);
        merged.failures.extend(report.failures);
        merged.records += report.records;
    }
    merged
}

/// Wait for exactly `expected` worker reports, then merge them.
///
/// The channel closing early (a worker died without reporting) is logged
/// and the partial merge returned; the scan still produces a result.
pub async fn collect(mut reports: mpsc::Receiver<WorkerReport>, expected: usize) -> Merged {
    let mut received = Vec::with_capacity(expected);
    while received.len() < expected {
        match reports.recv().await {
            Some(report) => {
                debug!(
                    worker_reports = received.len() + 1,
                    expected,
                    urls = report.urls.len(),
                    "worker report received"
                );
                received.push(report);
            }
            None => {
                warn!(
                    received = received.len(),
                    expected, "report channel closed before all workers reported"
                );
                break;
            }
        }
    }
    merge(received)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(urls: &[&str], records: u64) -> WorkerReport {
        WorkerReport {
            urls: urls.iter().map(|s| s.to_string()).collect(),
            failures: Vec::new(),
            records,
        }
    }

    #[test]
    fn merge_unions_and_dedups() {
        let merged = merge(vec![
            report(&["a", "b"], 2),
            report(&["b", "c"], 3),
            report(&[], 1),
        ]);
        assert_eq!(
            merged.urls,
            HashSet::from(["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(merged.records, 6);
    }

    #[test]
    fn merge_is_order_insensitive() {
        let forward = merge(vec![report(&["a", "b"], 1), report(&["c"], 1)]);
        let reverse = merge(vec![report(&["c"], 1), report(&["a", "b"], 1)]);
        assert_eq!(forward.urls, reverse.urls);
    }

    #[test]
    fn merge_is_idempotent_over_the_same_multiset() {
        let reports = || vec![report(&["a"], 1), report(&["a", "b"], 2)];
        assert_eq!(merge(reports()).urls, merge(reports()).urls);
    }

    #[tokio::test]
    async fn collect_waits_for_every_worker() {
        let (tx, rx) = mpsc::channel(4);
        let collector = tokio::spawn(collect(rx, 3));

        for urls in [&["a"][..], &["b"][..], &["a", "c"][..]] {
            tx.send(report(urls, 1)).await.unwrap();
        }
        drop(tx);

        let merged = collector.await.unwrap();
        assert_eq!(merged.urls.len(), 3);
        assert_eq!(merged.records, 3);
    }

    #[tokio::test]
    async fn collect_survives_a_missing_report() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(report(&["a"], 1)).await.unwrap();
        drop(tx);

        let merged = collect(rx, 2).await;
        assert_eq!(merged.urls.len(), 1);
    }
}
