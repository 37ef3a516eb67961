//! Bounded fan-out of record lookups across a fixed worker pool.
//!
//! Records arrive over a bounded mpsc channel; the producer's blocking
//! send is the system's only backpressure. Each worker drains the shared
//! channel in small batches and runs the batch's lookups concurrently —
//! the lookup is I/O bound and must never be serialized one-at-a-time.
//! The closed channel is the termination sentinel: on observing it, a
//! worker sends exactly one completion report and exits.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::debug;

use mrfscan_enrich::EnrichmentClient;
use mrfscan_shared::{FailureRecord, PlanRecord};

use crate::aggregate::WorkerReport;

/// Fixed-size worker pool draining a bounded record queue.
pub struct FanoutScheduler {
    workers: usize,
    batch: usize,
}

impl FanoutScheduler {
    pub fn new(workers: usize, batch: usize) -> Self {
        Self {
            workers: workers.max(1),
            batch: batch.max(1),
        }
    }

    /// Spawn the pool. Returns the completion channel (exactly one
    /// [`WorkerReport`] per worker) and the worker handles.
    pub fn spawn(
        &self,
        client: Arc<EnrichmentClient>,
        work: mpsc::Receiver<PlanRecord>,
    ) -> (mpsc::Receiver<WorkerReport>, Vec<JoinHandle<()>>) {
        // Capacity = worker count, so completion sends never block.
        let (report_tx, report_rx) = mpsc::channel::<WorkerReport>(self.workers);
        let work = Arc::new(Mutex::new(work));

        let handles = (0..self.workers)
            .map(|worker_id| {
                let work = work.clone();
                let client = client.clone();
                let report_tx = report_tx.clone();
                let batch = self.batch;

                tokio::spawn(async move {
                    let report = run_worker(worker_id, work, client, batch).await;
                    let _ = report_tx.send(report).await;
                })
            })
            .collect();

        (report_rx, handles)
    }
}

/// Drain the shared queue until it closes, looking up each batch concurrently.
async fn run_worker(
    worker_id: usize,
    work: Arc<Mutex<mpsc::Receiver<PlanRecord>>>,
    client: Arc<EnrichmentClient>,
    batch: usize,
) -> WorkerReport {
    let mut report = WorkerReport::default();

    loop {
        // Take up to `batch` records. Await only for the first one, and
        // only while the queue is actually empty.
        let mut records = Vec::with_capacity(batch);
        {
            let mut rx = work.lock().await;
            match rx.recv().await {
                Some(record) => records.push(record),
                None => break,
            }
            while records.len() < batch {
                match rx.try_recv() {
                    Ok(record) => records.push(record),
                    Err(_) => break,
                }
            }
        }

        let results = join_all(records.iter().map(|r| client.lookup_with_retry(&r.ein))).await;

        for (record, result) in records.iter().zip(results) {
            report.records += 1;
            match result {
                Ok(urls) => report.urls.extend(urls),
                Err(e) => {
                    // One failure entry per abandoned identifier; an
                    // eventual retry success never lands here.
                    report
                        .failures
                        .push(FailureRecord::new(&record.ein, e.to_string()));
                }
            }
        }
    }

    debug!(
        worker_id,
        records = report.records,
        urls = report.urls.len(),
        failures = report.failures.len(),
        "worker drained, reporting"
    );
    report
}
