//! HTTP source for the compressed index document.
//!
//! The download runs on the async side; decompression and framing are
//! blocking and stream-ordered. [`IndexSource::into_byte_reader`] bridges
//! the two: a pump task forwards the response body into a bounded channel,
//! and [`ByteReader`] exposes that channel as `std::io::Read` for the
//! decoder running inside `spawn_blocking`.

use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::{Buf, Bytes};
use futures::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use mrfscan_shared::{MrfScanError, Result};

/// User-Agent string for index and lookup requests.
pub const USER_AGENT: &str = concat!("mrfscan/", env!("CARGO_PKG_VERSION"));

/// Connect timeout for the index request. No total timeout: the download
/// legitimately runs for hours.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the HTTP client used for the index download.
pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| MrfScanError::Transport(format!("failed to build HTTP client: {e}")))
}

// ---------------------------------------------------------------------------
// IndexSource
// ---------------------------------------------------------------------------

/// An open, not-yet-consumed index response.
#[derive(Debug)]
pub struct IndexSource {
    response: reqwest::Response,
}

impl IndexSource {
    /// GET the index URL. A non-success status before any byte is read is
    /// fatal for the whole pipeline.
    pub async fn open(client: &Client, url: &str) -> Result<Self> {
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| MrfScanError::Transport(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MrfScanError::Transport(format!("{url}: HTTP {status}")));
        }

        info!(url, content_length = ?response.content_length(), "index stream opened");
        Ok(Self { response })
    }

    /// Declared compressed size. An estimate only: the decompressed stream
    /// routinely exceeds it. Use for progress display, never correctness.
    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    /// Split into a blocking [`ByteReader`] and the pump task feeding it.
    ///
    /// `bytes_read` is incremented with every compressed chunk received,
    /// for progress display from the consuming side. The channel holds at
    /// most `channel_cap` chunks, so a slow consumer backpressures the
    /// download itself.
    pub fn into_byte_reader(
        self,
        channel_cap: usize,
        bytes_read: Arc<AtomicU64>,
    ) -> (ByteReader, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel::<std::io::Result<Bytes>>(channel_cap);

        let pump = tokio::spawn(async move {
            let mut stream = self.response.bytes_stream();
            while let Some(item) = stream.next().await {
                let item = match item {
                    Ok(chunk) => {
                        bytes_read.fetch_add(chunk.len() as u64, Ordering::Relaxed);
                        Ok(chunk)
                    }
                    Err(e) => Err(std::io::Error::other(format!("index stream: {e}"))),
                };
                let failed = item.is_err();
                if tx.send(item).await.is_err() {
                    debug!("byte reader dropped, stopping index download");
                    break;
                }
                if failed {
                    break;
                }
            }
        });

        (
            ByteReader {
                rx,
                current: Bytes::new(),
            },
            pump,
        )
    }
}

// ---------------------------------------------------------------------------
// ByteReader
// ---------------------------------------------------------------------------

/// Blocking `Read` over the channel of downloaded chunks.
///
/// Must only be used from a blocking context (`spawn_blocking`); it parks
/// the thread while waiting for the next chunk.
pub struct ByteReader {
    rx: mpsc::Receiver<std::io::Result<Bytes>>,
    current: Bytes,
}

impl Read for ByteReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        while self.current.is_empty() {
            match self.rx.blocking_recv() {
                Some(Ok(chunk)) => self.current = chunk,
                Some(Err(e)) => return Err(e),
                None => return Ok(0),
            }
        }

        let n = self.current.len().min(buf.len());
        buf[..n].copy_from_slice(&self.current[..n]);
        self.current.advance(n);
        Ok(n)
    }
}
