//! Streaming gzip decompression in bounded chunks.

use std::io::Read;

use flate2::read::MultiGzDecoder;

use mrfscan_shared::{MrfScanError, Result};

/// Wraps a compressed byte source and yields decompressed chunks of at
/// most `chunk_size` bytes, lazily, until the source is exhausted.
///
/// The sequence is finite and non-restartable. A corrupt or truncated
/// stream is fatal: no partial completion is attempted past the error.
pub struct ChunkedDecompressor<R: Read> {
    decoder: MultiGzDecoder<R>,
    chunk_size: usize,
}

impl<R: Read> ChunkedDecompressor<R> {
    pub fn new(source: R, chunk_size: usize) -> Self {
        debug_assert!(chunk_size > 0);
        Self {
            decoder: MultiGzDecoder::new(source),
            chunk_size,
        }
    }

    /// Next decompressed chunk: `Ok(Some(_))` with 1..=chunk_size bytes,
    /// `Ok(None)` at clean end of stream.
    pub fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;

        while filled < self.chunk_size {
            match self.decoder.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) => {
                    return Err(MrfScanError::Decompress(format!(
                        "gzip stream failed after {filled} bytes of current chunk: {e}"
                    )));
                }
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);
        Ok(Some(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::{Cursor, Write};

    fn gzip(content: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content).unwrap();
        encoder.finish().unwrap()
    }

    fn drain<R: Read>(dec: &mut ChunkedDecompressor<R>) -> Vec<Vec<u8>> {
        let mut chunks = Vec::new();
        while let Some(chunk) = dec.next_chunk().unwrap() {
            chunks.push(chunk);
        }
        chunks
    }

    #[test]
    fn roundtrip_in_bounded_chunks() {
        let original: Vec<u8> = (0..10_000u32).map(|i| (i % 253) as u8).collect();
        let compressed = gzip(&original);

        let mut dec = ChunkedDecompressor::new(Cursor::new(compressed), 1024);
        let chunks = drain(&mut dec);

        assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= 1024));
        let joined: Vec<u8> = chunks.concat();
        assert_eq!(joined, original);
    }

    #[test]
    fn chunk_size_larger_than_stream() {
        let compressed = gzip(b"short stream");
        let mut dec = ChunkedDecompressor::new(Cursor::new(compressed), 1 << 20);

        assert_eq!(dec.next_chunk().unwrap().as_deref(), Some(&b"short stream"[..]));
        assert!(dec.next_chunk().unwrap().is_none());
    }

    #[test]
    fn empty_stream_yields_no_chunks() {
        let compressed = gzip(b"");
        let mut dec = ChunkedDecompressor::new(Cursor::new(compressed), 1024);
        assert!(dec.next_chunk().unwrap().is_none());
    }

    #[test]
    fn truncated_stream_is_fatal() {
        let mut compressed = gzip(&vec![7u8; 50_000]);
        compressed.truncate(compressed.len() / 2);

        let mut dec = ChunkedDecompressor::new(Cursor::new(compressed), 1024);
        let result = loop {
            match dec.next_chunk() {
                Ok(Some(_)) => continue,
                other => break other,
            }
        };

        assert!(matches!(result, Err(MrfScanError::Decompress(_))));
    }

    #[test]
    fn garbage_input_is_fatal() {
        let mut dec = ChunkedDecompressor::new(Cursor::new(b"not gzip data".to_vec()), 1024);
        assert!(matches!(
            dec.next_chunk(),
            Err(MrfScanError::Decompress(_))
        ));
    }
}
