//! Line reassembly across decompressed chunk boundaries.

use crate::record::RECORD_MARKER;

/// Reassembles complete newline-terminated lines from a sequence of byte
/// chunks, regardless of where the chunk boundaries fall.
///
/// The suffix of the latest chunk that does not yet end in a terminator is
/// held as the pending tail and prepended to the next chunk. The tail
/// never contains a full terminated line and is bounded by the length of
/// one source line, so a single line longer than any chunk is handled.
#[derive(Debug, Default)]
pub struct LineFramer {
    tail: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk, yielding every line completed by it, in order.
    ///
    /// Framing is chunking-invariant: for any partition of the logical
    /// byte stream into chunks, the concatenation of all `push` results
    /// equals splitting the whole stream on `\n`.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.tail.extend_from_slice(chunk);

        let Some(last_nl) = self.tail.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        // Everything past the last terminator becomes the new tail.
        let rest = self.tail.split_off(last_nl + 1);
        let complete = std::mem::replace(&mut self.tail, rest);

        complete[..last_nl]
            .split(|&b| b == b'\n')
            .map(|line| {
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                String::from_utf8_lossy(line).into_owned()
            })
            .collect()
    }

    /// End of stream. A non-empty remaining tail is forwarded only when it
    /// is a meaningful record line; framing noise (the enclosing array's
    /// unterminated trailer) is dropped silently.
    pub fn finish(self) -> Option<String> {
        if self.tail.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.tail).into_owned();
        line.starts_with(RECORD_MARKER).then_some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference framing: split the whole stream on the terminator.
    fn frame_whole(stream: &[u8]) -> Vec<String> {
        let mut framer = LineFramer::new();
        framer.push(stream)
    }

    /// Stream framing over an explicit chunking.
    fn frame_chunked(stream: &[u8], chunk_size: usize) -> Vec<String> {
        let mut framer = LineFramer::new();
        let mut lines = Vec::new();
        for chunk in stream.chunks(chunk_size) {
            lines.extend(framer.push(chunk));
        }
        lines
    }

    #[test]
    fn framing_is_chunking_invariant() {
        let stream = b"alpha\nbeta\n{\"reporting_plans\": 1},\ngamma delta epsilon\nzeta\n";
        let expected = frame_whole(stream);
        assert_eq!(expected.len(), 5);

        for chunk_size in 1..=stream.len() {
            assert_eq!(
                frame_chunked(stream, chunk_size),
                expected,
                "chunk_size {chunk_size}"
            );
        }
    }

    #[test]
    fn terminator_at_chunk_start() {
        // The terminator of the first record falls at the start of the
        // second chunk; the record must come out as one line, not two.
        let mut framer = LineFramer::new();
        assert!(framer.push(b"one record").is_empty());
        let lines = framer.push(b"\nnext");
        assert_eq!(lines, vec!["one record".to_string()]);
    }

    #[test]
    fn line_longer_than_many_chunks() {
        let long = "x".repeat(10_000);
        let stream = format!("{long}\nshort\n");
        let lines = frame_chunked(stream.as_bytes(), 64);
        assert_eq!(lines, vec![long, "short".to_string()]);
    }

    #[test]
    fn chunk_without_terminator_yields_nothing() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"no newline here").is_empty());
        assert!(framer.push(b" still none").is_empty());
        let lines = framer.push(b" end\n");
        assert_eq!(lines, vec!["no newline here still none end".to_string()]);
    }

    #[test]
    fn crlf_terminators_are_stripped() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"a\r\nb\n");
        assert_eq!(lines, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn finish_drops_non_record_trailer() {
        let mut framer = LineFramer::new();
        framer.push(b"{\"reporting_plans\": []},\n");
        assert!(framer.push(b"}").is_empty());
        assert!(framer.finish().is_none());
    }

    #[test]
    fn finish_keeps_unterminated_record_line() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"{\"reporting_plans\": []}").is_empty());
        assert_eq!(
            framer.finish().as_deref(),
            Some("{\"reporting_plans\": []}")
        );
    }

    #[test]
    fn empty_stream() {
        let framer = LineFramer::new();
        assert!(framer.finish().is_none());
    }
}
