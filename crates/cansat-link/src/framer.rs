use bytes::{Bytes, BytesMut};

use crate::error::FrameError;

/// Reassembles newline-delimited records from chunks that arrive at arbitrary
/// boundaries. Bytes after the last `\n` stay buffered until a later chunk
/// completes them. The buffer is unbounded: a peer that never sends `\n`
/// grows it without limit.
pub struct LineFramer {
    buf: BytesMut,
}

impl LineFramer {
    pub fn new() -> Self {
        Self { buf: BytesMut::with_capacity(1024) }
    }

    /// Append `chunk` and hand out every line completed by it.
    ///
    /// The returned iterator owns the completed bytes, so the framer can be
    /// fed again while it is still being drained.
    pub fn feed(&mut self, chunk: &[u8]) -> Lines {
        self.buf.extend_from_slice(chunk);
        let complete = match self.buf.iter().rposition(|&b| b == b'\n') {
            Some(i) => self.buf.split_to(i + 1).freeze(),
            None => Bytes::new(),
        };
        Lines { rest: complete }
    }

    /// Drop any partial line. Called on every session boundary.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Bytes waiting for their terminator.
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

/// Complete lines from one `feed` call, terminator (and a preceding `\r`)
/// stripped. Blank lines are skipped. Each line is decoded on its own so a
/// bad one does not take its neighbours down with it.
pub struct Lines {
    rest: Bytes,
}

impl Iterator for Lines {
    type Item = Result<String, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.rest.is_empty() {
            let end = self
                .rest
                .iter()
                .position(|&b| b == b'\n')
                .map(|i| i + 1)
                .unwrap_or(self.rest.len());
            let raw = self.rest.split_to(end);

            let mut body = &raw[..];
            if let Some(b) = body.strip_suffix(b"\n") {
                body = b;
            }
            if let Some(b) = body.strip_suffix(b"\r") {
                body = b;
            }

            match std::str::from_utf8(body) {
                Ok(s) if s.trim().is_empty() => continue,
                Ok(s) => return Some(Ok(s.to_owned())),
                Err(source) => return Some(Err(FrameError::Encoding { len: raw.len(), source })),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ok_lines(lines: Lines) -> Vec<String> {
        lines.map(|l| l.unwrap()).collect()
    }

    #[test]
    fn splits_on_newline() {
        let mut framer = LineFramer::new();
        let lines = ok_lines(framer.feed(b"{\"yaw\":1}\n{\"yaw\":2}\n"));
        assert_eq!(lines, vec!["{\"yaw\":1}", "{\"yaw\":2}"]);
        assert!(framer.buffered().is_empty());
    }

    #[test]
    fn partial_line_waits_for_terminator() {
        let mut framer = LineFramer::new();
        assert!(ok_lines(framer.feed(b"{\"temp")).is_empty());
        assert_eq!(framer.buffered(), b"{\"temp");
        assert!(ok_lines(framer.feed(b"erature\":")).is_empty());
        assert_eq!(framer.buffered(), b"{\"temperature\":");
        let lines = ok_lines(framer.feed(b"20}\n{\"pre"));
        assert_eq!(lines, vec!["{\"temperature\":20}"]);
        assert_eq!(framer.buffered(), b"{\"pre");
    }

    #[test]
    fn strips_crlf_and_skips_blank_lines() {
        let mut framer = LineFramer::new();
        let lines = ok_lines(framer.feed(b"a\r\n\r\n   \nb\n\n"));
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn invalid_utf8_drops_only_that_line() {
        let mut framer = LineFramer::new();
        let out: Vec<_> = framer.feed(b"good\n\xff\xfe\nalso good\n").collect();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].as_ref().unwrap(), "good");
        assert!(matches!(out[1], Err(FrameError::Encoding { len: 3, .. })));
        assert_eq!(out[2].as_ref().unwrap(), "also good");
    }

    #[test]
    fn multibyte_char_split_across_chunks() {
        let mut framer = LineFramer::new();
        let text = "{\"location\":\"Karachi 24.8°N\"}\n".as_bytes();
        let cut = text.iter().position(|&b| b == 0xC2).unwrap() + 1;
        assert!(ok_lines(framer.feed(&text[..cut])).is_empty());
        let lines = ok_lines(framer.feed(&text[cut..]));
        assert_eq!(lines, vec!["{\"location\":\"Karachi 24.8°N\"}"]);
    }

    #[test]
    fn reset_discards_partial_line() {
        let mut framer = LineFramer::new();
        let _ = ok_lines(framer.feed(b"{\"yaw\":"));
        framer.reset();
        assert!(framer.buffered().is_empty());
        let lines = ok_lines(framer.feed(b"{\"roll\":3}\n"));
        assert_eq!(lines, vec!["{\"roll\":3}"]);
    }

    proptest! {
        #[test]
        fn prop_chunking_does_not_change_lines(
            lines in prop::collection::vec("[a-z0-9{}:\",.é°][a-z0-9{}:\",. é°]{0,24}", 0..12),
            cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..10),
        ) {
            let mut stream = Vec::new();
            for l in &lines {
                stream.extend_from_slice(l.as_bytes());
                stream.push(b'\n');
            }

            let mut points: Vec<usize> = cuts.iter().map(|i| i.index(stream.len() + 1)).collect();
            points.push(0);
            points.push(stream.len());
            points.sort_unstable();
            points.dedup();

            let mut framer = LineFramer::new();
            let mut got = Vec::new();
            for w in points.windows(2) {
                for line in framer.feed(&stream[w[0]..w[1]]) {
                    got.push(line.unwrap());
                }
            }

            prop_assert_eq!(got, lines);
            prop_assert!(framer.buffered().is_empty());
        }
    }
}
