//! Newline-delimited record decoding
//!
//! Upstream bodies arrive as arbitrary byte chunks. [`FrameDecoder`] splits
//! them on `\n`, carrying any unterminated tail over to the next chunk, and
//! extracts one text field from each JSON record. Bytes are buffered as bytes,
//! so a record (or a multi-byte character) split at any offset decodes the
//! same as if it had arrived whole.

use bytes::BytesMut;
use parley_core::{Error, Fragment, Result};
use serde_json::Value;
use tracing::{debug, trace};

/// What to do with a line that is not a well-formed record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinePolicy {
    /// Skip the line and keep decoding. Upstreams occasionally emit
    /// keep-alive or diagnostic lines that are not JSON.
    #[default]
    Lenient,
    /// Fail the stream with [`Error::Decode`]
    Strict,
}

/// Result of parsing one complete line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Empty or whitespace-only line
    Blank,
    /// A well-formed record; the text may be empty
    Text(String),
    /// A well-formed record reporting an upstream failure
    UpstreamError(String),
    /// A malformed line, with the reason
    Skip(String),
}

/// Incremental decoder for newline-delimited JSON records
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: BytesMut,
    // Prefix of `buffer` already known to hold no terminator
    scanned: usize,
    text_field: String,
    policy: LinePolicy,
    skipped: usize,
    finished: bool,
}

impl FrameDecoder {
    /// Create a lenient decoder reading `text_field` from each record
    pub fn new(text_field: impl Into<String>) -> Self {
        Self {
            buffer: BytesMut::new(),
            scanned: 0,
            text_field: text_field.into(),
            policy: LinePolicy::default(),
            skipped: 0,
            finished: false,
        }
    }

    /// Set the malformed-line policy
    pub fn with_policy(mut self, policy: LinePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Number of malformed lines skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Bytes held back waiting for a line terminator
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Feed one chunk and return the fragments completed by it, in order
    pub fn decode(&mut self, chunk: &[u8]) -> Result<Vec<Fragment>> {
        let mut fragments = Vec::new();
        self.decode_into(chunk, &mut fragments)?;
        Ok(fragments)
    }

    /// Like [`decode`](Self::decode), appending to `out`
    ///
    /// Fragments decoded before a failing line are kept in `out`.
    pub fn decode_into<E: Extend<Fragment>>(&mut self, chunk: &[u8], out: &mut E) -> Result<()> {
        self.buffer.extend_from_slice(chunk);

        let mut decoded = 0;
        while let Some(offset) = self.buffer[self.scanned..]
            .iter()
            .position(|b| *b == b'\n')
        {
            let pos = self.scanned + offset;
            // Splitting off the front leaves the remainder in place
            let line = self.buffer.split_to(pos + 1);
            self.scanned = 0;
            if let Some(fragment) = self.decode_line(&line[..pos])? {
                out.extend(Some(fragment));
                decoded += 1;
            }
        }
        self.scanned = self.buffer.len();

        trace!(
            fragments = decoded,
            pending = self.buffer.len(),
            "Decoded chunk"
        );
        Ok(())
    }

    /// Flush the unterminated tail and emit the end-of-stream fragment
    ///
    /// Calling `finish` more than once yields nothing after the first call.
    pub fn finish(&mut self) -> Result<Vec<Fragment>> {
        if self.finished {
            return Ok(Vec::new());
        }
        self.finished = true;

        let mut fragments = Vec::with_capacity(2);
        let tail = self.buffer.split();
        self.scanned = 0;
        if let Some(fragment) = self.decode_line(&tail)? {
            fragments.push(fragment);
        }
        fragments.push(Fragment::end());
        Ok(fragments)
    }

    fn decode_line(&mut self, line: &[u8]) -> Result<Option<Fragment>> {
        match self.parse_line(line) {
            Decoded::Blank => Ok(None),
            Decoded::Text(text) if text.is_empty() => Ok(None),
            Decoded::Text(text) => Ok(Some(Fragment::text(text))),
            Decoded::UpstreamError(message) => Err(Error::UpstreamStream(message)),
            Decoded::Skip(reason) => match self.policy {
                LinePolicy::Lenient => {
                    self.skipped += 1;
                    debug!(%reason, skipped = self.skipped, "Skipping malformed line");
                    Ok(None)
                }
                LinePolicy::Strict => Err(Error::Decode(reason)),
            },
        }
    }

    /// Classify one complete line (without its terminator)
    pub fn parse_line(&self, line: &[u8]) -> Decoded {
        let line = match std::str::from_utf8(line) {
            Ok(line) => line.trim(),
            Err(e) => return Decoded::Skip(format!("invalid UTF-8: {}", e)),
        };
        if line.is_empty() {
            return Decoded::Blank;
        }

        let record: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => return Decoded::Skip(format!("not JSON: {}", e)),
        };
        let Some(record) = record.as_object() else {
            return Decoded::Skip("record is not an object".to_string());
        };

        if let Some(Value::String(message)) = record.get("error") {
            return Decoded::UpstreamError(message.clone());
        }

        match record.get(&self.text_field) {
            Some(Value::String(text)) => Decoded::Text(text.clone()),
            None | Some(Value::Null) => Decoded::Text(String::new()),
            Some(_) => Decoded::Skip(format!("field `{}` is not a string", self.text_field)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(fragments: &[Fragment]) -> Vec<&str> {
        fragments.iter().map(|f| f.text.as_str()).collect()
    }

    fn decode_all(decoder: &mut FrameDecoder, chunks: &[&[u8]]) -> Vec<Fragment> {
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend(decoder.decode(chunk).unwrap());
        }
        out.extend(decoder.finish().unwrap());
        out
    }

    #[test]
    fn test_decodes_records_in_order() {
        let mut decoder = FrameDecoder::new("t");
        let out = decode_all(&mut decoder, &[b"{\"t\":\"He\"}\n{\"t\":\"llo\"}\n"]);

        assert_eq!(texts(&out), vec!["He", "llo", ""]);
        assert!(out.last().unwrap().is_final);
        assert!(out[..2].iter().all(|f| !f.is_final));
    }

    #[test]
    fn test_split_record_matches_whole_record_at_every_offset() {
        let body = "{\"response\":\"héllo wörld\"}\n{\"response\":\"!\"}\n".as_bytes();
        let whole = decode_all(&mut FrameDecoder::new("response"), &[body]);

        for offset in 0..=body.len() {
            let (a, b) = body.split_at(offset);
            let split = decode_all(&mut FrameDecoder::new("response"), &[a, b]);
            assert_eq!(split, whole, "split at byte {}", offset);
        }
    }

    #[test]
    fn test_unterminated_tail_is_buffered() {
        let mut decoder = FrameDecoder::new("t");
        assert!(decoder.decode(b"{\"t\":\"a\"}\n{\"t\":").unwrap().len() == 1);
        assert_eq!(decoder.pending_bytes(), 5);

        let out = decoder.decode(b"\"b\"}\n").unwrap();
        assert_eq!(texts(&out), vec!["b"]);
        assert_eq!(decoder.pending_bytes(), 0);
    }

    #[test]
    fn test_final_line_without_terminator_is_flushed() {
        let mut decoder = FrameDecoder::new("t");
        let out = decode_all(&mut decoder, &[b"{\"t\":\"a\"}\n{\"t\":\"b\"}"]);
        assert_eq!(texts(&out), vec!["a", "b", ""]);
    }

    #[test]
    fn test_malformed_line_is_skipped_leniently() {
        let mut decoder = FrameDecoder::new("t");
        let out = decode_all(
            &mut decoder,
            &[b"{\"t\":\"one\"}\nkeep-alive\n{\"t\":\"two\"}\n"],
        );

        assert_eq!(texts(&out), vec!["one", "two", ""]);
        assert_eq!(decoder.skipped(), 1);
    }

    #[test]
    fn test_malformed_line_fails_strictly() {
        let mut decoder = FrameDecoder::new("t").with_policy(LinePolicy::Strict);
        let err = decoder.decode(b"{\"t\":\"one\"}\nnope\n").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_blank_and_empty_text_lines_yield_nothing() {
        let mut decoder = FrameDecoder::new("response");
        let out = decode_all(
            &mut decoder,
            &[b"\r\n  \n{\"response\":\"\",\"done\":true}\n{\"done\":true}\n"],
        );
        assert_eq!(out, vec![Fragment::end()]);
        assert_eq!(decoder.skipped(), 0);
    }

    #[test]
    fn test_parse_line_classification() {
        let decoder = FrameDecoder::new("t");
        assert_eq!(decoder.parse_line(b"   "), Decoded::Blank);
        assert_eq!(decoder.parse_line(b"{\"t\":\"x\"}"), Decoded::Text("x".into()));
        assert_eq!(
            decoder.parse_line(b"{\"error\":\"model unloaded\"}"),
            Decoded::UpstreamError("model unloaded".into())
        );
        assert!(matches!(decoder.parse_line(b"[1,2]"), Decoded::Skip(_)));
        assert!(matches!(decoder.parse_line(b"{\"t\":42}"), Decoded::Skip(_)));
        assert!(matches!(decoder.parse_line(&[0xff, 0xfe]), Decoded::Skip(_)));
    }

    #[test]
    fn test_in_band_error_fails_the_stream() {
        let mut decoder = FrameDecoder::new("t");
        let err = decoder
            .decode(b"{\"t\":\"a\"}\n{\"error\":\"out of memory\"}\n")
            .unwrap_err();
        assert_eq!(err, Error::UpstreamStream("out of memory".into()));
    }

    #[test]
    fn test_decode_into_keeps_fragments_before_failing_line() {
        let mut decoder = FrameDecoder::new("t");
        let mut out = Vec::new();
        let err = decoder
            .decode_into(b"{\"t\":\"a\"}\n{\"error\":\"out of memory\"}\n", &mut out)
            .unwrap_err();

        assert_eq!(err, Error::UpstreamStream("out of memory".into()));
        assert_eq!(out, vec![Fragment::text("a")]);
    }

    #[test]
    fn test_large_single_chunk() {
        let lines = 80_000;
        let mut body = String::new();
        for i in 0..lines {
            body.push_str(&format!("{{\"t\":\"{:08}\"}}\n", i));
        }
        assert!(body.len() > 1_000_000);

        let mut decoder = FrameDecoder::new("t");
        let out = decoder.decode(body.as_bytes()).unwrap();

        assert_eq!(out.len(), lines);
        assert_eq!(out[0].text, "00000000");
        assert_eq!(out[lines - 1].text, format!("{:08}", lines - 1));
        assert_eq!(decoder.pending_bytes(), 0);
    }

    #[test]
    fn test_long_line_across_many_chunks() {
        let text = "x".repeat(200_000);
        let record = format!("{{\"t\":\"{}\"}}\n{{\"t\":\"y\"}}", text);

        let mut decoder = FrameDecoder::new("t");
        let mut out = Vec::new();
        for chunk in record.as_bytes().chunks(7) {
            out.extend(decoder.decode(chunk).unwrap());
        }
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text.len(), text.len());
        assert_eq!(decoder.pending_bytes(), "{\"t\":\"y\"}".len());

        out.extend(decoder.finish().unwrap());
        assert_eq!(texts(&out[1..]), vec!["y", ""]);
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut decoder = FrameDecoder::new("t");
        assert_eq!(decoder.finish().unwrap(), vec![Fragment::end()]);
        assert!(decoder.finish().unwrap().is_empty());
    }
}
