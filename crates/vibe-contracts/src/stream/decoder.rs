/// A complete `event:` + `data:` pair read off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub event: String,
    pub data: String,
}

/// Incremental line decoder for `event:` / `data:` framed bodies.
///
/// Bytes are buffered until a `\n` is seen, so both lines and multi-byte
/// UTF-8 sequences may be split across reads. A frame is emitted for every
/// `data:` line and carries the most recent `event:` type, which is then
/// reset. Any other line (comments, `id:`, blank separators) is ignored.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: Vec<u8>,
    current_event: String,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.pending.extend_from_slice(chunk);
        let Some(last_newline) = self.pending.iter().rposition(|byte| *byte == b'\n') else {
            return Vec::new();
        };
        let tail = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, tail);

        let mut frames = Vec::new();
        for raw_line in complete.split(|byte| *byte == b'\n') {
            if let Some(frame) = self.take_line(raw_line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flushes a trailing line that was never newline-terminated.
    pub fn finish(&mut self) -> Vec<Frame> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        let rest = std::mem::take(&mut self.pending);
        self.take_line(&rest).into_iter().collect()
    }

    pub fn buffered_len(&self) -> usize {
        self.pending.len()
    }

    fn take_line(&mut self, raw_line: &[u8]) -> Option<Frame> {
        let raw_line = raw_line.strip_suffix(b"\r").unwrap_or(raw_line);
        if raw_line.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(raw_line);
        if let Some(event) = line.strip_prefix("event:") {
            self.current_event = event.trim().to_string();
            return None;
        }
        if let Some(data) = line.strip_prefix("data:") {
            let event = std::mem::take(&mut self.current_event);
            return Some(Frame {
                event,
                data: data.trim().to_string(),
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{Frame, FrameDecoder};

    const BODY: &str = "event: token\ndata: {\"text\":\"路况\"}\n\nevent:tool_start\ndata: {\"toolName\":\"setLight\",\"input\":{}}\n\n: keep-alive\nevent: complete\ndata: {\"plan\":null,\"processingTimeMs\":5}\n\n";

    fn decode_in_pieces(body: &[u8], sizes: &[usize]) -> Vec<Frame> {
        let mut decoder = FrameDecoder::new();
        let mut frames = Vec::new();
        let mut offset = 0;
        let mut idx = 0;
        while offset < body.len() {
            let size = sizes[idx % sizes.len()].max(1);
            let end = (offset + size).min(body.len());
            frames.extend(decoder.push(&body[offset..end]));
            offset = end;
            idx += 1;
        }
        frames.extend(decoder.finish());
        frames
    }

    #[test]
    fn single_chunk_yields_three_frames() {
        let frames = decode_in_pieces(BODY.as_bytes(), &[BODY.len()]);
        let events: Vec<&str> = frames.iter().map(|frame| frame.event.as_str()).collect();
        assert_eq!(events, vec!["token", "tool_start", "complete"]);
        assert_eq!(frames[0].data, "{\"text\":\"路况\"}");
    }

    #[test]
    fn arbitrary_chunking_matches_single_chunk() {
        let whole = decode_in_pieces(BODY.as_bytes(), &[BODY.len()]);
        for sizes in [
            vec![1],
            vec![2],
            vec![3, 7],
            vec![5, 1, 11],
            vec![13],
            vec![64, 1],
        ] {
            assert_eq!(decode_in_pieces(BODY.as_bytes(), &sizes), whole, "sizes {sizes:?}");
        }
    }

    #[test]
    fn event_type_resets_after_data_line() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"event: token\ndata: {}\ndata: {}\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].event, "token");
        assert_eq!(frames[1].event, "");
    }

    #[test]
    fn partial_line_is_retained_until_newline() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"event: tok").is_empty());
        assert!(decoder.push(b"en\nda").is_empty());
        assert_eq!(decoder.buffered_len(), 2);
        let frames = decoder.push(b"ta: {\"text\":\"a\"}\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "token");
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"event: error\r\ndata: {\"code\":\"X\"}\r\n\r\n");
        assert_eq!(
            frames,
            vec![Frame {
                event: "error".to_string(),
                data: "{\"code\":\"X\"}".to_string(),
            }]
        );
    }

    #[test]
    fn finish_flushes_unterminated_data_line() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"event: token\ndata: {}").is_empty());
        let frames = decoder.finish();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "token");
    }
}
