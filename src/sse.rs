use bytes::Bytes;
use serde_json::json;

/// Incremental splitter over the upstream byte stream. Each complete
/// non-empty line becomes one SSE frame: the line decoded as UTF-8 followed
/// by a blank line. Chunks may cut lines anywhere; partial lines are held
/// until the next push.
pub struct LineFramer {
    buf: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).take(pos).collect();
            if let Some(frame) = frame_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    pub fn finish(self) -> Option<Bytes> {
        frame_line(&self.buf)
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

fn frame_line(line: &[u8]) -> Option<Bytes> {
    let line = match line.last() {
        Some(b'\r') => &line[..line.len() - 1],
        _ => line,
    };
    if line.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(line);
    Some(Bytes::from(format!("{text}\n\n")))
}

/// Terminal event carried on mid-stream failure.
pub fn error_event(message: &str) -> Bytes {
    let payload = json!({"error": {"message": message, "type": "api_error"}});
    let mut data = Vec::with_capacity(message.len() + 48);
    data.extend_from_slice(b"data: ");
    data.extend_from_slice(payload.to_string().as_bytes());
    data.extend_from_slice(b"\n\n");
    Bytes::from(data)
}
