//! Server-sent-event frame decoder.
//!
//! Turns an unbounded sequence of byte chunks into text deltas. A single
//! logical line may span multiple network reads, and a single read may
//! carry several complete lines plus a partial trailing one, so the decoder
//! keeps a carry-over buffer across chunk boundaries.
//!
//! Only `data:`-prefixed lines are meaningful here; other SSE fields
//! (comments, event types) are ignored. The `[DONE]` sentinel is a no-op
//! continuation signal; stream completion is driven by transport
//! end-of-stream, not by the sentinel. A malformed frame is logged and
//! skipped rather than aborting the whole stream.

use serde::Deserialize;

/// Prefix marking a data line in an SSE stream.
const DATA_PREFIX: &str = "data: ";

/// Sentinel some providers emit before closing the stream.
const DONE_SENTINEL: &str = "[DONE]";

/// Payload shape carrying incremental text.
#[derive(Debug, Deserialize)]
struct SseFrame {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    delta: Option<DeltaBody>,
}

/// Inner delta body of a `content_block_delta` frame.
#[derive(Debug, Deserialize)]
struct DeltaBody {
    #[serde(default)]
    text: Option<String>,
}

/// Incremental SSE decoder with a carry-over buffer.
///
/// Feed raw byte chunks in arrival order; complete `data:` lines are parsed
/// as JSON and their text deltas returned in the same order. A trailing
/// partial line at true stream end is dropped, never flushed: a
/// well-behaved upstream terminates its last frame with a newline, so this
/// only loses data on abnormal disconnects.
#[derive(Debug, Default)]
pub struct SseDecoder {
    carry: Vec<u8>,
}

impl SseDecoder {
    /// Create a decoder with an empty carry-over buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one byte chunk and return the text deltas of every complete
    /// frame it finishes, in arrival order. Empty chunks are legal and
    /// produce no output.
    ///
    /// The carry-over is kept as raw bytes so a multi-byte character split
    /// across reads decodes correctly once its line completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.carry.extend_from_slice(chunk);

        let mut deltas = Vec::new();
        while let Some(pos) = self.carry.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.carry.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            if let Some(text) = Self::decode_line(line.trim_end_matches('\r')) {
                deltas.push(text);
            }
        }
        deltas
    }

    /// Decode one complete line, returning its text delta if it carries one.
    fn decode_line(line: &str) -> Option<String> {
        let payload = line.strip_prefix(DATA_PREFIX)?;

        if payload == DONE_SENTINEL {
            return None;
        }

        match serde_json::from_str::<SseFrame>(payload) {
            Ok(frame) if frame.kind == "content_block_delta" => frame.delta.and_then(|d| d.text),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("skipping malformed SSE frame: {e}");
                None
            }
        }
    }
}
