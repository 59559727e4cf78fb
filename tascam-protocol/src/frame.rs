//! Frame codec
//!
//! Every frame on the wire is `LF <machine id> <code> <data> CR`:
//!
//! ```text
//! 0x0A '0' 'D' '0' '1' '1' 0x0D   -> code "D0", data "11"
//! ```
//!
//! Outgoing frames are built with [`encode`]. Incoming bytes are accumulated in
//! a [`FrameBuffer`] and split on CR; each call to [`extract`] yields at most
//! one frame, so readers loop until no terminator is left.

use tracing::{debug, warn};

/// Frame start marker
pub const LF: u8 = 0x0A;

/// Frame terminator
pub const CR: u8 = 0x0D;

/// Machine ID for single-device setups
pub const MACHINE_ID: char = '0';

/// Default cap on bytes held while waiting for a terminator
pub const DEFAULT_MAX_PENDING: usize = 256;

/// A complete frame received from the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub machine_id: char,
    pub code: String,
    pub data: String,
}

impl Frame {
    pub fn new(code: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            machine_id: MACHINE_ID,
            code: code.into(),
            data: data.into(),
        }
    }
}

/// Build the bytes of an outgoing frame
pub fn encode(code: &str, data: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(code.len() + data.len() + 3);
    bytes.push(LF);
    bytes.push(MACHINE_ID as u8);
    bytes.extend_from_slice(code.as_bytes());
    bytes.extend_from_slice(data.as_bytes());
    bytes.push(CR);
    bytes
}

/// Split the first CR-terminated candidate off `buffer`
///
/// Returns the decoded frame (if the candidate is well formed) and the bytes
/// after the terminator. Without a terminator the buffer is returned untouched.
/// A malformed candidate is dropped: the result is `(None, remainder)`.
pub fn extract(buffer: &[u8]) -> (Option<Frame>, &[u8]) {
    let Some(cr_idx) = buffer.iter().position(|&b| b == CR) else {
        return (None, buffer);
    };

    let candidate = &buffer[..cr_idx];
    let remainder = &buffer[cr_idx + 1..];

    (parse_candidate(candidate), remainder)
}

fn parse_candidate(candidate: &[u8]) -> Option<Frame> {
    let (&first, body) = candidate.split_first()?;
    if first != LF || body.len() < 3 || !body.is_ascii() {
        return None;
    }

    // ASCII was checked above, so byte offsets are char offsets.
    let text = std::str::from_utf8(body).ok()?;
    let machine_id = text.chars().next()?;

    Some(Frame {
        machine_id,
        code: text[1..3].to_string(),
        data: text[3..].to_string(),
    })
}

/// Accumulates bytes from the transport and hands out complete frames
#[derive(Debug)]
pub struct FrameBuffer {
    pending: Vec<u8>,
    max_pending: usize,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_PENDING)
    }

    /// Create a buffer that discards its contents once more than
    /// `max_pending` bytes have arrived without a terminator
    pub fn with_limit(max_pending: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_pending,
        }
    }

    /// Append freshly read bytes
    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);

        if self.pending.len() > self.max_pending && !self.pending.contains(&CR) {
            warn!(
                "Discarding {} buffered bytes with no frame terminator",
                self.pending.len()
            );
            self.pending.clear();
        }
    }

    /// Take the next well-formed frame, skipping malformed candidates
    ///
    /// Returns `None` once no terminator remains in the buffer.
    pub fn next_frame(&mut self) -> Option<Frame> {
        while self.pending.contains(&CR) {
            let (frame, consumed) = {
                let (frame, remainder) = extract(&self.pending);
                (frame, self.pending.len() - remainder.len())
            };
            let candidate = self.pending.drain(..consumed);

            match frame {
                Some(frame) => return Some(frame),
                None => debug!("Discarding malformed frame: {:?}", candidate.as_slice()),
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
