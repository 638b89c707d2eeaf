//! Reassembly of messages split across, or packed into, socket reads.
//!
//! [`decode`](super::codec::decode) looks at one buffer and never remembers
//! anything.  `FrameBuffer` is the small stateful wrapper a connection uses on
//! top of it: bytes are appended as they arrive and complete messages are
//! pulled off the front one at a time.

use crate::protocol::codec::{decode, ProtocolError};
use crate::protocol::reading::GamepadReading;

/// Accumulates received bytes and yields complete readings in arrival order.
///
/// Once every complete message has been taken, at most one partial message
/// (`HEADER_SIZE + MAX_BODY_SIZE` bytes) remains buffered.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pending: Vec<u8>,
}

impl FrameBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends freshly received bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Takes the next complete message off the front of the buffer.
    ///
    /// Returns `None` when the buffer is empty or holds only the beginning of
    /// a message; those bytes stay until more data arrives.  A malformed
    /// message discards everything buffered, since there is no way to find
    /// the start of the next message inside garbage.
    pub fn next_reading(&mut self) -> Option<Result<GamepadReading, ProtocolError>> {
        if self.pending.is_empty() {
            return None;
        }
        match decode(&self.pending) {
            Ok((reading, consumed)) => {
                self.pending.drain(..consumed);
                Some(Ok(reading))
            }
            Err(ProtocolError::IncompleteData { .. }) => None,
            Err(e) => {
                tracing::debug!(discarded = self.pending.len(), error = %e, "dropping malformed bytes");
                self.pending.clear();
                Some(Err(e))
            }
        }
    }

    /// Number of bytes waiting for the rest of their message.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drops any partial message.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
