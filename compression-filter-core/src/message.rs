//! Call messages.
//!
//! A [`Message`] is one item of a call's message stream: a payload plus a
//! flags word. The payload is swapped in place when it is compressed or
//! decompressed, and the flags record which encoding it currently holds.

use bytes::Bytes;

/// Message flags.
pub mod message_flags {
    /// The application asked for this message not to be compressed.
    pub const NO_COMPRESS: u32 = 0x0000_0002;
    /// The payload currently holds compressed bytes.
    pub const INTERNAL_COMPRESS: u32 = 0x8000_0000;
    /// Set after a compressed payload was decompressed. Tests only.
    pub const TEST_ONLY_WAS_COMPRESSED: u32 = 0x4000_0000;
}

/// A single call message.
///
/// While [`message_flags::INTERNAL_COMPRESS`] is set the payload is not
/// plaintext.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    payload: Bytes,
    flags: u32,
}

impl Message {
    /// Create a message with `payload` and `flags`.
    pub fn new(payload: impl Into<Bytes>, flags: u32) -> Self {
        Self {
            payload: payload.into(),
            flags,
        }
    }

    /// The current payload.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Replace the payload, returning the old one.
    pub fn swap_payload(&mut self, payload: Bytes) -> Bytes {
        std::mem::replace(&mut self.payload, payload)
    }

    pub fn set_payload(&mut self, payload: Bytes) {
        self.payload = payload;
    }

    /// Payload length in bytes (the wire size for incoming messages).
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn flags_mut(&mut self) -> &mut u32 {
        &mut self.flags
    }

    /// Returns true if any bit of `mask` is set.
    pub fn has_flag(&self, mask: u32) -> bool {
        self.flags & mask != 0
    }

    /// Returns true if the payload currently holds compressed bytes.
    pub fn is_compressed(&self) -> bool {
        self.has_flag(message_flags::INTERNAL_COMPRESS)
    }

    /// Consume the message, returning its payload.
    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}
