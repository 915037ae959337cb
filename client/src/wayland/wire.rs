//! Implementation of the Wayland Wire Protocol
//!
//! Every message starts with a header of two 32 bit words. The first is the object the message is
//! addressed to (or, for events, the object that sent it). The second holds the opcode in its lower
//! half and the message size, header included, in its upper half. Arguments follow the header,
//! each one padded to 4 bytes. Everything is little endian.
//!
//! We only ever have one outbound message in flight, so the writing side is a single fixed-size
//! buffer that gets cleared before every request. The reading side is a cursor over bytes we have
//! already received.

use std::error::Error;
use std::fmt;

/// Size of the two header words
pub const HEADER_LEN: usize = 8;

/// Largest message libwayland will send or accept
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Violations of the wire format contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    /// A write did not fit in what is left of the buffer
    Overflow { needed: usize, remaining: usize },
    /// A value was written or read at an offset that is not a multiple of its size
    Misaligned { offset: usize, align: usize },
    /// A read asked for more bytes than the message has left
    Truncated { needed: usize, remaining: usize },
    /// The size in the header does not match what was written
    SizeMismatch { announced: usize, written: usize },
    /// A string argument was not valid utf8
    InvalidString,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow { needed, remaining } => write!(
                f,
                "message overflow: needed {needed} bytes, but only {remaining} are left"
            ),
            Self::Misaligned { offset, align } => {
                write!(f, "offset {offset} is not aligned to {align} bytes")
            }
            Self::Truncated { needed, remaining } => write!(
                f,
                "truncated message: needed {needed} bytes, but only {remaining} are left"
            ),
            Self::SizeMismatch { announced, written } => write!(
                f,
                "message announced {announced} bytes, but {written} were written"
            ),
            Self::InvalidString => f.write_str("string argument is not valid utf8"),
        }
    }
}

impl Error for WireError {}

/// Rounds `n` up to the next multiple of 4
#[must_use]
pub const fn roundup_4(n: usize) -> usize {
    (n + 3) & !3
}

/// Size on the wire of a string or array argument whose length field is `len`
#[must_use]
pub const fn padded_len(len: usize) -> usize {
    4 + roundup_4(len)
}

/// Size on the wire of `s`, once we add its null terminator
#[must_use]
pub const fn str_len(s: &str) -> usize {
    padded_len(s.len() + 1)
}

/// The two header words of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub object_id: u32,
    pub opcode: u16,
    pub size: u16,
}

impl Header {
    pub fn read(reader: &mut Reader) -> Result<Self, WireError> {
        let object_id = reader.read_u32()?;
        let opcode = reader.read_u16()?;
        let size = reader.read_u16()?;
        Ok(Self {
            object_id,
            opcode,
            size,
        })
    }

    pub fn write(&self, buf: &mut MessageBuffer) -> Result<(), WireError> {
        buf.write_u32(self.object_id)?;
        buf.write_u16(self.opcode)?;
        buf.write_u16(self.size)
    }
}

/// Scratch space where outbound messages are assembled
#[derive(Debug)]
pub struct MessageBuffer {
    buf: Box<[u8]>,
    pos: usize,
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::with_capacity(MAX_MESSAGE_LEN)
    }
}

impl MessageBuffer {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity].into_boxed_slice(),
            pos: 0,
        }
    }

    /// Zeroes whatever was written and rewinds to the start
    pub fn clear(&mut self) {
        self.buf[..self.pos].fill(0);
        self.pos = 0;
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    /// Hands out the next `len` bytes, making sure they fit and start at a multiple of `align`
    fn claim(&mut self, len: usize, align: usize) -> Result<&mut [u8], WireError> {
        if self.pos % align != 0 {
            return Err(WireError::Misaligned {
                offset: self.pos,
                align,
            });
        }
        let remaining = self.buf.len() - self.pos;
        if len > remaining {
            return Err(WireError::Overflow {
                needed: len,
                remaining,
            });
        }
        let start = self.pos;
        self.pos += len;
        Ok(&mut self.buf[start..self.pos])
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), WireError> {
        self.claim(4, 4)?.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<(), WireError> {
        self.claim(4, 4)?.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<(), WireError> {
        self.claim(2, 2)?.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Writes a length prefixed string whose bytes already include the null terminator
    ///
    /// An empty slice is the null string. Requests only ever send text, through [`Self::write_str`].
    #[cfg(test)]
    pub(crate) fn write_string(&mut self, bytes: &[u8]) -> Result<(), WireError> {
        self.write_padded(bytes, bytes.len())
    }

    /// Writes `s` as a string argument, adding the null terminator for it
    pub fn write_str(&mut self, s: &str) -> Result<(), WireError> {
        self.write_padded(s.as_bytes(), s.len() + 1)
    }

    pub fn write_array(&mut self, bytes: &[u8]) -> Result<(), WireError> {
        self.write_padded(bytes, bytes.len())
    }

    /// `len` is what goes in the length field; everything between `bytes` and the next 4 byte
    /// boundary after `len` is zeroed
    fn write_padded(&mut self, bytes: &[u8], len: usize) -> Result<(), WireError> {
        debug_assert!(bytes.len() <= len);
        let len_field = u32::try_from(len).map_err(|_| WireError::Overflow {
            needed: len,
            remaining: self.buf.len() - self.pos,
        })?;

        // check the whole argument fits before writing any of it
        let remaining = self.buf.len() - self.pos;
        if padded_len(len) > remaining {
            return Err(WireError::Overflow {
                needed: padded_len(len),
                remaining,
            });
        }

        self.write_u32(len_field)?;
        let dst = self.claim(roundup_4(len), 4)?;
        dst[..bytes.len()].copy_from_slice(bytes);
        dst[bytes.len()..].fill(0);
        Ok(())
    }
}

/// A cursor over a received message
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    #[must_use]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize, align: usize) -> Result<&'a [u8], WireError> {
        if self.pos % align != 0 {
            return Err(WireError::Misaligned {
                offset: self.pos,
                align,
            });
        }
        if len > self.remaining() {
            return Err(WireError::Truncated {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.buf[start..self.pos])
    }

    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        let bytes = self.take(4, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32, WireError> {
        let bytes = self.take(4, 4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u16(&mut self) -> Result<u16, WireError> {
        let bytes = self.take(2, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Takes the next `n` raw bytes. Nothing is consumed if there aren't enough
    pub fn read_n(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        self.take(n, 1)
    }

    /// Reads a string argument, without its null terminator. The null string reads as ""
    pub fn read_string(&mut self) -> Result<&'a str, WireError> {
        let bytes = self.read_padded()?;
        let bytes = bytes.strip_suffix(&[0]).unwrap_or(bytes);
        std::str::from_utf8(bytes).map_err(|_| WireError::InvalidString)
    }

    pub fn read_array(&mut self) -> Result<&'a [u8], WireError> {
        self.read_padded()
    }

    fn read_padded(&mut self) -> Result<&'a [u8], WireError> {
        let start = self.pos;
        let len = self.read_u32()? as usize;
        match self.take(roundup_4(len), 4) {
            Ok(bytes) => Ok(&bytes[..len]),
            Err(e) => {
                // leave the length where it was, so the caller sees an untouched message
                self.pos = start;
                Err(e)
            }
        }
    }
}
