//! Bounds-checked big-endian reader over raw SMF bytes.

use super::error::MidiError;

/// Sequential reader over an immutable byte buffer.
///
/// All multi-byte reads are big-endian, as required by the SMF layout.
/// A read that would run past the end of the buffer fails with
/// [`MidiError::TruncatedStream`] and leaves the position untouched.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Offset of the next byte within the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Takes the next `len` bytes, advancing past them.
    fn take(&mut self, len: usize) -> Result<&'a [u8], MidiError> {
        if len > self.remaining() {
            return Err(MidiError::TruncatedStream {
                offset: self.position(),
                needed: len,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, MidiError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, MidiError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Reads a 24-bit big-endian value (used by Set-Tempo).
    pub fn read_u24(&mut self) -> Result<u32, MidiError> {
        let b = self.take(3)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, MidiError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads `len` bytes as a chunk tag. Non-ASCII bytes are replaced so the
    /// result can be shown in error messages.
    pub fn read_fixed_string(&mut self, len: usize) -> Result<String, MidiError> {
        let bytes = self.take(len)?;
        Ok(bytes
            .iter()
            .map(|&b| if b.is_ascii() { b as char } else { '?' })
            .collect())
    }

    /// Decodes a variable-length quantity.
    ///
    /// Each byte contributes its low seven bits; a set high bit means another
    /// byte follows. Bits shifted past 32 are discarded.
    pub fn read_var_len(&mut self) -> Result<u32, MidiError> {
        let start = self.pos;
        let mut value: u32 = 0;
        loop {
            let byte = match self.read_u8() {
                Ok(byte) => byte,
                Err(e) => {
                    self.pos = start;
                    return Err(e);
                }
            };
            value = (value << 7) | (byte & 0x7F) as u32;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
    }

    pub fn skip(&mut self, len: usize) -> Result<(), MidiError> {
        self.take(len).map(|_| ())
    }

    /// Steps back over the byte just read. Used for running status, where the
    /// byte read as a status turns out to be the first data byte.
    pub fn rewind_one(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }

    /// Moves forward `len` bytes, stopping at the end of the buffer.
    ///
    /// Returns the number of bytes actually skipped.
    pub fn advance(&mut self, len: usize) -> usize {
        let step = len.min(self.remaining());
        self.pos += step;
        step
    }
}
