//! Stateful bit cursor over a fixed byte buffer.
//!
//! Bits are consumed MSB-first: bit index 0 is the high bit of the byte at the
//! current byte index. The cursor only moves forward. As soon as a read
//! consumes the last bit of a byte the cursor rolls over to the next one, so
//! `bit_index` is always in `0..8` and `current_byte` always describes the
//! byte the next read starts in.

use std::collections::HashMap;

use crate::{errors::ReadError, value::Value};

const PADDING: [u32; 9] = [
    0b0, 0b1, 0b11, 0b111, 0b1111, 0b11111, 0b111111, 0b1111111, 0b11111111,
];

/// Bit-level reader with a terminal exhausted state and a property side-channel.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_index: usize,
    bit_index: u8,
    current_byte: u8,
    exhausted: bool,
    properties: HashMap<String, Value>,
}

impl<'a> BitReader<'a> {
    /// Creates a reader positioned at the first byte of `data`.
    ///
    /// An empty buffer yields a reader that is exhausted from the start.
    pub fn new(data: &'a [u8]) -> Self {
        Self::start(data, 0)
    }

    /// Creates a reader positioned at byte `offset` of `data`.
    ///
    /// `offset == data.len()` is allowed and yields an exhausted reader.
    pub fn at(data: &'a [u8], offset: usize) -> Result<Self, ReadError> {
        if offset > data.len() {
            return Err(ReadError::OutOfBounds {
                byte_index: offset,
                requested: 0,
                available: 0,
            });
        }

        Ok(Self::start(data, offset))
    }

    fn start(data: &'a [u8], offset: usize) -> Self {
        let (current_byte, exhausted) = match data.get(offset) {
            Some(&byte) => (byte, false),
            None => (0, true),
        };

        BitReader {
            data,
            byte_index: offset,
            bit_index: 0,
            current_byte,
            exhausted,
            properties: HashMap::new(),
        }
    }

    /// Index of the byte the next read starts in.
    pub fn byte_index(&self) -> usize {
        self.byte_index
    }

    /// Number of bits already consumed from the current byte (`0..8`).
    pub fn bit_index(&self) -> u8 {
        self.bit_index
    }

    /// The byte the next read starts in, or `None` once the reader is exhausted.
    pub fn current_byte(&self) -> Option<u8> {
        (!self.exhausted).then_some(self.current_byte)
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn is_aligned(&self) -> bool {
        self.bit_index == 0
    }

    /// Whole and partial bytes left to read, counting the current byte.
    pub fn remaining_bytes(&self) -> usize {
        self.data.len().saturating_sub(self.byte_index)
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Reads a single bit.
    pub fn read_bit(&mut self) -> Result<bool, ReadError> {
        Ok(self.read_raw(1)? == 1)
    }

    /// Reads up to 6 bits into the low bits of the result.
    pub fn read_few_bits(&mut self, bits: usize) -> Result<u8, ReadError> {
        check_width(bits, 6)?;
        self.read_raw(bits)
    }

    /// Reads 8 bits as an unsigned byte and leaves the cursor byte aligned.
    ///
    /// Started mid-byte, the 8 bits span two bytes and the unread low bits of
    /// the second one are skipped.
    pub fn read_byte(&mut self) -> Result<u8, ReadError> {
        let byte = self.read_raw(8)?;
        self.finish_byte()?;

        Ok(byte)
    }

    /// Reads up to 12 bits.
    pub fn read_short_bits(&mut self, bits: usize) -> Result<u16, ReadError> {
        check_width(bits, 12)?;
        Ok(self.read_wide(bits)? as u16)
    }

    /// Reads up to 24 bits.
    pub fn read_bits(&mut self, bits: usize) -> Result<u32, ReadError> {
        check_width(bits, 24)?;
        Ok(self.read_wide(bits)? as u32)
    }

    /// Reads up to 48 bits.
    pub fn read_many_bits(&mut self, bits: usize) -> Result<u64, ReadError> {
        check_width(bits, 48)?;
        self.read_wide(bits)
    }

    /// Reads `count` bytes with [BitReader::read_byte].
    ///
    /// Fails without moving the cursor when fewer than `count` bytes are left.
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, ReadError> {
        self.check_bytes_left(count)?;

        let mut bytes = Vec::with_capacity(count);
        for _ in 0..count {
            bytes.push(self.read_byte()?);
        }

        Ok(bytes)
    }

    /// Like [BitReader::read_bytes], without keeping the bytes.
    pub fn skip_bytes(&mut self, count: usize) -> Result<(), ReadError> {
        self.check_bytes_left(count)?;

        for _ in 0..count {
            self.read_byte()?;
        }

        Ok(())
    }

    /// Skips the unread bits of the current byte. No-op when already aligned.
    pub fn finish_byte(&mut self) -> Result<(), ReadError> {
        if self.bit_index == 0 {
            return Ok(());
        }

        self.check_exhausted()?;
        self.bit_index = 8;
        self.next_byte()
    }

    /// Returns the next `count` bytes without consuming them.
    ///
    /// Unlike [BitReader::peek_bytes_strict] this also works in the middle of
    /// a byte; the returned slice then starts at the partially read byte.
    pub fn peek_bytes(&self, count: usize) -> Result<&'a [u8], ReadError> {
        self.peek(count, false)
    }

    /// Returns the next `count` bytes without consuming them. Requires alignment.
    pub fn peek_bytes_strict(&self, count: usize) -> Result<&'a [u8], ReadError> {
        self.peek(count, true)
    }

    /// Consumes the next byte if it equals `value`.
    ///
    /// An exhausted reader never matches. A mismatch leaves the reader untouched.
    pub fn is_next_byte_match(&mut self, value: u8) -> Result<bool, ReadError> {
        if self.exhausted {
            return Ok(false);
        }

        if self.peek_bytes_strict(1)?[0] != value {
            return Ok(false);
        }

        self.read_byte()?;
        Ok(true)
    }

    fn peek(&self, count: usize, strict: bool) -> Result<&'a [u8], ReadError> {
        self.check_exhausted()?;

        if self.bit_index != 0 {
            if strict {
                return Err(ReadError::Unaligned {
                    bit_index: self.bit_index,
                });
            }

            tracing::warn!(
                byte_index = self.byte_index,
                bit_index = self.bit_index,
                "peeking bytes while not byte aligned"
            );
        }

        self.byte_index
            .checked_add(count)
            .and_then(|end| self.data.get(self.byte_index..end))
            .ok_or_else(|| self.out_of_bounds(count, self.remaining_bytes()))
    }

    /// A partly read current byte cannot start a whole byte.
    fn check_bytes_left(&self, count: usize) -> Result<(), ReadError> {
        if count == 0 {
            return Ok(());
        }
        self.check_exhausted()?;

        let available = self.remaining_bytes() - usize::from(self.bit_index != 0);
        if count > available {
            return Err(self.out_of_bounds(count, available));
        }

        Ok(())
    }

    fn out_of_bounds(&self, requested: usize, available: usize) -> ReadError {
        ReadError::OutOfBounds {
            byte_index: self.byte_index,
            requested,
            available,
        }
    }

    /// Full bytes first, then a sub-byte remainder, concatenated MSB-first.
    fn read_wide(&mut self, bits: usize) -> Result<u64, ReadError> {
        let mut value = 0u64;

        for _ in 0..bits / 8 {
            value = (value << 8) | self.read_raw(8)? as u64;
        }

        let remainder = bits % 8;
        if remainder > 0 {
            value = (value << remainder) | self.read_raw(remainder)? as u64;
        }

        Ok(value)
    }

    fn read_raw(&mut self, bits: usize) -> Result<u8, ReadError> {
        check_width(bits, 8)?;
        self.check_exhausted()?;

        let diff = 8 - self.bit_index as usize;
        let current = self.current_byte as u32;

        let value = if diff >= bits {
            self.bit_index += bits as u8;
            current >> (diff - bits)
        } else {
            let offset = bits - diff;
            let high = current << offset;

            self.bit_index += diff as u8;
            self.next_byte()?;

            if self.exhausted {
                return Err(self.out_of_bounds(1, 0));
            }

            self.bit_index += offset as u8;
            high | (self.current_byte as u32 >> (8 - offset))
        };

        if self.bit_index > 7 {
            self.next_byte()?;
        }

        Ok((value & PADDING[bits]) as u8)
    }

    fn next_byte(&mut self) -> Result<(), ReadError> {
        if self.bit_index != 8 {
            return Err(ReadError::InvalidState(
                "current byte must be fully read before moving to the next one",
            ));
        }
        self.check_exhausted()?;

        self.byte_index += 1;
        self.bit_index = 0;

        match self.data.get(self.byte_index) {
            Some(&byte) => self.current_byte = byte,
            None => {
                self.exhausted = true;
                self.current_byte = 0;
            }
        }

        Ok(())
    }

    fn check_exhausted(&self) -> Result<(), ReadError> {
        if self.exhausted {
            return Err(ReadError::Exhausted);
        }

        Ok(())
    }
}

fn check_width(requested: usize, max: usize) -> Result<(), ReadError> {
    if requested > max {
        return Err(ReadError::TooManyBits { requested, max });
    }

    Ok(())
}
