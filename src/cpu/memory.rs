//! RPU memory subsystem.
//!
//! Memory is a fixed block of bytes addressed two ways: instruction fetch
//! reads whole bytes, while LOAD and STORE address single bits. Bit address
//! `a` lives in byte `a / 8` at bit position `a % 8` (bit 0 is the least
//! significant bit of the byte).

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The default memory size in bytes.
pub const MEMORY_SIZE: usize = 4096;

/// A single bit value: the accumulator's contents and the unit of LOAD/STORE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Bit {
    /// Cleared (0)
    #[default]
    Zero,
    /// Set (1)
    One,
}

impl Bit {
    /// Convert to `0` or `1`.
    #[inline]
    pub const fn to_u8(self) -> u8 {
        match self {
            Bit::Zero => 0,
            Bit::One => 1,
        }
    }

    /// True if the bit is set.
    #[inline]
    pub const fn is_set(self) -> bool {
        matches!(self, Bit::One)
    }
}

impl From<bool> for Bit {
    fn from(value: bool) -> Self {
        if value { Bit::One } else { Bit::Zero }
    }
}

impl From<Bit> for u8 {
    fn from(bit: Bit) -> Self {
        bit.to_u8()
    }
}

impl TryFrom<u8> for Bit {
    type Error = MemoryError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Bit::Zero),
            1 => Ok(Bit::One),
            other => Err(MemoryError::InvalidBitValue(other)),
        }
    }
}

impl std::fmt::Display for Bit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_u8())
    }
}

/// RPU memory: a fixed number of bytes, addressable by byte or by bit.
///
/// The capacity is set at construction and never changes afterwards.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    /// Create a zeroed memory of the default size.
    pub fn new() -> Self {
        Self::with_capacity(MEMORY_SIZE, &[])
    }

    /// Create a default-sized memory initialized from an image.
    ///
    /// See [`Memory::with_capacity`] for truncation and padding rules.
    pub fn from_image(image: &[u8]) -> Self {
        Self::with_capacity(MEMORY_SIZE, image)
    }

    /// Create a memory of `capacity` bytes with `image` copied in at offset 0.
    ///
    /// Shorter images are zero-padded. Longer images are truncated to fit
    /// and a warning is logged; loading never fails.
    pub fn with_capacity(capacity: usize, image: &[u8]) -> Self {
        let mut bytes = vec![0u8; capacity];
        let len = image.len().min(capacity);
        if image.len() > capacity {
            tracing::warn!(
                image_len = image.len(),
                capacity,
                "image larger than memory, truncating {} bytes",
                image.len() - capacity
            );
        }
        bytes[..len].copy_from_slice(&image[..len]);
        Self { bytes }
    }

    /// Memory size in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Memory size in addressable bits.
    #[inline]
    pub fn capacity_bits(&self) -> usize {
        self.bytes.len() * 8
    }

    /// The raw byte contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Read the bit at `address`.
    pub fn read_bit(&self, address: usize) -> Result<Bit, MemoryError> {
        let index = self.byte_index(address)?;
        Ok(Bit::from((self.bytes[index] >> (address % 8)) & 1 == 1))
    }

    /// Write a raw `0`/`1` value to the bit at `address`.
    ///
    /// Any other value is rejected with [`MemoryError::InvalidBitValue`]
    /// before memory is touched.
    pub fn write_bit(&mut self, address: usize, value: u8) -> Result<(), MemoryError> {
        let bit = Bit::try_from(value)?;
        self.set_bit(address, bit)
    }

    /// Set or clear the bit at `address`.
    pub fn set_bit(&mut self, address: usize, bit: Bit) -> Result<(), MemoryError> {
        let index = self.byte_index(address)?;
        let mask = 1u8 << (address % 8);
        match bit {
            Bit::One => self.bytes[index] |= mask,
            Bit::Zero => self.bytes[index] &= !mask,
        }
        Ok(())
    }

    /// Read a byte.
    #[inline]
    pub fn read_byte(&self, offset: usize) -> Result<u8, MemoryError> {
        self.bytes
            .get(offset)
            .copied()
            .ok_or(MemoryError::OutOfRange { address: offset, limit: self.capacity() })
    }

    /// Overwrite a byte.
    pub fn write_byte(&mut self, offset: usize, value: u8) -> Result<(), MemoryError> {
        let limit = self.capacity();
        let cell = self.bytes
            .get_mut(offset)
            .ok_or(MemoryError::OutOfRange { address: offset, limit })?;
        *cell = value;
        Ok(())
    }

    /// Read the two consecutive bytes at `offset` and `offset + 1`.
    ///
    /// Fails if either byte lies outside memory.
    pub fn read_word(&self, offset: usize) -> Result<[u8; 2], MemoryError> {
        let high = self.read_byte(offset)?;
        let low = self.read_byte(offset.checked_add(1).ok_or(MemoryError::OutOfRange {
            address: offset,
            limit: self.capacity(),
        })?)?;
        Ok([high, low])
    }

    /// Dump a range of bytes (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, u8)> {
        let end = start.saturating_add(count).min(self.capacity());
        (start.min(end)..end)
            .map(|i| (i, self.bytes[i]))
            .collect()
    }

    fn byte_index(&self, address: usize) -> Result<usize, MemoryError> {
        let index = address / 8;
        if index >= self.capacity() {
            return Err(MemoryError::OutOfRange {
                address,
                limit: self.capacity_bits(),
            });
        }
        Ok(index)
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only count non-zero bytes
        let non_zero = self.bytes.iter().filter(|b| **b != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_bytes", &non_zero)
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// A byte offset or bit address lies outside memory.
    #[error("address {address:#x} out of range (limit {limit:#x})")]
    OutOfRange { address: usize, limit: usize },

    /// A bit write was given something other than 0 or 1.
    #[error("invalid bit value {0} (must be 0 or 1)")]
    InvalidBitValue(u8),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Log sink shared between the subscriber and the test.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn logs_while<F: FnOnce()>(f: F) -> String {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = logs.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_new_memory_is_zeroed() {
        let mem = Memory::new();
        assert_eq!(mem.capacity(), MEMORY_SIZE);
        assert_eq!(mem.capacity_bits(), 32768);
        assert!(mem.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_image_padding_and_truncation() {
        let mem = Memory::with_capacity(4, &[1, 2]);
        assert_eq!(mem.as_bytes(), &[1, 2, 0, 0]);

        let mem = Memory::with_capacity(2, &[1, 2, 3, 4]);
        assert_eq!(mem.as_bytes(), &[1, 2]);
    }

    #[test]
    fn test_truncation_logs_warning() {
        let logs = logs_while(|| {
            let mem = Memory::with_capacity(2, &[1, 2, 3]);
            assert_eq!(mem.as_bytes(), &[1, 2]);
        });

        assert!(logs.contains("WARN"));
        assert!(logs.contains("truncating 1 bytes"));
    }

    #[test]
    fn test_fitting_image_logs_nothing() {
        let logs = logs_while(|| {
            Memory::with_capacity(4, &[1, 2, 3, 4]);
        });

        assert!(logs.is_empty());
    }

    #[test]
    fn test_bit_layout_is_lsb_first() {
        let mut mem = Memory::new();
        mem.write_byte(1, 0b0000_0100).unwrap();

        // Byte 1, bit 2 -> address 10
        assert_eq!(mem.read_bit(10).unwrap(), Bit::One);
        assert_eq!(mem.read_bit(9).unwrap(), Bit::Zero);
        assert_eq!(mem.read_bit(11).unwrap(), Bit::Zero);
    }

    #[test]
    fn test_write_bit_set_and_clear() {
        let mut mem = Memory::new();
        mem.write_byte(0, 0xFF).unwrap();

        mem.write_bit(3, 0).unwrap();
        assert_eq!(mem.read_byte(0).unwrap(), 0b1111_0111);

        mem.write_bit(3, 1).unwrap();
        assert_eq!(mem.read_byte(0).unwrap(), 0xFF);
    }

    #[test]
    fn test_invalid_bit_value() {
        let mut mem = Memory::new();
        assert_eq!(mem.write_bit(0, 2), Err(MemoryError::InvalidBitValue(2)));
        assert_eq!(mem.read_byte(0).unwrap(), 0);
    }

    #[test]
    fn test_bit_bounds() {
        let mut mem = Memory::new();

        assert!(mem.read_bit(32767).is_ok());
        assert!(matches!(mem.read_bit(32768), Err(MemoryError::OutOfRange { .. })));
        assert!(matches!(mem.set_bit(32768, Bit::One), Err(MemoryError::OutOfRange { .. })));
    }

    #[test]
    fn test_read_word_bounds() {
        let mem = Memory::with_capacity(4, &[0xAB, 0xCD, 0xEF, 0x01]);

        assert_eq!(mem.read_word(0).unwrap(), [0xAB, 0xCD]);
        assert_eq!(mem.read_word(2).unwrap(), [0xEF, 0x01]);
        assert!(mem.read_word(3).is_err());
        assert!(mem.read_word(4).is_err());
        assert!(mem.read_word(usize::MAX).is_err());
    }

    #[test]
    fn test_dump_clamps_to_capacity() {
        let mem = Memory::with_capacity(4, &[9, 8, 7, 6]);
        assert_eq!(mem.dump(2, 10), vec![(2, 7), (3, 6)]);
        assert!(mem.dump(10, 2).is_empty());
    }
}
