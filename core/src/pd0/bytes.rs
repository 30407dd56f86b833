//! Bounded little-endian access to one ensemble sub-block.

use crate::prelude::{NavError, NavResult};

/// Read-only view of a sub-block; every read is checked against the block extent.
pub(crate) struct BlockReader<'a> {
    name: &'static str,
    bytes: &'a [u8],
    base: usize,
}

impl<'a> BlockReader<'a> {
    pub fn new(name: &'static str, buffer: &'a [u8], start: usize, end: usize) -> NavResult<Self> {
        let bytes = buffer.get(start..end).ok_or_else(|| {
            NavError::Offset(format!(
                "{} block {}..{} lies outside a {} byte buffer",
                name,
                start,
                end,
                buffer.len()
            ))
        })?;
        Ok(Self {
            name,
            bytes,
            base: start,
        })
    }

    pub fn has(&self, at: usize, width: usize) -> bool {
        at.checked_add(width)
            .map(|end| end <= self.bytes.len())
            .unwrap_or(false)
    }

    fn slice<const N: usize>(&self, at: usize) -> NavResult<[u8; N]> {
        let mut out = [0u8; N];
        let src = at
            .checked_add(N)
            .and_then(|end| self.bytes.get(at..end))
            .ok_or_else(|| {
                NavError::Offset(format!(
                    "{} field at +{} (absolute {}) runs past the {} byte block",
                    self.name,
                    at,
                    self.base + at,
                    self.bytes.len()
                ))
            })?;
        out.copy_from_slice(src);
        Ok(out)
    }

    pub fn u8(&self, at: usize) -> NavResult<u8> {
        Ok(self.slice::<1>(at)?[0])
    }

    pub fn u16(&self, at: usize) -> NavResult<u16> {
        Ok(u16::from_le_bytes(self.slice::<2>(at)?))
    }

    pub fn i16(&self, at: usize) -> NavResult<i16> {
        Ok(i16::from_le_bytes(self.slice::<2>(at)?))
    }

    pub fn u32(&self, at: usize) -> NavResult<u32> {
        Ok(u32::from_le_bytes(self.slice::<4>(at)?))
    }
}

/// Zero-filled sub-block under construction.
pub(crate) struct BlockWriter {
    bytes: Vec<u8>,
}

impl BlockWriter {
    pub fn with_len(len: usize) -> Self {
        Self {
            bytes: vec![0; len],
        }
    }

    pub fn put_u8(&mut self, at: usize, value: u8) {
        self.bytes[at] = value;
    }

    pub fn put_u16(&mut self, at: usize, value: u16) {
        self.bytes[at..at + 2].copy_from_slice(&value.to_le_bytes());
    }

    pub fn put_i16(&mut self, at: usize, value: i16) {
        self.bytes[at..at + 2].copy_from_slice(&value.to_le_bytes());
    }

    pub fn put_u32(&mut self, at: usize, value: u32) {
        self.bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.bytes
    }
}

/// Scales a metric value back to the integer unit it was reported in.
pub(crate) fn unscale_u16(value: f64, factor: f64) -> u16 {
    (value * factor).round().clamp(0.0, f64::from(u16::MAX)) as u16
}

pub(crate) fn unscale_i16(value: f64, factor: f64) -> i16 {
    (value * factor)
        .round()
        .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

pub(crate) fn unscale_u32(value: f64, factor: f64) -> u32 {
    (value * factor).round().clamp(0.0, f64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_fields() {
        let buffer = [0xAA, 0x34, 0x12, 0xFE, 0xFF, 0x01, 0x00, 0x00, 0x00];
        let reader = BlockReader::new("test", &buffer, 1, 9).unwrap();
        assert_eq!(reader.u16(0).unwrap(), 0x1234);
        assert_eq!(reader.i16(2).unwrap(), -2);
        assert_eq!(reader.u32(4).unwrap(), 1);
    }

    #[test]
    fn reads_past_block_are_offset_errors() {
        let buffer = [0u8; 8];
        let reader = BlockReader::new("test", &buffer, 2, 6).unwrap();
        assert!(matches!(reader.u32(2), Err(NavError::Offset(_))));
        assert!(matches!(reader.u8(usize::MAX), Err(NavError::Offset(_))));
        assert!(BlockReader::new("test", &buffer, 4, 12).is_err());
    }

    #[test]
    fn unscale_rounds_to_reported_units() {
        assert_eq!(unscale_u16(0.29, 100.0), 29);
        assert_eq!(unscale_i16(-12.34, 100.0), -1234);
        assert_eq!(unscale_u32(101_325.0, 0.1), 10_133);
    }
}
