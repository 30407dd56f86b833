//! PD0 ensemble checksum.
//!
//! The checksum is the sum of every byte from the start of the header up to
//! (not including) the checksum field, truncated to 16 bits. It is stored
//! little-endian immediately after the bytes it covers.

/// Wrapping 16-bit sum of all bytes.
pub fn compute_checksum(data: &[u8]) -> u16 {
    data.iter()
        .fold(0u16, |acc, &byte| acc.wrapping_add(u16::from(byte)))
}

/// Reads the stored checksum that follows `byte_count` covered bytes.
pub fn stored_checksum(buffer: &[u8], byte_count: usize) -> Option<u16> {
    let bytes = buffer.get(byte_count..byte_count + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_sums_bytes_not_words() {
        assert_eq!(compute_checksum(&[0x7F, 0x7F, 0x02, 0x00]), 0x0100);
    }

    #[test]
    fn checksum_wraps_at_sixteen_bits() {
        let data = vec![0xFFu8; 300];
        assert_eq!(compute_checksum(&data), (300u32 * 0xFF % 65536) as u16);
    }

    #[test]
    fn stored_checksum_needs_two_trailing_bytes() {
        let frame = [0x01, 0x02, 0x03, 0x06, 0x00];
        assert_eq!(stored_checksum(&frame, 3), Some(0x0006));
        assert_eq!(stored_checksum(&frame, 4), None);
    }
}
