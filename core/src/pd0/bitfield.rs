use serde::{Deserialize, Serialize};

/// Fixed-width unsigned word whose sub-fields are read by shift-and-mask.
///
/// `WIDTH` is the word size in bits; bits above it are discarded on
/// construction so a field can never report bits the instrument did not send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitField<const WIDTH: u32> {
    raw: u32,
}

pub type BitField8 = BitField<8>;
pub type BitField16 = BitField<16>;

impl<const WIDTH: u32> BitField<WIDTH> {
    pub fn new(raw: u32) -> Self {
        Self {
            raw: raw & Self::mask(WIDTH),
        }
    }

    pub fn raw(&self) -> u32 {
        self.raw
    }

    /// Returns `width` bits starting at bit `shift` (bit 0 is the LSB).
    pub fn field(&self, shift: u32, width: u32) -> u32 {
        if shift >= WIDTH {
            return 0;
        }
        (self.raw >> shift) & Self::mask(width)
    }

    pub fn flag(&self, bit: u32) -> bool {
        self.field(bit, 1) == 1
    }

    /// Indices of every set bit, lowest first.
    pub fn set_bits(&self) -> Vec<u32> {
        (0..WIDTH).filter(|&bit| self.flag(bit)).collect()
    }

    fn mask(width: u32) -> u32 {
        if width >= 32 {
            u32::MAX
        } else {
            (1u32 << width) - 1
        }
    }
}

impl From<u8> for BitField8 {
    fn from(value: u8) -> Self {
        Self::new(u32::from(value))
    }
}

impl From<u16> for BitField16 {
    fn from(value: u16) -> Self {
        Self::new(u32::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_extracts_shifted_ranges() {
        let word = BitField16::from(0b0100_0001_1100_1011u16);
        assert_eq!(word.field(0, 3), 0b011);
        assert_eq!(word.field(3, 1), 1);
        assert_eq!(word.field(8, 2), 0b01);
        assert_eq!(word.field(12, 4), 0b0100);
    }

    #[test]
    fn construction_masks_to_width() {
        let byte = BitField8::new(0x1FF);
        assert_eq!(byte.raw(), 0xFF);
        assert_eq!(byte.field(8, 4), 0);
    }

    #[test]
    fn set_bits_lists_flags_in_order() {
        let byte = BitField8::from(0b1000_0101u8);
        assert_eq!(byte.set_bits(), vec![0, 2, 7]);
        assert!(byte.flag(7));
        assert!(!byte.flag(1));
    }
}
