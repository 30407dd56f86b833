use serde::{Deserialize, Serialize};

use crate::pd0::bitfield::BitField8;
use crate::pd0::FixedLeader;
use crate::prelude::{NavError, NavResult};

/// Reference frame of the four reported velocity components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateFrame {
    Beam,
    Instrument,
    Ship,
    Earth,
}

/// Meaning of one velocity component slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityComponent {
    Beam(u8),
    X,
    Y,
    Z,
    Starboard,
    Forward,
    Mast,
    East,
    North,
    Up,
    Error,
}

/// Classification attached to an ensemble after decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinateTransform {
    pub frame: CoordinateFrame,
    pub tilts_used: bool,
    pub three_beam_allowed: bool,
    pub bin_mapping_allowed: bool,
}

impl CoordinateTransform {
    pub fn is_earth(&self) -> bool {
        self.frame == CoordinateFrame::Earth
    }

    /// Labels for velocity slots 0..4 in this frame.
    pub fn components(&self) -> [VelocityComponent; 4] {
        use VelocityComponent::*;
        match self.frame {
            CoordinateFrame::Beam => [Beam(1), Beam(2), Beam(3), Beam(4)],
            CoordinateFrame::Instrument => [X, Y, Z, Error],
            CoordinateFrame::Ship => [Starboard, Forward, Mast, Error],
            CoordinateFrame::Earth => [East, North, Up, Error],
        }
    }
}

/// Reads the coordinate-transformation byte of a fixed leader.
///
/// Bits 4..3 pick the frame, bit 2 marks tilt correction, bit 1 allows
/// three-beam solutions and bit 0 allows bin mapping.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoordinateResolver;

impl CoordinateResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve_bits(&self, bits: BitField8) -> NavResult<CoordinateTransform> {
        let selector = bits.field(3, 2);
        let frame = match selector {
            0b00 => CoordinateFrame::Beam,
            0b01 => CoordinateFrame::Instrument,
            0b10 => CoordinateFrame::Ship,
            0b11 => CoordinateFrame::Earth,
            other => return Err(NavError::UnsupportedFrame(other as u8)),
        };
        Ok(CoordinateTransform {
            frame,
            tilts_used: bits.flag(2),
            three_beam_allowed: bits.flag(1),
            bin_mapping_allowed: bits.flag(0),
        })
    }

    pub fn resolve(&self, leader: &FixedLeader) -> NavResult<CoordinateTransform> {
        self.resolve_bits(leader.coordinate_transformation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(value: u8) -> CoordinateTransform {
        CoordinateResolver::new()
            .resolve_bits(BitField8::from(value))
            .unwrap()
    }

    #[test]
    fn all_bits_set_is_earth_with_every_flag() {
        let transform = resolve(31);
        assert_eq!(transform.frame, CoordinateFrame::Earth);
        assert!(transform.tilts_used);
        assert!(transform.three_beam_allowed);
        assert!(transform.bin_mapping_allowed);
        assert!(transform.is_earth());
    }

    #[test]
    fn low_flags_without_selector_is_beam() {
        let transform = resolve(7);
        assert_eq!(transform.frame, CoordinateFrame::Beam);
        assert!(transform.tilts_used);
        assert!(transform.three_beam_allowed);
        assert!(transform.bin_mapping_allowed);
        assert_eq!(
            transform.components()[0],
            VelocityComponent::Beam(1)
        );
    }

    #[test]
    fn selector_picks_instrument_and_ship() {
        assert_eq!(resolve(0b01000).frame, CoordinateFrame::Instrument);
        let ship = resolve(0b10000);
        assert_eq!(ship.frame, CoordinateFrame::Ship);
        assert!(!ship.tilts_used);
        assert_eq!(ship.components()[1], VelocityComponent::Forward);
    }

    #[test]
    fn high_bits_do_not_leak_into_the_selector() {
        assert_eq!(resolve(0b1110_0000).frame, CoordinateFrame::Beam);
        assert_eq!(
            resolve(0b1111_1000).components(),
            [
                VelocityComponent::East,
                VelocityComponent::North,
                VelocityComponent::Up,
                VelocityComponent::Error
            ]
        );
    }
}
