//! Typed views over the configuration and status words of the leaders.

use serde::{Deserialize, Serialize};

use super::bitfield::{BitField16, BitField8};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    Down,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeamPattern {
    Concave,
    Convex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JanusConfig {
    FourBeam,
    FiveBeamOneDemod,
    FiveBeamTwoDemod,
    Other(u8),
}

/// Hardware description packed into the fixed leader's system configuration word.
///
/// LSB: bits 0-2 frequency, bit 3 beam pattern, bits 4-5 sensor configuration,
/// bit 6 transducer attached, bit 7 facing. MSB: bits 8-9 beam angle,
/// bits 12-15 janus configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfiguration {
    word: BitField16,
}

impl SystemConfiguration {
    pub fn new(word: BitField16) -> Self {
        Self { word }
    }

    pub fn word(&self) -> BitField16 {
        self.word
    }

    pub fn frequency_khz(&self) -> Option<u32> {
        match self.word.field(0, 3) {
            0b000 => Some(75),
            0b001 => Some(150),
            0b010 => Some(300),
            0b011 => Some(600),
            0b100 => Some(1200),
            0b101 => Some(2400),
            _ => None,
        }
    }

    pub fn beam_pattern(&self) -> BeamPattern {
        if self.word.flag(3) {
            BeamPattern::Convex
        } else {
            BeamPattern::Concave
        }
    }

    pub fn sensor_config(&self) -> u8 {
        (self.word.field(4, 2) + 1) as u8
    }

    pub fn transducer_attached(&self) -> bool {
        self.word.flag(6)
    }

    pub fn facing(&self) -> Facing {
        if self.word.flag(7) {
            Facing::Up
        } else {
            Facing::Down
        }
    }

    /// Beam angle in degrees, `None` when the instrument reports "other".
    pub fn beam_angle_deg(&self) -> Option<f64> {
        match self.word.field(8, 2) {
            0b00 => Some(15.0),
            0b01 => Some(20.0),
            0b10 => Some(30.0),
            _ => None,
        }
    }

    pub fn janus(&self) -> JanusConfig {
        match self.word.field(12, 4) {
            0b0100 => JanusConfig::FourBeam,
            0b0101 => JanusConfig::FiveBeamOneDemod,
            0b1111 => JanusConfig::FiveBeamTwoDemod,
            other => JanusConfig::Other(other as u8),
        }
    }
}

/// Which environmental inputs are measured internally rather than fixed by command.
///
/// Shared layout for the fixed leader's sensor-source and sensor-available bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorFlags {
    byte: BitField8,
}

impl SensorFlags {
    pub fn new(byte: BitField8) -> Self {
        Self { byte }
    }

    pub fn byte(&self) -> BitField8 {
        self.byte
    }

    pub fn speed_of_sound(&self) -> bool {
        self.byte.flag(6)
    }

    pub fn depth(&self) -> bool {
        self.byte.flag(5)
    }

    pub fn heading(&self) -> bool {
        self.byte.flag(4)
    }

    pub fn pitch(&self) -> bool {
        self.byte.flag(3)
    }

    pub fn roll(&self) -> bool {
        self.byte.flag(2)
    }

    pub fn salinity(&self) -> bool {
        self.byte.flag(1)
    }

    pub fn temperature(&self) -> bool {
        self.byte.flag(0)
    }
}

/// Built-in-test result word; zero means every test passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitResult {
    word: BitField16,
}

impl BitResult {
    pub fn new(word: BitField16) -> Self {
        Self { word }
    }

    pub fn word(&self) -> BitField16 {
        self.word
    }

    pub fn is_ok(&self) -> bool {
        self.word.raw() == 0
    }

    pub fn fault_bits(&self) -> Vec<u32> {
        self.word.set_bits()
    }
}
