use serde::{Deserialize, Serialize};

use super::bytes::{unscale_u16, BlockReader, BlockWriter};
use crate::math::units::{CM_PER_M, DM_PER_M, MM_PER_M};
use crate::prelude::NavResult;

pub const BOTTOM_TRACK_ID: u16 = 0x0600;
pub const BOTTOM_TRACK_LEN: usize = 81;
pub const BOTTOM_TRACK_BEAMS: usize = 4;

/// Seafloor-referenced block. Per-beam arrays are indexed by beam number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottomTrack {
    pub pings_per_ensemble: u16,
    pub min_correlation: u8,
    pub min_echo_amplitude: u8,
    pub mode: u8,
    /// m/s
    pub max_error_velocity: f64,
    /// m; zero means no bottom detected on that beam.
    pub range: [f64; BOTTOM_TRACK_BEAMS],
    /// Raw mm/s with the invalid sentinel preserved.
    pub velocity: [i16; BOTTOM_TRACK_BEAMS],
    pub correlation: [u8; BOTTOM_TRACK_BEAMS],
    pub echo_intensity: [u8; BOTTOM_TRACK_BEAMS],
    pub percent_good: [u8; BOTTOM_TRACK_BEAMS],
    /// m
    pub ref_layer_min: f64,
    /// m
    pub ref_layer_near: f64,
    /// m
    pub ref_layer_far: f64,
    pub ref_layer_velocity: [i16; BOTTOM_TRACK_BEAMS],
    pub ref_layer_correlation: [u8; BOTTOM_TRACK_BEAMS],
    pub ref_layer_echo_intensity: [u8; BOTTOM_TRACK_BEAMS],
    pub ref_layer_percent_good: [u8; BOTTOM_TRACK_BEAMS],
    /// m
    pub max_tracking_depth: f64,
    pub rssi: [u8; BOTTOM_TRACK_BEAMS],
    pub shallow_water_gain: u8,
}

impl BottomTrack {
    pub(crate) fn decode(reader: &BlockReader<'_>) -> NavResult<Self> {
        let mut range = [0.0; BOTTOM_TRACK_BEAMS];
        for (beam, slot) in range.iter_mut().enumerate() {
            let lsb = u32::from(reader.u16(16 + 2 * beam)?);
            let msb = u32::from(reader.u8(77 + beam)?);
            *slot = f64::from((msb << 16) | lsb) / CM_PER_M;
        }

        Ok(Self {
            pings_per_ensemble: reader.u16(2)?,
            min_correlation: reader.u8(6)?,
            min_echo_amplitude: reader.u8(7)?,
            mode: reader.u8(9)?,
            max_error_velocity: f64::from(reader.u16(10)?) / MM_PER_M,
            range,
            velocity: read_i16x4(reader, 24)?,
            correlation: read_u8x4(reader, 32)?,
            echo_intensity: read_u8x4(reader, 36)?,
            percent_good: read_u8x4(reader, 40)?,
            ref_layer_min: f64::from(reader.u16(44)?) / DM_PER_M,
            ref_layer_near: f64::from(reader.u16(46)?) / DM_PER_M,
            ref_layer_far: f64::from(reader.u16(48)?) / DM_PER_M,
            ref_layer_velocity: read_i16x4(reader, 50)?,
            ref_layer_correlation: read_u8x4(reader, 58)?,
            ref_layer_echo_intensity: read_u8x4(reader, 62)?,
            ref_layer_percent_good: read_u8x4(reader, 66)?,
            max_tracking_depth: f64::from(reader.u16(70)?) / DM_PER_M,
            rssi: read_u8x4(reader, 72)?,
            shallow_water_gain: reader.u8(76)?,
        })
    }

    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut w = BlockWriter::with_len(BOTTOM_TRACK_LEN);
        w.put_u16(0, BOTTOM_TRACK_ID);
        w.put_u16(2, self.pings_per_ensemble);
        w.put_u8(6, self.min_correlation);
        w.put_u8(7, self.min_echo_amplitude);
        w.put_u8(9, self.mode);
        w.put_u16(10, unscale_u16(self.max_error_velocity, MM_PER_M));
        for beam in 0..BOTTOM_TRACK_BEAMS {
            let cm = (self.range[beam] * CM_PER_M).round().clamp(0.0, f64::from(0x00FF_FFFF)) as u32;
            w.put_u16(16 + 2 * beam, (cm & 0xFFFF) as u16);
            w.put_u8(77 + beam, (cm >> 16) as u8);
            w.put_i16(24 + 2 * beam, self.velocity[beam]);
            w.put_u8(32 + beam, self.correlation[beam]);
            w.put_u8(36 + beam, self.echo_intensity[beam]);
            w.put_u8(40 + beam, self.percent_good[beam]);
            w.put_i16(50 + 2 * beam, self.ref_layer_velocity[beam]);
            w.put_u8(58 + beam, self.ref_layer_correlation[beam]);
            w.put_u8(62 + beam, self.ref_layer_echo_intensity[beam]);
            w.put_u8(66 + beam, self.ref_layer_percent_good[beam]);
            w.put_u8(72 + beam, self.rssi[beam]);
        }
        w.put_u16(44, unscale_u16(self.ref_layer_min, DM_PER_M));
        w.put_u16(46, unscale_u16(self.ref_layer_near, DM_PER_M));
        w.put_u16(48, unscale_u16(self.ref_layer_far, DM_PER_M));
        w.put_u16(70, unscale_u16(self.max_tracking_depth, DM_PER_M));
        w.put_u8(76, self.shallow_water_gain);
        w.into_inner()
    }

    /// Beam velocity in m/s, `None` for the sentinel.
    pub fn velocity_mps(&self, beam: usize, sentinel: i16) -> Option<f64> {
        let raw = *self.velocity.get(beam)?;
        (raw != sentinel).then(|| f64::from(raw) / MM_PER_M)
    }

    pub fn range_valid(&self, beam: usize) -> bool {
        self.range.get(beam).map(|&r| r > 0.0).unwrap_or(false)
    }

    /// Mean range over beams that detected the bottom.
    pub fn mean_range(&self) -> Option<f64> {
        let valid: Vec<f64> = self.range.iter().copied().filter(|&r| r > 0.0).collect();
        if valid.is_empty() {
            None
        } else {
            Some(valid.iter().sum::<f64>() / valid.len() as f64)
        }
    }
}

impl Default for BottomTrack {
    fn default() -> Self {
        Self {
            pings_per_ensemble: 1,
            min_correlation: 220,
            min_echo_amplitude: 30,
            mode: 5,
            max_error_velocity: 1.0,
            range: [0.0; BOTTOM_TRACK_BEAMS],
            velocity: [i16::MIN; BOTTOM_TRACK_BEAMS],
            correlation: [0; BOTTOM_TRACK_BEAMS],
            echo_intensity: [0; BOTTOM_TRACK_BEAMS],
            percent_good: [0; BOTTOM_TRACK_BEAMS],
            ref_layer_min: 0.0,
            ref_layer_near: 0.0,
            ref_layer_far: 0.0,
            ref_layer_velocity: [i16::MIN; BOTTOM_TRACK_BEAMS],
            ref_layer_correlation: [0; BOTTOM_TRACK_BEAMS],
            ref_layer_echo_intensity: [0; BOTTOM_TRACK_BEAMS],
            ref_layer_percent_good: [0; BOTTOM_TRACK_BEAMS],
            max_tracking_depth: 0.0,
            rssi: [0; BOTTOM_TRACK_BEAMS],
            shallow_water_gain: 0,
        }
    }
}

fn read_i16x4(reader: &BlockReader<'_>, at: usize) -> NavResult<[i16; BOTTOM_TRACK_BEAMS]> {
    Ok([
        reader.i16(at)?,
        reader.i16(at + 2)?,
        reader.i16(at + 4)?,
        reader.i16(at + 6)?,
    ])
}

fn read_u8x4(reader: &BlockReader<'_>, at: usize) -> NavResult<[u8; BOTTOM_TRACK_BEAMS]> {
    Ok([
        reader.u8(at)?,
        reader.u8(at + 1)?,
        reader.u8(at + 2)?,
        reader.u8(at + 3)?,
    ])
}
