use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::bytes::{BlockReader, BlockWriter};
use crate::math::units::MM_PER_M;
use crate::prelude::{NavError, NavResult};

pub const VELOCITY_ID: u16 = 0x0100;
pub const CORRELATION_ID: u16 = 0x0200;
pub const ECHO_INTENSITY_ID: u16 = 0x0300;
pub const PERCENT_GOOD_ID: u16 = 0x0400;

const ID_LEN: usize = 2;

/// Water-column profile indexed `[[bin, beam]]`.
///
/// Velocities stay in the instrument's raw mm/s so the "no data" sentinel is
/// never confused with a measured zero. Each array is absent when its block
/// was not in the ensemble.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaterProfile {
    pub velocity: Option<Array2<i16>>,
    pub correlation: Option<Array2<u8>>,
    pub echo_intensity: Option<Array2<u8>>,
    pub percent_good: Option<Array2<u8>>,
}

impl WaterProfile {
    /// Velocity of one cell in m/s, `None` for the sentinel or an out-of-range cell.
    pub fn velocity_mps(&self, bin: usize, beam: usize, sentinel: i16) -> Option<f64> {
        let raw = *self.velocity.as_ref()?.get([bin, beam])?;
        (raw != sentinel).then(|| f64::from(raw) / MM_PER_M)
    }

    pub fn num_bins(&self) -> usize {
        self.velocity
            .as_ref()
            .map(|array| array.nrows())
            .or_else(|| self.correlation.as_ref().map(|array| array.nrows()))
            .or_else(|| self.echo_intensity.as_ref().map(|array| array.nrows()))
            .or_else(|| self.percent_good.as_ref().map(|array| array.nrows()))
            .unwrap_or(0)
    }

    pub(crate) fn decode_block(
        &mut self,
        id: u16,
        reader: &BlockReader<'_>,
        bins: usize,
        beams: usize,
    ) -> NavResult<()> {
        match id {
            VELOCITY_ID => self.velocity = Some(decode_i16_cells(reader, bins, beams)?),
            CORRELATION_ID => self.correlation = Some(decode_u8_cells(reader, bins, beams)?),
            ECHO_INTENSITY_ID => {
                self.echo_intensity = Some(decode_u8_cells(reader, bins, beams)?)
            }
            PERCENT_GOOD_ID => self.percent_good = Some(decode_u8_cells(reader, bins, beams)?),
            _ => {}
        }
        Ok(())
    }

    /// Encoded blocks in canonical order, each prefixed with its id.
    pub(crate) fn encode_blocks(&self) -> Vec<Vec<u8>> {
        let mut blocks = Vec::new();
        if let Some(velocity) = &self.velocity {
            let mut w = BlockWriter::with_len(ID_LEN + 2 * velocity.len());
            w.put_u16(0, VELOCITY_ID);
            for (i, &value) in velocity.iter().enumerate() {
                w.put_i16(ID_LEN + 2 * i, value);
            }
            blocks.push(w.into_inner());
        }
        for (id, array) in [
            (CORRELATION_ID, &self.correlation),
            (ECHO_INTENSITY_ID, &self.echo_intensity),
            (PERCENT_GOOD_ID, &self.percent_good),
        ] {
            if let Some(array) = array {
                let mut w = BlockWriter::with_len(ID_LEN + array.len());
                w.put_u16(0, id);
                for (i, &value) in array.iter().enumerate() {
                    w.put_u8(ID_LEN + i, value);
                }
                blocks.push(w.into_inner());
            }
        }
        blocks
    }
}

fn shape_error(name: &str, bins: usize, beams: usize) -> NavError {
    NavError::Offset(format!(
        "{} array does not fit {} bins x {} beams",
        name, bins, beams
    ))
}

fn decode_i16_cells(reader: &BlockReader<'_>, bins: usize, beams: usize) -> NavResult<Array2<i16>> {
    let cells = bins * beams;
    if !reader.has(ID_LEN, 2 * cells) {
        return Err(shape_error("velocity", bins, beams));
    }
    let values = (0..cells)
        .map(|i| reader.i16(ID_LEN + 2 * i))
        .collect::<NavResult<Vec<_>>>()?;
    Array2::from_shape_vec((bins, beams), values).map_err(|_| shape_error("velocity", bins, beams))
}

fn decode_u8_cells(reader: &BlockReader<'_>, bins: usize, beams: usize) -> NavResult<Array2<u8>> {
    let cells = bins * beams;
    if !reader.has(ID_LEN, cells) {
        return Err(shape_error("profiling", bins, beams));
    }
    let values = (0..cells)
        .map(|i| reader.u8(ID_LEN + i))
        .collect::<NavResult<Vec<_>>>()?;
    Array2::from_shape_vec((bins, beams), values).map_err(|_| shape_error("profiling", bins, beams))
}
