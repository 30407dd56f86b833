use log::trace;

use super::bottom_track::{BottomTrack, BOTTOM_TRACK_ID};
use super::bytes::BlockReader;
use super::checksum::{compute_checksum, stored_checksum};
use super::ensemble::{Ensemble, EnsembleHeader, SkippedBlock};
use super::leader::{FixedLeader, VariableLeader, FIXED_LEADER_ID, VARIABLE_LEADER_ID};
use super::profile::{
    WaterProfile, CORRELATION_ID, ECHO_INTENSITY_ID, PERCENT_GOOD_ID, VELOCITY_ID,
};
use crate::prelude::{EnsembleDecoder, NavError, NavResult};

/// Header id byte followed by the data-source byte.
pub const HEADER_ID: u16 = 0x7F7F;
/// Id, byte count, spare and block count.
pub const HEADER_FIXED_LEN: usize = 6;
pub const CHECKSUM_LEN: usize = 2;

/// Decoder for the Workhorse-style PD0 ensemble format.
#[derive(Debug, Default, Clone, Copy)]
pub struct Pd0Decoder;

struct BlockExtent {
    id: u16,
    start: usize,
    end: usize,
}

impl Pd0Decoder {
    pub fn new() -> Self {
        Self
    }

    fn read_header(buffer: &[u8]) -> NavResult<(usize, usize)> {
        if buffer.len() < HEADER_FIXED_LEN {
            return Err(NavError::Framing(format!(
                "{} bytes is shorter than an ensemble header",
                buffer.len()
            )));
        }
        let marker = u16::from_le_bytes([buffer[0], buffer[1]]);
        if marker != HEADER_ID {
            return Err(NavError::Framing(format!(
                "header marker {:#06x} is not {:#06x}",
                marker, HEADER_ID
            )));
        }
        let byte_count = usize::from(u16::from_le_bytes([buffer[2], buffer[3]]));
        let num_blocks = usize::from(buffer[5]);
        let header_len = HEADER_FIXED_LEN + 2 * num_blocks;
        if byte_count < header_len {
            return Err(NavError::Framing(format!(
                "byte count {} cannot hold a {} byte header",
                byte_count, header_len
            )));
        }
        if buffer.len() < byte_count + CHECKSUM_LEN {
            return Err(NavError::Framing(format!(
                "ensemble declares {} bytes plus checksum but buffer holds {}",
                byte_count,
                buffer.len()
            )));
        }
        Ok((byte_count, num_blocks))
    }

    fn verify_checksum(buffer: &[u8], byte_count: usize) -> NavResult<()> {
        let computed = compute_checksum(&buffer[..byte_count]);
        let stored = stored_checksum(buffer, byte_count)
            .ok_or_else(|| NavError::Framing("checksum field missing".into()))?;
        if computed != stored {
            return Err(NavError::Checksum { computed, stored });
        }
        Ok(())
    }

    fn read_offsets(buffer: &[u8], byte_count: usize, num_blocks: usize) -> NavResult<Vec<u16>> {
        let header_len = HEADER_FIXED_LEN + 2 * num_blocks;
        let mut offsets = Vec::with_capacity(num_blocks);
        for i in 0..num_blocks {
            let at = HEADER_FIXED_LEN + 2 * i;
            let offset = u16::from_le_bytes([buffer[at], buffer[at + 1]]);
            let position = usize::from(offset);
            if position < header_len || position + 2 > byte_count {
                return Err(NavError::Offset(format!(
                    "block {} offset {} outside {}..{}",
                    i, offset, header_len, byte_count
                )));
            }
            if let Some(&previous) = offsets.last() {
                if offset <= previous {
                    return Err(NavError::Offset(format!(
                        "block {} offset {} does not follow {}",
                        i, offset, previous
                    )));
                }
            }
            offsets.push(offset);
        }
        Ok(offsets)
    }

    fn block_extents(buffer: &[u8], byte_count: usize, offsets: &[u16]) -> Vec<BlockExtent> {
        offsets
            .iter()
            .enumerate()
            .map(|(i, &offset)| {
                let start = usize::from(offset);
                let end = offsets
                    .get(i + 1)
                    .map(|&next| usize::from(next))
                    .unwrap_or(byte_count);
                BlockExtent {
                    id: u16::from_le_bytes([buffer[start], buffer[start + 1]]),
                    start,
                    end,
                }
            })
            .collect()
    }
}

impl EnsembleDecoder for Pd0Decoder {
    fn family(&self) -> &'static str {
        "pd0"
    }

    fn decode(&self, buffer: &[u8]) -> NavResult<Ensemble> {
        let (byte_count, num_blocks) = Self::read_header(buffer)?;
        Self::verify_checksum(buffer, byte_count)?;
        let offsets = Self::read_offsets(buffer, byte_count, num_blocks)?;
        let extents = Self::block_extents(buffer, byte_count, &offsets);

        // Profile arrays are sized by the fixed leader, so it goes first.
        let fixed = extents
            .iter()
            .find(|block| block.id == FIXED_LEADER_ID)
            .ok_or_else(|| NavError::Offset("ensemble has no fixed leader".into()))?;
        let fixed_leader = FixedLeader::decode(&BlockReader::new(
            "fixed leader",
            buffer,
            fixed.start,
            fixed.end,
        )?)?;
        let bins = usize::from(fixed_leader.num_bins);
        let beams = usize::from(fixed_leader.num_beams);

        let mut variable_leader = None;
        let mut water_profile = WaterProfile::default();
        let mut bottom_track = None;
        let mut skipped_blocks = Vec::new();

        for block in &extents {
            match block.id {
                FIXED_LEADER_ID => {}
                VARIABLE_LEADER_ID => {
                    let reader = BlockReader::new("variable leader", buffer, block.start, block.end)?;
                    variable_leader = Some(VariableLeader::decode(&reader)?);
                }
                VELOCITY_ID | CORRELATION_ID | ECHO_INTENSITY_ID | PERCENT_GOOD_ID => {
                    let reader = BlockReader::new("profile", buffer, block.start, block.end)?;
                    water_profile.decode_block(block.id, &reader, bins, beams)?;
                }
                BOTTOM_TRACK_ID => {
                    let reader = BlockReader::new("bottom track", buffer, block.start, block.end)?;
                    bottom_track = Some(BottomTrack::decode(&reader)?);
                }
                id => {
                    trace!("skipping unknown block {:#06x} at {}", id, block.start);
                    skipped_blocks.push(SkippedBlock {
                        id,
                        offset: block.start,
                        len: block.end - block.start,
                    });
                }
            }
        }

        let variable_leader = variable_leader
            .ok_or_else(|| NavError::Offset("ensemble has no variable leader".into()))?;

        Ok(Ensemble {
            header: EnsembleHeader {
                byte_count: byte_count as u16,
                offsets,
            },
            fixed_leader,
            variable_leader,
            water_profile,
            bottom_track,
            skipped_blocks,
            transform: None,
            logical_index: None,
            derived: None,
        })
    }
}

impl<D: EnsembleDecoder + ?Sized> EnsembleDecoder for &D {
    fn family(&self) -> &'static str {
        (**self).family()
    }

    fn decode(&self, buffer: &[u8]) -> NavResult<Ensemble> {
        (**self).decode(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pd0::builder::EnsembleBuilder;
    use crate::pd0::encoder::encode;
    use crate::prelude::ErrorKind;

    fn valid_frame() -> Vec<u8> {
        EnsembleBuilder::new(3)
            .ensemble_number(42)
            .uniform_velocity([1000, -500, 20, 3])
            .bottom_velocity([250, 125, 0, 0], 30.0)
            .encode()
            .unwrap()
    }

    /// Rewrites the checksum so structural corruption is reached.
    fn reseal(frame: &mut Vec<u8>) {
        let byte_count = usize::from(u16::from_le_bytes([frame[2], frame[3]]));
        let sum = compute_checksum(&frame[..byte_count]);
        frame[byte_count..byte_count + 2].copy_from_slice(&sum.to_le_bytes());
    }

    #[test]
    fn decodes_every_known_block() {
        let ensemble = Pd0Decoder::new().decode(&valid_frame()).unwrap();
        assert_eq!(ensemble.ensemble_number(), 42);
        assert_eq!(ensemble.num_bins(), 3);
        assert_eq!(ensemble.header.offsets.len(), 7);
        assert_eq!(ensemble.water_profile.num_bins(), 3);
        assert_eq!(ensemble.water_profile.velocity_mps(2, 1, i16::MIN), Some(-0.5));
        let bottom = ensemble.bottom_track.as_ref().unwrap();
        assert_eq!(bottom.velocity_mps(0, i16::MIN), Some(0.25));
        assert!(bottom.range_valid(3));
        assert!(ensemble.skipped_blocks.is_empty());
        assert!(ensemble.transform.is_none());
    }

    #[test]
    fn decode_then_encode_is_byte_exact() {
        let frame = valid_frame();
        let ensemble = Pd0Decoder::new().decode(&frame).unwrap();
        assert_eq!(encode(&ensemble).unwrap(), frame);
    }

    #[test]
    fn wrong_marker_is_framing_error() {
        let mut frame = valid_frame();
        frame[1] = 0x7E;
        let err = Pd0Decoder::new().decode(&frame).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Framing);
    }

    #[test]
    fn truncated_buffer_is_framing_error() {
        let frame = valid_frame();
        let err = Pd0Decoder::new()
            .decode(&frame[..frame.len() - 1])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Framing);
        assert_eq!(
            Pd0Decoder::new().decode(&[0x7F]).unwrap_err().kind(),
            ErrorKind::Framing
        );
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut frame = valid_frame();
        frame.extend_from_slice(&[0xAA, 0xBB]);
        assert!(Pd0Decoder::new().decode(&frame).is_ok());
    }

    #[test]
    fn any_single_payload_byte_flip_is_a_checksum_error() {
        let frame = valid_frame();
        let byte_count = usize::from(u16::from_le_bytes([frame[2], frame[3]]));
        for at in HEADER_FIXED_LEN..byte_count {
            let mut corrupt = frame.clone();
            corrupt[at] ^= 0x01;
            let err = Pd0Decoder::new().decode(&corrupt).unwrap_err();
            assert!(
                matches!(err, NavError::Checksum { .. }),
                "byte {} gave {:?}",
                at,
                err
            );
        }
    }

    #[test]
    fn decreasing_offsets_are_offset_errors() {
        let mut frame = valid_frame();
        frame.swap(8, 10);
        frame.swap(9, 11);
        reseal(&mut frame);
        let err = Pd0Decoder::new().decode(&frame).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Offset);
    }

    #[test]
    fn offset_past_byte_count_is_offset_error() {
        let mut frame = valid_frame();
        frame[HEADER_FIXED_LEN..HEADER_FIXED_LEN + 2].copy_from_slice(&0xFFF0u16.to_le_bytes());
        reseal(&mut frame);
        let err = Pd0Decoder::new().decode(&frame).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Offset);
    }

    #[test]
    fn unknown_blocks_are_skipped() {
        let mut frame = valid_frame();
        let bt_offset = usize::from(u16::from_le_bytes([frame[18], frame[19]]));
        frame[bt_offset..bt_offset + 2].copy_from_slice(&0x3000u16.to_le_bytes());
        reseal(&mut frame);
        let ensemble = Pd0Decoder::new().decode(&frame).unwrap();
        assert!(ensemble.bottom_track.is_none());
        assert_eq!(
            ensemble.skipped_blocks,
            vec![SkippedBlock {
                id: 0x3000,
                offset: bt_offset,
                len: 81
            }]
        );
    }

    #[test]
    fn bottom_track_is_optional() {
        let frame = EnsembleBuilder::new(2).encode().unwrap();
        let ensemble = Pd0Decoder::new().decode(&frame).unwrap();
        assert!(ensemble.bottom_track.is_none());
        assert_eq!(ensemble.header.offsets.len(), 6);
    }

    #[test]
    fn missing_variable_leader_is_offset_error() {
        let mut frame = valid_frame();
        let vl_offset = usize::from(u16::from_le_bytes([frame[8], frame[9]]));
        frame[vl_offset..vl_offset + 2].copy_from_slice(&0x5555u16.to_le_bytes());
        reseal(&mut frame);
        let err = Pd0Decoder::new().decode(&frame).unwrap_err();
        assert!(matches!(err, NavError::Offset(_)));
    }

    fn decode_with<D: EnsembleDecoder>(decoder: D, frame: &[u8]) -> NavResult<Ensemble> {
        decoder.decode(frame)
    }

    #[test]
    fn decoder_is_usable_through_a_reference() {
        let decoder = Pd0Decoder::new();
        let by_ref: &dyn EnsembleDecoder = &decoder;
        assert_eq!(by_ref.family(), "pd0");
        assert!(decode_with(by_ref, &valid_frame()).is_ok());
        assert!(decode_with(&decoder, &valid_frame()).is_ok());
    }
}
