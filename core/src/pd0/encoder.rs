use super::checksum::compute_checksum;
use super::decoder::{CHECKSUM_LEN, HEADER_FIXED_LEN, HEADER_ID};
use super::ensemble::Ensemble;
use crate::prelude::{NavError, NavResult};

/// Serialises an ensemble in canonical block order.
///
/// Fixed leader, variable leader, velocity, correlation, echo intensity,
/// percent good, then bottom track; absent blocks are left out. Offsets,
/// byte count and checksum are recomputed, so the stored header is ignored.
///
/// Only decoded fields are written. Skipped blocks, reserved leader bytes
/// and any variable-leader padding beyond 56 bytes (77 with health
/// readings) are dropped, so a recording re-encodes byte for byte only when
/// it was already canonical, as frames from `EnsembleBuilder` are.
pub fn encode(ensemble: &Ensemble) -> NavResult<Vec<u8>> {
    let mut blocks = vec![
        ensemble.fixed_leader.encode(),
        ensemble.variable_leader.encode(),
    ];
    blocks.extend(ensemble.water_profile.encode_blocks());
    if let Some(bottom) = &ensemble.bottom_track {
        blocks.push(bottom.encode());
    }

    let num_blocks = u8::try_from(blocks.len()).map_err(|_| NavError::InvalidField {
        block: "header",
        field: "num_blocks",
        value: blocks.len().to_string(),
    })?;
    let header_len = HEADER_FIXED_LEN + 2 * blocks.len();
    let byte_count = header_len + blocks.iter().map(Vec::len).sum::<usize>();
    let byte_count_word = u16::try_from(byte_count).map_err(|_| NavError::InvalidField {
        block: "header",
        field: "byte_count",
        value: byte_count.to_string(),
    })?;

    let mut frame = Vec::with_capacity(byte_count + CHECKSUM_LEN);
    frame.extend_from_slice(&HEADER_ID.to_le_bytes());
    frame.extend_from_slice(&byte_count_word.to_le_bytes());
    frame.push(0);
    frame.push(num_blocks);

    let mut offset = header_len;
    for block in &blocks {
        frame.extend_from_slice(&(offset as u16).to_le_bytes());
        offset += block.len();
    }
    for block in &blocks {
        frame.extend_from_slice(block);
    }

    let checksum = compute_checksum(&frame);
    frame.extend_from_slice(&checksum.to_le_bytes());
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pd0::builder::EnsembleBuilder;
    use crate::pd0::bottom_track::BOTTOM_TRACK_LEN;
    use crate::pd0::leader::{FIXED_LEADER_LEN, VARIABLE_LEADER_MIN_LEN};
    use crate::pd0::{Pd0Decoder, SkippedBlock};
    use crate::prelude::EnsembleDecoder;
    use ndarray::Array2;

    #[test]
    fn header_describes_the_written_blocks() {
        let frame = EnsembleBuilder::new(1)
            .bottom_velocity([10, 20, 30, 40], 12.5)
            .encode()
            .unwrap();
        let velocity_len = 2 + 2 * 4;
        let array_len = 2 + 4;
        let expected = HEADER_FIXED_LEN
            + 2 * 7
            + FIXED_LEADER_LEN
            + VARIABLE_LEADER_MIN_LEN
            + velocity_len
            + 3 * array_len
            + BOTTOM_TRACK_LEN;
        assert_eq!(u16::from_le_bytes([frame[2], frame[3]]) as usize, expected);
        assert_eq!(frame.len(), expected + CHECKSUM_LEN);
        assert_eq!(frame[5], 7);
        assert_eq!(u16::from_le_bytes([frame[6], frame[7]]), 20);
        assert_eq!(
            u16::from_le_bytes([frame[8], frame[9]]) as usize,
            20 + FIXED_LEADER_LEN
        );
    }

    #[test]
    fn built_ensemble_survives_a_round_trip() {
        let original = EnsembleBuilder::new(4)
            .ensemble_number(7)
            .attitude(271.25, -1.5, 0.75)
            .pressure(123_450.0)
            .uniform_velocity([150, -75, 5, 1])
            .cell_velocity(2, 0, i16::MIN)
            .bottom_velocity([300, -120, 2, 0], 41.37)
            .build();
        let frame = encode(&original).unwrap();
        let decoded = Pd0Decoder::new().decode(&frame).unwrap();
        assert_eq!(decoded.fixed_leader, original.fixed_leader);
        assert_eq!(decoded.variable_leader, original.variable_leader);
        assert_eq!(decoded.water_profile, original.water_profile);
        assert_eq!(decoded.bottom_track, original.bottom_track);
        assert_eq!(encode(&decoded).unwrap(), frame);
    }

    #[test]
    fn skipped_blocks_are_not_written_back() {
        let canonical = EnsembleBuilder::new(2).build();
        let mut with_unknown = canonical.clone();
        with_unknown.skipped_blocks.push(SkippedBlock {
            id: 0x3000,
            offset: 200,
            len: 12,
        });
        let frame = encode(&with_unknown).unwrap();
        assert_eq!(frame, encode(&canonical).unwrap());
        let decoded = Pd0Decoder::new().decode(&frame).unwrap();
        assert!(decoded.skipped_blocks.is_empty());
    }

    #[test]
    fn oversized_ensemble_is_refused() {
        let mut ensemble = EnsembleBuilder::new(1).build();
        ensemble.water_profile.velocity = Some(Array2::zeros((200, 200)));
        assert!(matches!(
            encode(&ensemble),
            Err(NavError::InvalidField {
                field: "byte_count",
                ..
            })
        ));
    }
}
