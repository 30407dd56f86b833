//! Splits a contiguous PD0 recording into per-ensemble buffers.
//!
//! The core expects every buffer to start on an ensemble boundary, so this
//! reader scans for the `0x7F 0x7F` marker and slices by the declared byte
//! count. It does not verify checksums; a damaged frame is still handed on
//! so the core can report it.

use anyhow::Context;
use std::fs;
use std::path::Path;

const MARKER: [u8; 2] = [0x7F, 0x7F];
const MIN_HEADER: usize = 6;
const CHECKSUM_LEN: usize = 2;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FrameSplit {
    pub frames: Vec<Vec<u8>>,
    /// Bytes skipped while looking for a marker, including a truncated tail.
    pub skipped_bytes: usize,
}

pub fn split_frames(bytes: &[u8]) -> FrameSplit {
    let mut split = FrameSplit::default();
    let mut cursor = 0;

    while cursor < bytes.len() {
        let rest = &bytes[cursor..];
        if rest.len() < MIN_HEADER {
            split.skipped_bytes += rest.len();
            break;
        }
        if rest[..2] != MARKER {
            cursor += 1;
            split.skipped_bytes += 1;
            continue;
        }
        let byte_count = usize::from(u16::from_le_bytes([rest[2], rest[3]]));
        let frame_len = byte_count + CHECKSUM_LEN;
        if byte_count < MIN_HEADER || frame_len > rest.len() {
            // false marker or truncated final frame
            cursor += 1;
            split.skipped_bytes += 1;
            continue;
        }
        split.frames.push(rest[..frame_len].to_vec());
        cursor += frame_len;
    }
    split
}

pub fn read_frames<P: AsRef<Path>>(path: P) -> anyhow::Result<FrameSplit> {
    let path_ref = path.as_ref();
    let bytes = fs::read(path_ref)
        .with_context(|| format!("reading PD0 recording {}", path_ref.display()))?;
    Ok(split_frames(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvlcore::EnsembleBuilder;

    fn frame(number: u16) -> Vec<u8> {
        EnsembleBuilder::new(2)
            .ensemble_number(number)
            .encode()
            .unwrap()
    }

    #[test]
    fn splits_back_to_back_frames() {
        let mut recording = frame(1);
        recording.extend(frame(2));
        let split = split_frames(&recording);
        assert_eq!(split.frames, vec![frame(1), frame(2)]);
        assert_eq!(split.skipped_bytes, 0);
    }

    #[test]
    fn resynchronises_after_garbage() {
        let mut recording = vec![0x00, 0x7F, 0x13, 0x37];
        recording.extend(frame(1));
        recording.extend(frame(2));
        let split = split_frames(&recording);
        assert_eq!(split.frames.len(), 2);
        assert_eq!(split.skipped_bytes, 4);
    }

    #[test]
    fn truncated_tail_is_skipped() {
        let mut recording = frame(1);
        let second = frame(2);
        recording.extend_from_slice(&second[..second.len() - 10]);
        let split = split_frames(&recording);
        assert_eq!(split.frames.len(), 1);
        assert_eq!(split.skipped_bytes, second.len() - 10);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(read_frames("/nonexistent/recording.pd0").is_err());
    }
}
