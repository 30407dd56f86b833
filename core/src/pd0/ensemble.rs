use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bottom_track::BottomTrack;
use super::leader::{FixedLeader, VariableLeader};
use super::profile::WaterProfile;
use crate::processing::coordinate::CoordinateTransform;
use crate::processing::navigation::DerivedFields;

/// Block whose id this decoder does not know; kept as a marker only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedBlock {
    pub id: u16,
    pub offset: usize,
    pub len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsembleHeader {
    /// Bytes covered by the checksum.
    pub byte_count: u16,
    pub offsets: Vec<u16>,
}

/// One decoded ensemble together with what later stages attach to it.
///
/// `transform` is filled by the coordinate resolver, `logical_index` and
/// `derived` once the ensemble is accepted into a time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ensemble {
    pub header: EnsembleHeader,
    pub fixed_leader: FixedLeader,
    pub variable_leader: VariableLeader,
    pub water_profile: WaterProfile,
    pub bottom_track: Option<BottomTrack>,
    pub skipped_blocks: Vec<SkippedBlock>,
    pub transform: Option<CoordinateTransform>,
    pub logical_index: Option<u64>,
    pub derived: Option<DerivedFields>,
}

impl Ensemble {
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.variable_leader.timestamp
    }

    /// Instrument-reported 16-bit sequence number.
    pub fn ensemble_number(&self) -> u16 {
        self.variable_leader.ensemble_number
    }

    pub fn num_beams(&self) -> usize {
        usize::from(self.fixed_leader.num_beams)
    }

    pub fn num_bins(&self) -> usize {
        usize::from(self.fixed_leader.num_bins)
    }

    /// Full frame length including the trailing checksum.
    pub fn encoded_len(&self) -> usize {
        usize::from(self.header.byte_count) + 2
    }
}
