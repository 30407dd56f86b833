//! PD0 binary ensembles: block layouts, decoding and encoding.

pub mod bitfield;
pub mod bottom_track;
pub mod builder;
mod bytes;
pub mod checksum;
pub mod decoder;
pub mod encoder;
pub mod ensemble;
pub mod flags;
pub mod leader;
pub mod profile;

pub use bitfield::{BitField, BitField16, BitField8};
pub use bottom_track::BottomTrack;
pub use builder::EnsembleBuilder;
pub use decoder::Pd0Decoder;
pub use encoder::encode;
pub use ensemble::{Ensemble, EnsembleHeader, SkippedBlock};
pub use leader::{ClockInterval, FixedLeader, HealthReadings, VariableLeader};
pub use profile::WaterProfile;
