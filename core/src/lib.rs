//! Decoding and dead reckoning for glider-mounted Doppler velocity logs.
//!
//! Binary PD0 ensembles are decoded, classified by coordinate frame, given a
//! rollover-corrected index and integrated into a running position estimate.
//! The same pipeline serves offline replay and one-buffer-at-a-time
//! streaming.

pub mod math;
pub mod pd0;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use pd0::{Ensemble, EnsembleBuilder, Pd0Decoder};
pub use prelude::{EnsembleDecoder, NavConfig, NavError, NavResult};
pub use processing::{BatchReport, StreamingSession, TimeSeries};
