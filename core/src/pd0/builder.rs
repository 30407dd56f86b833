//! Programmatic construction of ensembles for synthetic missions and tests.

use chrono::{DateTime, TimeZone, Utc};
use ndarray::Array2;

use super::bitfield::{BitField16, BitField8};
use super::bottom_track::BottomTrack;
use super::encoder::encode;
use super::ensemble::{Ensemble, EnsembleHeader};
use super::leader::{ClockInterval, FixedLeader, VariableLeader};
use super::profile::WaterProfile;
use crate::prelude::NavResult;

pub const DEFAULT_BEAMS: u8 = 4;
/// Earth frame with tilts, three-beam solutions and bin mapping.
pub const EARTH_COORDINATES: u8 = 0b1_1111;

/// Builds a well-formed ensemble: a 600 kHz four-beam instrument reporting
/// Earth coordinates with every quality array at full marks.
#[derive(Debug, Clone)]
pub struct EnsembleBuilder {
    ensemble: Ensemble,
}

impl EnsembleBuilder {
    pub fn new(num_bins: u8) -> Self {
        let beams = usize::from(DEFAULT_BEAMS);
        let cells = (usize::from(num_bins), beams);
        let fixed_leader = FixedLeader {
            firmware_version: 51,
            firmware_revision: 41,
            system_configuration: BitField16::from(0x424Bu16),
            simulation_flag: 0,
            lag_length: 13,
            num_beams: DEFAULT_BEAMS,
            num_bins,
            pings_per_ensemble: 1,
            depth_bin_length: 2.0,
            blanking_distance: 0.44,
            profiling_mode: 1,
            low_correlation_threshold: 64,
            code_repetitions: 5,
            percent_good_minimum: 50,
            error_velocity_threshold: 2.0,
            time_between_pings: ClockInterval {
                minutes: 0,
                seconds: 1,
                hundredths: 0,
            },
            coordinate_transformation: BitField8::from(EARTH_COORDINATES),
            heading_alignment: 0.0,
            heading_bias: 0.0,
            sensor_source: BitField8::from(0b0111_1101u8),
            sensor_available: BitField8::from(0b0011_1101u8),
            bin1_distance: 3.18,
            transmit_pulse_length: 2.52,
            starting_depth_cell: 1,
            ending_depth_cell: num_bins,
            false_target_threshold: 50,
            transmit_lag_distance: 0.49,
            system_bandwidth: 0,
            serial_number: 12_345,
        };
        let variable_leader = VariableLeader {
            ensemble_number: 1,
            timestamp: Utc
                .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
                .single()
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            ensemble_rollover: 0,
            bit_result: BitField16::from(0u16),
            speed_of_sound: 1500,
            transducer_depth: 0.0,
            heading: 0.0,
            pitch: 0.0,
            roll: 0.0,
            salinity: 35,
            temperature: 15.0,
            min_ping_wait: ClockInterval {
                minutes: 0,
                seconds: 0,
                hundredths: 0,
            },
            heading_std_dev: 0,
            pitch_std_dev: 0.0,
            roll_std_dev: 0.0,
            adc_rounded_voltage: 0,
            pressure: 0.0,
            pressure_variance: 0.0,
            health: None,
        };
        let water_profile = WaterProfile {
            velocity: Some(Array2::zeros(cells)),
            correlation: Some(Array2::from_elem(cells, 100)),
            echo_intensity: Some(Array2::from_elem(cells, 80)),
            percent_good: Some(Array2::from_elem(cells, 100)),
        };

        Self {
            ensemble: Ensemble {
                header: EnsembleHeader {
                    byte_count: 0,
                    offsets: Vec::new(),
                },
                fixed_leader,
                variable_leader,
                water_profile,
                bottom_track: None,
                skipped_blocks: Vec::new(),
                transform: None,
                logical_index: None,
                derived: None,
            },
        }
    }

    pub fn ensemble_number(mut self, number: u16) -> Self {
        self.ensemble.variable_leader.ensemble_number = number;
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.ensemble.variable_leader.timestamp = timestamp;
        self
    }

    /// Degrees.
    pub fn attitude(mut self, heading: f64, pitch: f64, roll: f64) -> Self {
        let leader = &mut self.ensemble.variable_leader;
        leader.heading = heading;
        leader.pitch = pitch;
        leader.roll = roll;
        self
    }

    /// Pascals; the wire resolution is 10 Pa.
    pub fn pressure(mut self, pressure_pa: f64) -> Self {
        self.ensemble.variable_leader.pressure = pressure_pa;
        self
    }

    pub fn coordinate_transformation(mut self, bits: u8) -> Self {
        self.ensemble.fixed_leader.coordinate_transformation = BitField8::from(bits);
        self
    }

    pub fn percent_good_minimum(mut self, minimum: u8) -> Self {
        self.ensemble.fixed_leader.percent_good_minimum = minimum;
        self
    }

    pub fn low_correlation_threshold(mut self, threshold: u8) -> Self {
        self.ensemble.fixed_leader.low_correlation_threshold = threshold;
        self
    }

    /// Same raw mm/s components in every bin.
    pub fn uniform_velocity(mut self, components: [i16; 4]) -> Self {
        if let Some(velocity) = self.ensemble.water_profile.velocity.as_mut() {
            for mut row in velocity.rows_mut() {
                for (cell, &value) in row.iter_mut().zip(components.iter()) {
                    *cell = value;
                }
            }
        }
        self
    }

    /// Overrides one cell; out-of-range cells are ignored.
    pub fn cell_velocity(mut self, bin: usize, beam: usize, raw: i16) -> Self {
        if let Some(cell) = self
            .ensemble
            .water_profile
            .velocity
            .as_mut()
            .and_then(|velocity| velocity.get_mut([bin, beam]))
        {
            *cell = raw;
        }
        self
    }

    pub fn uniform_quality(mut self, correlation: u8, percent_good: u8) -> Self {
        let profile = &mut self.ensemble.water_profile;
        if let Some(array) = profile.correlation.as_mut() {
            array.fill(correlation);
        }
        if let Some(array) = profile.percent_good.as_mut() {
            array.fill(percent_good);
        }
        self
    }

    pub fn without_percent_good(mut self) -> Self {
        self.ensemble.water_profile.percent_good = None;
        self
    }

    /// Adds a bottom-track block seeing the seafloor on every beam.
    pub fn bottom_velocity(mut self, components: [i16; 4], range_m: f64) -> Self {
        self.ensemble.bottom_track = Some(BottomTrack {
            range: [range_m; 4],
            velocity: components,
            correlation: [250; 4],
            echo_intensity: [120; 4],
            percent_good: [100; 4],
            max_tracking_depth: 200.0,
            rssi: [90; 4],
            ..BottomTrack::default()
        });
        self
    }

    pub fn build(self) -> Ensemble {
        self.ensemble
    }

    pub fn encode(self) -> NavResult<Vec<u8>> {
        encode(&self.ensemble)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_an_earth_frame_instrument() {
        let ensemble = EnsembleBuilder::new(5).build();
        assert_eq!(ensemble.num_beams(), 4);
        assert_eq!(ensemble.num_bins(), 5);
        assert_eq!(ensemble.fixed_leader.system().frequency_khz(), Some(600));
        assert_eq!(
            ensemble.fixed_leader.coordinate_transformation.raw(),
            u32::from(EARTH_COORDINATES)
        );
        assert_eq!(ensemble.water_profile.num_bins(), 5);
    }

    #[test]
    fn cell_override_only_touches_one_cell() {
        let ensemble = EnsembleBuilder::new(2)
            .uniform_velocity([10, 20, 30, 40])
            .cell_velocity(1, 1, -1)
            .cell_velocity(9, 9, 5)
            .build();
        let velocity = ensemble.water_profile.velocity.unwrap();
        assert_eq!(velocity[[0, 1]], 20);
        assert_eq!(velocity[[1, 1]], -1);
        assert_eq!(velocity[[1, 3]], 40);
    }
}
