use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::bitfield::{BitField16, BitField8};
use super::bytes::{unscale_i16, unscale_u16, unscale_u32, BlockReader, BlockWriter};
use super::flags::{BitResult, SensorFlags, SystemConfiguration};
use crate::math::units::{
    CM_PER_M, DM_PER_M, HUNDREDTHS, MM_PER_M, PA_PER_DAPA, TENTHS, THOUSANDTHS,
};
use crate::prelude::{NavError, NavResult};

pub const FIXED_LEADER_ID: u16 = 0x0000;
pub const VARIABLE_LEADER_ID: u16 = 0x0080;
pub const FIXED_LEADER_LEN: usize = 58;
pub const VARIABLE_LEADER_MIN_LEN: usize = 56;
pub const VARIABLE_LEADER_FULL_LEN: usize = 77;

const RTC_CENTURY: i32 = 2000;

/// Minutes / seconds / hundredths triple used for ping timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClockInterval {
    pub minutes: u8,
    pub seconds: u8,
    pub hundredths: u8,
}

impl ClockInterval {
    pub fn as_secs_f64(&self) -> f64 {
        f64::from(self.minutes) * 60.0
            + f64::from(self.seconds)
            + f64::from(self.hundredths) / 100.0
    }

    fn read(reader: &BlockReader<'_>, at: usize) -> NavResult<Self> {
        Ok(Self {
            minutes: reader.u8(at)?,
            seconds: reader.u8(at + 1)?,
            hundredths: reader.u8(at + 2)?,
        })
    }

    fn write(&self, writer: &mut BlockWriter, at: usize) {
        writer.put_u8(at, self.minutes);
        writer.put_u8(at + 1, self.seconds);
        writer.put_u8(at + 2, self.hundredths);
    }
}

/// Deployment configuration, re-read with every ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedLeader {
    pub firmware_version: u8,
    pub firmware_revision: u8,
    pub system_configuration: BitField16,
    pub simulation_flag: u8,
    pub lag_length: u8,
    pub num_beams: u8,
    pub num_bins: u8,
    pub pings_per_ensemble: u16,
    /// m
    pub depth_bin_length: f64,
    /// m
    pub blanking_distance: f64,
    pub profiling_mode: u8,
    pub low_correlation_threshold: u8,
    pub code_repetitions: u8,
    pub percent_good_minimum: u8,
    /// m/s
    pub error_velocity_threshold: f64,
    pub time_between_pings: ClockInterval,
    pub coordinate_transformation: BitField8,
    /// deg
    pub heading_alignment: f64,
    /// deg
    pub heading_bias: f64,
    pub sensor_source: BitField8,
    pub sensor_available: BitField8,
    /// m
    pub bin1_distance: f64,
    /// m
    pub transmit_pulse_length: f64,
    pub starting_depth_cell: u8,
    pub ending_depth_cell: u8,
    pub false_target_threshold: u8,
    /// m
    pub transmit_lag_distance: f64,
    pub system_bandwidth: u16,
    pub serial_number: u32,
}

impl FixedLeader {
    pub(crate) fn decode(reader: &BlockReader<'_>) -> NavResult<Self> {
        let leader = Self {
            firmware_version: reader.u8(2)?,
            firmware_revision: reader.u8(3)?,
            system_configuration: BitField16::from(reader.u16(4)?),
            simulation_flag: reader.u8(6)?,
            lag_length: reader.u8(7)?,
            num_beams: reader.u8(8)?,
            num_bins: reader.u8(9)?,
            pings_per_ensemble: reader.u16(10)?,
            depth_bin_length: f64::from(reader.u16(12)?) / CM_PER_M,
            blanking_distance: f64::from(reader.u16(14)?) / CM_PER_M,
            profiling_mode: reader.u8(16)?,
            low_correlation_threshold: reader.u8(17)?,
            code_repetitions: reader.u8(18)?,
            percent_good_minimum: reader.u8(19)?,
            error_velocity_threshold: f64::from(reader.u16(20)?) / MM_PER_M,
            time_between_pings: ClockInterval::read(reader, 22)?,
            coordinate_transformation: BitField8::from(reader.u8(25)?),
            heading_alignment: f64::from(reader.i16(26)?) / HUNDREDTHS,
            heading_bias: f64::from(reader.i16(28)?) / HUNDREDTHS,
            sensor_source: BitField8::from(reader.u8(30)?),
            sensor_available: BitField8::from(reader.u8(31)?),
            bin1_distance: f64::from(reader.u16(32)?) / CM_PER_M,
            transmit_pulse_length: f64::from(reader.u16(34)?) / CM_PER_M,
            starting_depth_cell: reader.u8(36)?,
            ending_depth_cell: reader.u8(37)?,
            false_target_threshold: reader.u8(38)?,
            transmit_lag_distance: f64::from(reader.u16(40)?) / CM_PER_M,
            system_bandwidth: reader.u16(50)?,
            serial_number: reader.u32(54)?,
        };
        if leader.num_beams == 0 {
            return Err(NavError::InvalidField {
                block: "fixed leader",
                field: "num_beams",
                value: "0".into(),
            });
        }
        Ok(leader)
    }

    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut w = BlockWriter::with_len(FIXED_LEADER_LEN);
        w.put_u16(0, FIXED_LEADER_ID);
        w.put_u8(2, self.firmware_version);
        w.put_u8(3, self.firmware_revision);
        w.put_u16(4, self.system_configuration.raw() as u16);
        w.put_u8(6, self.simulation_flag);
        w.put_u8(7, self.lag_length);
        w.put_u8(8, self.num_beams);
        w.put_u8(9, self.num_bins);
        w.put_u16(10, self.pings_per_ensemble);
        w.put_u16(12, unscale_u16(self.depth_bin_length, CM_PER_M));
        w.put_u16(14, unscale_u16(self.blanking_distance, CM_PER_M));
        w.put_u8(16, self.profiling_mode);
        w.put_u8(17, self.low_correlation_threshold);
        w.put_u8(18, self.code_repetitions);
        w.put_u8(19, self.percent_good_minimum);
        w.put_u16(20, unscale_u16(self.error_velocity_threshold, MM_PER_M));
        self.time_between_pings.write(&mut w, 22);
        w.put_u8(25, self.coordinate_transformation.raw() as u8);
        w.put_i16(26, unscale_i16(self.heading_alignment, HUNDREDTHS));
        w.put_i16(28, unscale_i16(self.heading_bias, HUNDREDTHS));
        w.put_u8(30, self.sensor_source.raw() as u8);
        w.put_u8(31, self.sensor_available.raw() as u8);
        w.put_u16(32, unscale_u16(self.bin1_distance, CM_PER_M));
        w.put_u16(34, unscale_u16(self.transmit_pulse_length, CM_PER_M));
        w.put_u8(36, self.starting_depth_cell);
        w.put_u8(37, self.ending_depth_cell);
        w.put_u8(38, self.false_target_threshold);
        w.put_u16(40, unscale_u16(self.transmit_lag_distance, CM_PER_M));
        w.put_u16(50, self.system_bandwidth);
        w.put_u32(54, self.serial_number);
        w.into_inner()
    }

    pub fn system(&self) -> SystemConfiguration {
        SystemConfiguration::new(self.system_configuration)
    }

    pub fn sensors_in_use(&self) -> SensorFlags {
        SensorFlags::new(self.sensor_source)
    }

    pub fn sensors_available(&self) -> SensorFlags {
        SensorFlags::new(self.sensor_available)
    }

    /// Number of cells in one profiling array.
    pub fn cell_count(&self) -> usize {
        usize::from(self.num_bins) * usize::from(self.num_beams)
    }

    /// Range from the transducer to the centre of `bin` (0-based), in metres.
    pub fn bin_center_distance(&self, bin: usize) -> f64 {
        self.bin1_distance + bin as f64 * self.depth_bin_length
    }
}

/// Optional trailing health readings; older firmware omits them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthReadings {
    pub health_status: u8,
    pub leak_a_count: u16,
    pub leak_b_count: u16,
    /// V
    pub transducer_voltage: f64,
    /// A
    pub transducer_current: f64,
    /// ohm
    pub transducer_impedance: f64,
}

/// Per-ensemble instantaneous readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableLeader {
    pub ensemble_number: u16,
    pub timestamp: DateTime<Utc>,
    pub ensemble_rollover: u8,
    pub bit_result: BitField16,
    /// m/s
    pub speed_of_sound: u16,
    /// m
    pub transducer_depth: f64,
    /// deg
    pub heading: f64,
    /// deg
    pub pitch: f64,
    /// deg
    pub roll: f64,
    /// ppt
    pub salinity: u16,
    /// deg C
    pub temperature: f64,
    pub min_ping_wait: ClockInterval,
    pub heading_std_dev: u8,
    /// deg
    pub pitch_std_dev: f64,
    /// deg
    pub roll_std_dev: f64,
    pub adc_rounded_voltage: u8,
    /// Pa
    pub pressure: f64,
    /// Pa
    pub pressure_variance: f64,
    pub health: Option<HealthReadings>,
}

impl VariableLeader {
    pub(crate) fn decode(reader: &BlockReader<'_>) -> NavResult<Self> {
        let health = if reader.has(66, VARIABLE_LEADER_FULL_LEN - 66) {
            Some(HealthReadings {
                health_status: reader.u8(66)?,
                leak_a_count: reader.u16(67)?,
                leak_b_count: reader.u16(69)?,
                transducer_voltage: f64::from(reader.u16(71)?) / THOUSANDTHS,
                transducer_current: f64::from(reader.u16(73)?) / THOUSANDTHS,
                transducer_impedance: f64::from(reader.u16(75)?) / THOUSANDTHS,
            })
        } else {
            None
        };

        Ok(Self {
            ensemble_number: reader.u16(2)?,
            timestamp: decode_rtc(reader)?,
            ensemble_rollover: reader.u8(11)?,
            bit_result: BitField16::from(reader.u16(12)?),
            speed_of_sound: reader.u16(14)?,
            transducer_depth: f64::from(reader.u16(16)?) / DM_PER_M,
            heading: f64::from(reader.u16(18)?) / HUNDREDTHS,
            pitch: f64::from(reader.i16(20)?) / HUNDREDTHS,
            roll: f64::from(reader.i16(22)?) / HUNDREDTHS,
            salinity: reader.u16(24)?,
            temperature: f64::from(reader.i16(26)?) / HUNDREDTHS,
            min_ping_wait: ClockInterval::read(reader, 28)?,
            heading_std_dev: reader.u8(31)?,
            pitch_std_dev: f64::from(reader.u8(32)?) / TENTHS,
            roll_std_dev: f64::from(reader.u8(33)?) / TENTHS,
            adc_rounded_voltage: reader.u8(35)?,
            pressure: f64::from(reader.u32(48)?) * PA_PER_DAPA,
            pressure_variance: f64::from(reader.u32(52)?) * PA_PER_DAPA,
            health,
        })
    }

    pub(crate) fn encode(&self) -> Vec<u8> {
        let len = if self.health.is_some() {
            VARIABLE_LEADER_FULL_LEN
        } else {
            VARIABLE_LEADER_MIN_LEN
        };
        let mut w = BlockWriter::with_len(len);
        w.put_u16(0, VARIABLE_LEADER_ID);
        w.put_u16(2, self.ensemble_number);
        encode_rtc(&mut w, &self.timestamp);
        w.put_u8(11, self.ensemble_rollover);
        w.put_u16(12, self.bit_result.raw() as u16);
        w.put_u16(14, self.speed_of_sound);
        w.put_u16(16, unscale_u16(self.transducer_depth, DM_PER_M));
        w.put_u16(18, unscale_u16(self.heading, HUNDREDTHS));
        w.put_i16(20, unscale_i16(self.pitch, HUNDREDTHS));
        w.put_i16(22, unscale_i16(self.roll, HUNDREDTHS));
        w.put_u16(24, self.salinity);
        w.put_i16(26, unscale_i16(self.temperature, HUNDREDTHS));
        self.min_ping_wait.write(&mut w, 28);
        w.put_u8(31, self.heading_std_dev);
        w.put_u8(32, unscale_u16(self.pitch_std_dev, TENTHS) as u8);
        w.put_u8(33, unscale_u16(self.roll_std_dev, TENTHS) as u8);
        w.put_u8(35, self.adc_rounded_voltage);
        w.put_u32(48, unscale_u32(self.pressure, 1.0 / PA_PER_DAPA));
        w.put_u32(52, unscale_u32(self.pressure_variance, 1.0 / PA_PER_DAPA));
        if let Some(health) = &self.health {
            w.put_u8(66, health.health_status);
            w.put_u16(67, health.leak_a_count);
            w.put_u16(69, health.leak_b_count);
            w.put_u16(71, unscale_u16(health.transducer_voltage, THOUSANDTHS));
            w.put_u16(73, unscale_u16(health.transducer_current, THOUSANDTHS));
            w.put_u16(75, unscale_u16(health.transducer_impedance, THOUSANDTHS));
        }
        w.into_inner()
    }

    pub fn bit(&self) -> BitResult {
        BitResult::new(self.bit_result)
    }
}

fn decode_rtc(reader: &BlockReader<'_>) -> NavResult<DateTime<Utc>> {
    let year = RTC_CENTURY + i32::from(reader.u8(4)?);
    let month = u32::from(reader.u8(5)?);
    let day = u32::from(reader.u8(6)?);
    let hour = u32::from(reader.u8(7)?);
    let minute = u32::from(reader.u8(8)?);
    let second = u32::from(reader.u8(9)?);
    let hundredths = u32::from(reader.u8(10)?);

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_milli_opt(hour, minute, second, hundredths * 10))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| NavError::InvalidField {
            block: "variable leader",
            field: "rtc",
            value: format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:02}",
                year, month, day, hour, minute, second, hundredths
            ),
        })
}

fn encode_rtc(w: &mut BlockWriter, timestamp: &DateTime<Utc>) {
    w.put_u8(4, (timestamp.year() - RTC_CENTURY).clamp(0, 255) as u8);
    w.put_u8(5, timestamp.month() as u8);
    w.put_u8(6, timestamp.day() as u8);
    w.put_u8(7, timestamp.hour() as u8);
    w.put_u8(8, timestamp.minute() as u8);
    w.put_u8(9, timestamp.second() as u8);
    w.put_u8(10, (timestamp.nanosecond() / 10_000_000).min(99) as u8);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fixed_leader_bytes() -> Vec<u8> {
        let mut bytes = vec![0u8; FIXED_LEADER_LEN];
        bytes[8] = 4; // beams
        bytes[9] = 40; // bins
        bytes[12..14].copy_from_slice(&200u16.to_le_bytes()); // 2 m bins
        bytes[19] = 50; // percent good minimum
        bytes[20..22].copy_from_slice(&2000u16.to_le_bytes()); // 2 m/s
        bytes[25] = 0b11111;
        bytes[26..28].copy_from_slice(&(-4500i16).to_le_bytes());
        bytes[32..34].copy_from_slice(&291u16.to_le_bytes());
        bytes[54..58].copy_from_slice(&12345u32.to_le_bytes());
        bytes
    }

    #[test]
    fn fixed_leader_applies_scales() {
        let bytes = fixed_leader_bytes();
        let reader = BlockReader::new("fixed leader", &bytes, 0, bytes.len()).unwrap();
        let leader = FixedLeader::decode(&reader).unwrap();
        assert_eq!(leader.num_beams, 4);
        assert_eq!(leader.num_bins, 40);
        assert_relative_eq!(leader.depth_bin_length, 2.0);
        assert_relative_eq!(leader.error_velocity_threshold, 2.0);
        assert_relative_eq!(leader.heading_alignment, -45.0);
        assert_relative_eq!(leader.bin1_distance, 2.91);
        assert_relative_eq!(leader.bin_center_distance(2), 6.91, epsilon = 1e-12);
        assert_eq!(leader.serial_number, 12345);
        assert_eq!(leader.cell_count(), 160);
    }

    #[test]
    fn fixed_leader_encode_matches_source_bytes() {
        let bytes = fixed_leader_bytes();
        let reader = BlockReader::new("fixed leader", &bytes, 0, bytes.len()).unwrap();
        let leader = FixedLeader::decode(&reader).unwrap();
        assert_eq!(leader.encode(), bytes);
    }

    #[test]
    fn fixed_leader_without_beams_is_rejected() {
        let mut bytes = fixed_leader_bytes();
        bytes[8] = 0;
        let reader = BlockReader::new("fixed leader", &bytes, 0, bytes.len()).unwrap();
        assert!(matches!(
            FixedLeader::decode(&reader),
            Err(NavError::InvalidField { field: "num_beams", .. })
        ));
    }

    fn variable_leader_bytes(len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        bytes[0..2].copy_from_slice(&VARIABLE_LEADER_ID.to_le_bytes());
        bytes[2..4].copy_from_slice(&65535u16.to_le_bytes());
        bytes[4..11].copy_from_slice(&[20, 2, 29, 13, 5, 7, 42]);
        bytes[18..20].copy_from_slice(&27_015u16.to_le_bytes());
        bytes[20..22].copy_from_slice(&(-2250i16).to_le_bytes());
        bytes[26..28].copy_from_slice(&1475i16.to_le_bytes());
        bytes[48..52].copy_from_slice(&10_132u32.to_le_bytes());
        bytes
    }

    #[test]
    fn variable_leader_builds_timestamp_and_scales() {
        let bytes = variable_leader_bytes(VARIABLE_LEADER_MIN_LEN);
        let reader = BlockReader::new("variable leader", &bytes, 0, bytes.len()).unwrap();
        let leader = VariableLeader::decode(&reader).unwrap();
        assert_eq!(leader.ensemble_number, 65535);
        assert_eq!(
            leader.timestamp.to_rfc3339(),
            "2020-02-29T13:05:07.420+00:00"
        );
        assert_relative_eq!(leader.heading, 270.15);
        assert_relative_eq!(leader.pitch, -22.5);
        assert_relative_eq!(leader.temperature, 14.75);
        assert_relative_eq!(leader.pressure, 101_320.0);
        assert!(leader.health.is_none());
        assert_eq!(leader.encode(), bytes);
    }

    #[test]
    fn variable_leader_reads_health_tail_when_present() {
        let mut bytes = variable_leader_bytes(VARIABLE_LEADER_FULL_LEN);
        bytes[71..73].copy_from_slice(&12_500u16.to_le_bytes());
        let reader = BlockReader::new("variable leader", &bytes, 0, bytes.len()).unwrap();
        let leader = VariableLeader::decode(&reader).unwrap();
        let health = leader.health.unwrap();
        assert_relative_eq!(health.transducer_voltage, 12.5);
        assert_eq!(leader.encode(), bytes);
    }

    #[test]
    fn impossible_clock_is_an_invalid_field() {
        let mut bytes = variable_leader_bytes(VARIABLE_LEADER_MIN_LEN);
        bytes[5] = 13;
        let reader = BlockReader::new("variable leader", &bytes, 0, bytes.len()).unwrap();
        assert!(matches!(
            VariableLeader::decode(&reader),
            Err(NavError::InvalidField { field: "rtc", .. })
        ));
    }
}
