use anyhow::Context;
use chrono::{DateTime, Duration, TimeZone, Utc};
use dvlcore::pd0::EnsembleBuilder;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Synthetic glider dive: constant heading and speed through the water,
/// sawtooth depth between the surface and `max_depth`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    pub ensembles: usize,
    pub bins: u8,
    /// s
    pub interval: f64,
    /// m/s through the water
    pub speed: f64,
    /// degrees true
    pub heading: f64,
    /// m/s, vertical
    pub dive_rate: f64,
    /// m
    pub max_depth: f64,
    /// mm/s of uniform jitter on each velocity component
    pub noise: f64,
    /// Probability that a bin reports the invalid sentinel.
    pub dropout: f64,
    /// Adds bottom track deeper than this depth, if set.
    pub bottom_track_below: Option<f64>,
    /// Ensemble number of the first ensemble.
    pub first_number: u16,
    /// Positions whose encoded frame gets one byte flipped.
    pub corrupt: Vec<usize>,
    pub seed: u64,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            ensembles: 120,
            bins: 8,
            interval: 2.0,
            speed: 0.3,
            heading: 45.0,
            dive_rate: 0.1,
            max_depth: 60.0,
            noise: 10.0,
            dropout: 0.02,
            bottom_track_below: None,
            first_number: 1,
            corrupt: Vec::new(),
            seed: 0,
        }
    }
}

impl MissionConfig {
    fn start(&self) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Depth after `elapsed` seconds of a sawtooth yo.
    fn depth_at(&self, elapsed: f64) -> f64 {
        if self.dive_rate <= 0.0 || self.max_depth <= 0.0 {
            return 0.0;
        }
        let leg = self.max_depth / self.dive_rate;
        let phase = (elapsed / leg) % 2.0;
        if phase < 1.0 {
            phase * self.max_depth
        } else {
            (2.0 - phase) * self.max_depth
        }
    }
}

fn pressure_for_depth(depth: f64) -> f64 {
    let nav = dvlcore::NavConfig::default();
    nav.surface_pressure_pa + depth * nav.water_density * nav.gravity
}

fn to_raw(mps: f64) -> i16 {
    (mps * 1000.0).round().clamp(f64::from(i16::MIN + 1), f64::from(i16::MAX)) as i16
}

/// Builds the mission as encoded PD0 frames in arrival order.
pub fn build_mission(config: &MissionConfig) -> anyhow::Result<Vec<Vec<u8>>> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let start = config.start();
    let heading_rad = config.heading.to_radians();
    let east = config.speed * heading_rad.sin();
    let north = config.speed * heading_rad.cos();
    let interval_ms = (config.interval * 1000.0).round() as i64;
    let noise = config.noise.abs() / 1000.0;

    let mut frames = Vec::with_capacity(config.ensembles);
    for i in 0..config.ensembles {
        let elapsed_ms = interval_ms
            .checked_mul(i as i64)
            .context("mission duration overflows")?;
        let elapsed = elapsed_ms as f64 / 1000.0;
        let depth = config.depth_at(elapsed);
        let number = config.first_number.wrapping_add(i as u16);

        let mut jitter = || {
            if noise > 0.0 {
                rng.gen_range(-noise..noise)
            } else {
                0.0
            }
        };
        let components = [to_raw(east + jitter()), to_raw(north + jitter()), 0, 0];

        let mut builder = EnsembleBuilder::new(config.bins)
            .ensemble_number(number)
            .timestamp(start + Duration::milliseconds(elapsed_ms))
            .attitude(config.heading, -20.0, 0.0)
            .pressure((pressure_for_depth(depth) / 10.0).round() * 10.0)
            .uniform_velocity(components);
        for bin in 0..usize::from(config.bins) {
            if rng.gen_bool(config.dropout.clamp(0.0, 1.0)) {
                builder = builder.cell_velocity(bin, 0, i16::MIN);
            }
        }
        if config.bottom_track_below.map_or(false, |floor| depth > floor) {
            builder = builder.bottom_velocity(
                [to_raw(east), to_raw(north), 0, 0],
                (config.max_depth - depth + 5.0).max(0.5),
            );
        }

        let mut frame = builder
            .encode()
            .with_context(|| format!("encoding synthetic ensemble {}", i))?;
        if config.corrupt.contains(&i) {
            let at = frame.len() / 2;
            frame[at] ^= 0xA5;
        }
        frames.push(frame);
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvlcore::{EnsembleDecoder, Pd0Decoder};

    #[test]
    fn mission_frames_decode_in_order() {
        let config = MissionConfig {
            ensembles: 12,
            dropout: 0.0,
            ..Default::default()
        };
        let frames = build_mission(&config).unwrap();
        assert_eq!(frames.len(), 12);
        let decoder = Pd0Decoder::new();
        let numbers: Vec<u16> = frames
            .iter()
            .map(|frame| decoder.decode(frame).unwrap().ensemble_number())
            .collect();
        assert_eq!(numbers, (1..=12).collect::<Vec<u16>>());
    }

    #[test]
    fn same_seed_same_mission() {
        let config = MissionConfig {
            ensembles: 5,
            seed: 99,
            ..Default::default()
        };
        assert_eq!(build_mission(&config).unwrap(), build_mission(&config).unwrap());
    }

    #[test]
    fn corrupt_positions_fail_checksum() {
        let config = MissionConfig {
            ensembles: 4,
            corrupt: vec![2],
            ..Default::default()
        };
        let frames = build_mission(&config).unwrap();
        let decoder = Pd0Decoder::new();
        assert!(decoder.decode(&frames[1]).is_ok());
        assert!(decoder.decode(&frames[2]).is_err());
    }

    #[test]
    fn sawtooth_turns_at_max_depth() {
        let config = MissionConfig {
            dive_rate: 0.5,
            max_depth: 10.0,
            ..Default::default()
        };
        assert!((config.depth_at(10.0) - 5.0).abs() < 1e-9);
        assert!((config.depth_at(30.0) - 5.0).abs() < 1e-9);
        assert!(config.depth_at(40.0).abs() < 1e-9);
    }
}
