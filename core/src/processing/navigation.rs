//! Sequential dead reckoning from consecutive ensembles.
//!
//! Axes are x East, y North and z positive down. Horizontal velocity comes
//! from bottom track when it is usable, otherwise from one water-profile
//! bin corrected by the last ocean current estimate, otherwise the last good
//! velocity is held. Vertical motion comes from the pressure sensor alone.

use std::ops::{Add, AddAssign, Sub};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::coordinate::{CoordinateResolver, CoordinateTransform};
use crate::math::units::{pressure_to_depth, wrap_heading_delta, MM_PER_M};
use crate::pd0::{BottomTrack, Ensemble, FixedLeader, WaterProfile};
use crate::prelude::{Combine, NavConfig, NavError, NavResult, Origin, SampleScreen};
use crate::telemetry::LogManager;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl Add for Vector3 {
    type Output = Vector3;

    fn add(self, other: Vector3) -> Vector3 {
        Vector3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl AddAssign for Vector3 {
    fn add_assign(&mut self, other: Vector3) {
        *self = *self + other;
    }
}

/// East/North velocity in m/s.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizontalVelocity {
    pub east: f64,
    pub north: f64,
}

impl HorizontalVelocity {
    pub fn speed(&self) -> f64 {
        self.east.hypot(self.north)
    }
}

impl Add for HorizontalVelocity {
    type Output = HorizontalVelocity;

    fn add(self, other: HorizontalVelocity) -> HorizontalVelocity {
        HorizontalVelocity {
            east: self.east + other.east,
            north: self.north + other.north,
        }
    }
}

impl Sub for HorizontalVelocity {
    type Output = HorizontalVelocity;

    fn sub(self, other: HorizontalVelocity) -> HorizontalVelocity {
        HorizontalVelocity {
            east: self.east - other.east,
            north: self.north - other.north,
        }
    }
}

/// Verdict on one velocity sample; anything but `Valid` excludes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleQuality {
    Valid,
    Sentinel,
    LowPercentGood,
    LowCorrelation,
    NotEarthFrame,
    MissingData,
    NoBottomLock,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocitySample {
    pub quality: SampleQuality,
    pub velocity: Option<HorizontalVelocity>,
}

impl VelocitySample {
    fn rejected(quality: SampleQuality) -> Self {
        Self {
            quality,
            velocity: None,
        }
    }

    fn valid(east: f64, north: f64) -> Self {
        Self {
            quality: SampleQuality::Valid,
            velocity: Some(HorizontalVelocity { east, north }),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.quality == SampleQuality::Valid
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocitySource {
    BottomTrack,
    /// Through-water velocity plus the last ocean current estimate.
    CurrentCorrected,
    WaterProfile,
    HeldConstant,
    Unavailable,
}

/// Per-ensemble results of one integration step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedFields {
    /// Seconds since the previous integrated ensemble; `None` for the first.
    pub delta_t: Option<f64>,
    /// m below the surface.
    pub depth: f64,
    /// m/s, positive when descending.
    pub depth_rate: f64,
    pub water: VelocitySample,
    pub bottom: Option<VelocitySample>,
    pub velocity: Option<HorizontalVelocity>,
    pub source: VelocitySource,
    /// Over-ground minus through-water velocity, when both were valid.
    pub ocean_current: Option<HorizontalVelocity>,
    pub displacement: Vector3,
    pub position: Vector3,
    /// Degrees in [-180, 180).
    pub heading_change: Option<f64>,
    pub good_velocity_bins: usize,
}

/// Accumulator carried between steps of one integration run.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationState {
    pub position: Vector3,
    pub timestamp: DateTime<Utc>,
    pub heading: f64,
    pub pressure: f64,
    pub depth: f64,
    pub velocity: Option<HorizontalVelocity>,
    /// Most recent ocean current estimate.
    pub ocean_current: Option<HorizontalVelocity>,
    pub steps: u64,
}

pub struct NavigationIntegrator {
    config: NavConfig,
    resolver: CoordinateResolver,
    state: Option<NavigationState>,
    halted: bool,
    logger: LogManager,
}

impl NavigationIntegrator {
    pub fn new(config: NavConfig) -> Self {
        Self {
            config,
            resolver: CoordinateResolver::new(),
            state: None,
            halted: false,
            logger: LogManager::new(),
        }
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    pub fn state(&self) -> Option<&NavigationState> {
        self.state.as_ref()
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Stops integration until [`reset`](Self::reset).
    pub fn halt(&mut self) {
        self.halted = true;
    }

    /// Starts a new, unrelated run from the configured origin.
    pub fn reset(&mut self) {
        self.state = None;
        self.halted = false;
    }

    /// Integrates `ensemble` against the previous step.
    ///
    /// State is only updated on success. A non-positive time step halts the
    /// integrator and every later call fails with `IntegrationHalted`.
    pub fn step(&mut self, ensemble: &Ensemble) -> NavResult<DerivedFields> {
        if self.halted {
            return Err(NavError::IntegrationHalted);
        }
        let transform = match ensemble.transform {
            Some(transform) => transform,
            None => self.resolver.resolve(&ensemble.fixed_leader)?,
        };
        let leader = &ensemble.variable_leader;
        let timestamp = leader.timestamp;

        let delta_t = match &self.state {
            Some(previous) => {
                let dt = (timestamp - previous.timestamp).num_milliseconds() as f64 / 1000.0;
                if dt <= 0.0 {
                    self.halted = true;
                    return Err(NavError::NonMonotonicTime {
                        previous: previous.timestamp.to_rfc3339(),
                        current: timestamp.to_rfc3339(),
                    });
                }
                Some(dt)
            }
            None => None,
        };

        let screen = &self.config.screening;
        let sign = if self.config.reverse_velocity_sign {
            -1.0
        } else {
            1.0
        };
        let water = screen_water(
            &ensemble.water_profile,
            &ensemble.fixed_leader,
            &transform,
            self.config.velocity_bin,
            screen,
            sign,
        );
        let bottom = ensemble
            .bottom_track
            .as_ref()
            .map(|track| screen_bottom(track, &transform, screen.invalid_velocity, sign));
        let good_velocity_bins = (0..ensemble.water_profile.num_bins())
            .filter(|&bin| {
                screen_water(
                    &ensemble.water_profile,
                    &ensemble.fixed_leader,
                    &transform,
                    bin,
                    screen,
                    sign,
                )
                .is_valid()
            })
            .count();

        let previous_velocity = self.state.as_ref().and_then(|state| state.velocity);
        let over_ground = bottom.and_then(|sample| sample.velocity);
        let ocean_current = match (over_ground, water.velocity) {
            (Some(over_ground), Some(through_water)) => Some(over_ground - through_water),
            _ => None,
        };
        let current_estimate = ocean_current
            .or_else(|| self.state.as_ref().and_then(|state| state.ocean_current));
        let bottom_velocity = over_ground.filter(|_| self.config.prefer_bottom_track);
        let corrected = current_estimate
            .filter(|_| self.config.prefer_bottom_track && self.config.apply_ocean_current)
            .and_then(|current| water.velocity.map(|v| v + current));
        let (velocity, source) = if let Some(v) = bottom_velocity {
            (Some(v), VelocitySource::BottomTrack)
        } else if let Some(v) = corrected {
            (Some(v), VelocitySource::CurrentCorrected)
        } else if let Some(v) = water.velocity {
            (Some(v), VelocitySource::WaterProfile)
        } else if let Some(v) = previous_velocity {
            self.logger.debug(&format!(
                "ensemble {} velocity {:?}, holding previous",
                ensemble.ensemble_number(),
                water.quality
            ));
            (Some(v), VelocitySource::HeldConstant)
        } else {
            (None, VelocitySource::Unavailable)
        };

        let depth = pressure_to_depth(
            leader.pressure,
            self.config.surface_pressure_pa,
            self.config.water_density,
            self.config.gravity,
        );
        let (depth_rate, displacement) = match (delta_t, &self.state) {
            (Some(dt), Some(previous)) => {
                let rate = (depth - previous.depth) / dt;
                let (east, north) = velocity.map(|v| (v.east, v.north)).unwrap_or((0.0, 0.0));
                (rate, Vector3::new(east * dt, north * dt, rate * dt))
            }
            _ => (0.0, Vector3::default()),
        };

        let position = match &self.state {
            Some(previous) => previous.position + displacement,
            None => match self.config.origin {
                Origin::FirstEnsemble => Vector3::default(),
                Origin::Fixed { x, y, z } => Vector3::new(x, y, z),
            },
        };
        let heading_change = self
            .state
            .as_ref()
            .map(|previous| wrap_heading_delta(previous.heading, leader.heading));
        let steps = self.state.as_ref().map(|s| s.steps + 1).unwrap_or(1);

        self.state = Some(NavigationState {
            position,
            timestamp,
            heading: leader.heading,
            pressure: leader.pressure,
            depth,
            velocity,
            ocean_current: current_estimate,
            steps,
        });

        Ok(DerivedFields {
            delta_t,
            depth,
            depth_rate,
            water,
            bottom,
            velocity,
            source,
            ocean_current,
            displacement,
            position,
            heading_change,
            good_velocity_bins,
        })
    }
}

/// Screens the u/v pair of one water-profile bin.
///
/// Percent good in Earth coordinates is the share of three-beam plus
/// four-beam solutions (fields 1 and 4). Profiles with fewer than four
/// columns only carry field 1. Correlation uses the weakest beam.
pub fn screen_water(
    profile: &WaterProfile,
    leader: &FixedLeader,
    transform: &CoordinateTransform,
    bin: usize,
    screen: &SampleScreen,
    sign: f64,
) -> VelocitySample {
    if !transform.is_earth() {
        return VelocitySample::rejected(SampleQuality::NotEarthFrame);
    }
    let velocity = match profile.velocity.as_ref() {
        Some(velocity) if bin < velocity.nrows() && velocity.ncols() >= 2 => velocity,
        _ => return VelocitySample::rejected(SampleQuality::MissingData),
    };
    let (u, v) = (velocity[[bin, 0]], velocity[[bin, 1]]);
    if u == screen.invalid_velocity || v == screen.invalid_velocity {
        return VelocitySample::rejected(SampleQuality::Sentinel);
    }

    let mut checks = Vec::with_capacity(2);
    if screen.check_percent_good {
        let passed = profile
            .percent_good
            .as_ref()
            .filter(|pg| bin < pg.nrows() && pg.ncols() > 0)
            .map(|pg| {
                let good = if pg.ncols() >= 4 {
                    u32::from(pg[[bin, 0]]) + u32::from(pg[[bin, 3]])
                } else {
                    u32::from(pg[[bin, 0]])
                };
                good >= u32::from(leader.percent_good_minimum)
            })
            .unwrap_or(false);
        checks.push((passed, SampleQuality::LowPercentGood));
    }
    if screen.check_correlation {
        let passed = profile
            .correlation
            .as_ref()
            .filter(|corr| bin < corr.nrows())
            .and_then(|corr| corr.row(bin).iter().copied().min())
            .map(|weakest| weakest >= leader.low_correlation_threshold)
            .unwrap_or(false);
        checks.push((passed, SampleQuality::LowCorrelation));
    }

    let failure = match screen.combine {
        Combine::All => checks.iter().find(|(passed, _)| !passed).map(|(_, q)| *q),
        Combine::Any => {
            if checks.is_empty() || checks.iter().any(|(passed, _)| *passed) {
                None
            } else {
                Some(checks[0].1)
            }
        }
    };
    match failure {
        Some(quality) => VelocitySample::rejected(quality),
        None => VelocitySample::valid(
            sign * f64::from(u) / MM_PER_M,
            sign * f64::from(v) / MM_PER_M,
        ),
    }
}

fn screen_bottom(
    track: &BottomTrack,
    transform: &CoordinateTransform,
    sentinel: i16,
    sign: f64,
) -> VelocitySample {
    if !transform.is_earth() {
        return VelocitySample::rejected(SampleQuality::NotEarthFrame);
    }
    let (east, north) = match (track.velocity_mps(0, sentinel), track.velocity_mps(1, sentinel)) {
        (Some(east), Some(north)) => (east, north),
        _ => return VelocitySample::rejected(SampleQuality::Sentinel),
    };
    if !(track.range_valid(0) && track.range_valid(1)) {
        return VelocitySample::rejected(SampleQuality::NoBottomLock);
    }
    VelocitySample::valid(sign * east, sign * north)
}
