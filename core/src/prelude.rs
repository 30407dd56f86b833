use serde::{Deserialize, Serialize};

use crate::pd0::Ensemble;

/// Raw velocity value the instrument reports for "no data".
pub const DEFAULT_INVALID_VELOCITY: i16 = -32768;

/// Where cumulative position starts for an integration run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    /// The first integrated ensemble sits at (0, 0, 0).
    FirstEnsemble,
    /// The first integrated ensemble sits at a caller-supplied point.
    Fixed { x: f64, y: f64, z: f64 },
}

impl Default for Origin {
    fn default() -> Self {
        Origin::FirstEnsemble
    }
}

/// How the individual quality checks are combined into one verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combine {
    /// Every enabled check must pass.
    All,
    /// At least one enabled check must pass.
    Any,
}

/// Screening policy applied to a water-profile velocity sample.
///
/// The sentinel test is always applied; the percent-good and correlation
/// thresholds come from the ensemble's own fixed leader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleScreen {
    pub invalid_velocity: i16,
    pub check_percent_good: bool,
    pub check_correlation: bool,
    pub combine: Combine,
}

impl Default for SampleScreen {
    fn default() -> Self {
        Self {
            invalid_velocity: DEFAULT_INVALID_VELOCITY,
            check_percent_good: true,
            check_correlation: false,
            combine: Combine::All,
        }
    }
}

/// Shared configuration for decoding and integrating one deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    pub origin: Origin,
    pub velocity_bin: usize,
    pub screening: SampleScreen,
    pub prefer_bottom_track: bool,
    /// Adds the last ocean current estimate to water velocity when bottom
    /// track drops out.
    pub apply_ocean_current: bool,
    pub reverse_velocity_sign: bool,
    /// kg/m^3
    pub water_density: f64,
    /// m/s^2
    pub gravity: f64,
    /// Pa, subtracted before converting pressure to depth.
    pub surface_pressure_pa: f64,
    pub expected_ensembles: Option<usize>,
    pub max_reported_errors: usize,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            origin: Origin::FirstEnsemble,
            velocity_bin: 0,
            screening: SampleScreen::default(),
            prefer_bottom_track: true,
            apply_ocean_current: true,
            reverse_velocity_sign: false,
            water_density: 1025.0,
            gravity: 9.80665,
            surface_pressure_pa: 0.0,
            expected_ensembles: None,
            max_reported_errors: 16,
        }
    }
}

/// Copyable classification of a [`NavError`], used for counters and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Framing,
    Offset,
    Checksum,
    UnsupportedFrame,
    InvalidField,
    OutOfOrder,
    NonMonotonicTime,
    IntegrationHalted,
}

/// Common error type for decoding, classification and integration.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize)]
pub enum NavError {
    #[error("framing error: {0}")]
    Framing(String),
    #[error("offset error: {0}")]
    Offset(String),
    #[error("checksum mismatch: computed {computed:#06x}, stored {stored:#06x}")]
    Checksum { computed: u16, stored: u16 },
    #[error("unsupported coordinate frame selector {0}")]
    UnsupportedFrame(u8),
    #[error("invalid {block} field {field}: {value}")]
    InvalidField {
        block: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("ensemble number {raw} does not follow {previous}")]
    OutOfOrder { previous: u64, raw: u16 },
    #[error("timestamp {current} does not advance past {previous}")]
    NonMonotonicTime { previous: String, current: String },
    #[error("integration halted by an earlier time regression; reset required")]
    IntegrationHalted,
}

impl NavError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NavError::Framing(_) => ErrorKind::Framing,
            NavError::Offset(_) => ErrorKind::Offset,
            NavError::Checksum { .. } => ErrorKind::Checksum,
            NavError::UnsupportedFrame(_) => ErrorKind::UnsupportedFrame,
            NavError::InvalidField { .. } => ErrorKind::InvalidField,
            NavError::OutOfOrder { .. } => ErrorKind::OutOfOrder,
            NavError::NonMonotonicTime { .. } => ErrorKind::NonMonotonicTime,
            NavError::IntegrationHalted => ErrorKind::IntegrationHalted,
        }
    }

    /// Hard errors stop the integration run until the caller resets it.
    pub fn is_hard(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NonMonotonicTime | ErrorKind::IntegrationHalted
        )
    }
}

pub type NavResult<T> = Result<T, NavError>;

/// Decoder for one instrument family's binary ensembles.
pub trait EnsembleDecoder {
    /// Short family name used in logs.
    fn family(&self) -> &'static str;

    /// Decodes one buffer that starts at an ensemble boundary.
    fn decode(&self, buffer: &[u8]) -> NavResult<Ensemble>;
}
