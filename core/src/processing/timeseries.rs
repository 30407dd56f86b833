use chrono::{DateTime, Utc};
use serde::Serialize;

use super::coordinate::CoordinateResolver;
use super::navigation::{NavigationIntegrator, NavigationState, Vector3, VelocitySource};
use super::report::BatchReport;
use super::rollover::RolloverTracker;
use super::stream::StreamingSession;
use crate::math::StatsHelper;
use crate::pd0::{Ensemble, Pd0Decoder};
use crate::prelude::{EnsembleDecoder, NavConfig, NavError, NavResult};
use crate::telemetry::{LogManager, MetricsRecorder};

/// Aggregate view over an integrated series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub count: usize,
    /// Share of ensembles whose velocity was measured rather than held.
    pub valid_velocity_fraction: f64,
    /// m, summed over step displacements.
    pub path_length: f64,
    /// m/s, over ensembles with a known velocity.
    pub mean_speed: f64,
    pub speed_std_dev: f64,
    /// s between first and last ensemble.
    pub duration: f64,
    pub final_position: Option<Vector3>,
}

/// Ordered history of accepted ensembles with their derived fields.
///
/// Logical indices strictly increase and timestamps never decrease. Each
/// accepted ensemble keeps its own fixed leader.
pub struct TimeSeries {
    ensembles: Vec<Ensemble>,
    tracker: RolloverTracker,
    integrator: NavigationIntegrator,
    resolver: CoordinateResolver,
    logger: LogManager,
    metrics: MetricsRecorder,
}

impl TimeSeries {
    pub fn new(config: NavConfig) -> Self {
        let ensembles = match config.expected_ensembles {
            Some(expected) => Vec::with_capacity(expected),
            None => Vec::new(),
        };
        Self {
            ensembles,
            tracker: RolloverTracker::new(),
            integrator: NavigationIntegrator::new(config),
            resolver: CoordinateResolver::new(),
            logger: LogManager::new(),
            metrics: MetricsRecorder::new(),
        }
    }

    /// Decodes and appends every buffer with the PD0 decoder.
    pub fn from_stream<I, B>(source: I, config: NavConfig) -> (Self, BatchReport)
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        Self::from_stream_with(&Pd0Decoder::new(), source, config)
    }

    /// Batch construction with an explicit decoder.
    ///
    /// Per-ensemble failures go into the report and the run continues. A
    /// hard error stops consumption of the source; everything appended so
    /// far is kept.
    pub fn from_stream_with<D, I, B>(decoder: &D, source: I, config: NavConfig) -> (Self, BatchReport)
    where
        D: EnsembleDecoder + ?Sized,
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let mut session = StreamingSession::with_decoder(decoder, config);
        for buffer in source {
            if let Err(err) = session.push(buffer.as_ref()) {
                if err.is_hard() {
                    break;
                }
            }
        }
        let (series, report) = session.finish();
        series.logger.record(&format!(
            "batch complete: {} attempted, {} appended, {} failed",
            report.attempted, report.appended, report.failed
        ));
        (series, report)
    }

    /// Classifies, indexes and integrates `ensemble`, then stores it.
    ///
    /// Returns the logical index. On error nothing is stored and the
    /// rollover and navigation state are unchanged, except that a time
    /// regression halts integration.
    pub fn append(&mut self, ensemble: Ensemble) -> NavResult<u64> {
        let result = self.try_append(ensemble);
        match &result {
            Ok(_) => self.metrics.record_appended(),
            Err(err) => {
                self.metrics.record_rejection(err.kind());
                self.logger.warn(&format!("ensemble rejected: {}", err));
            }
        }
        result
    }

    fn try_append(&mut self, mut ensemble: Ensemble) -> NavResult<u64> {
        if ensemble.transform.is_none() {
            ensemble.transform = Some(self.resolver.resolve(&ensemble.fixed_leader)?);
        }
        let index = self.tracker.peek(ensemble.ensemble_number())?;
        if let Some(last) = self.ensembles.last() {
            if ensemble.timestamp() < last.timestamp() {
                self.integrator.halt();
                return Err(NavError::NonMonotonicTime {
                    previous: last.timestamp().to_rfc3339(),
                    current: ensemble.timestamp().to_rfc3339(),
                });
            }
        }

        let derived = self.integrator.step(&ensemble)?;
        if derived.source == VelocitySource::HeldConstant {
            self.metrics.record_held_velocity();
        }
        self.tracker.next(ensemble.ensemble_number())?;
        ensemble.logical_index = Some(index);
        ensemble.derived = Some(derived);
        self.ensembles.push(ensemble);
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.ensembles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ensembles.is_empty()
    }

    pub fn ensembles(&self) -> &[Ensemble] {
        &self.ensembles
    }

    pub fn get(&self, position: usize) -> Option<&Ensemble> {
        self.ensembles.get(position)
    }

    pub fn last(&self) -> Option<&Ensemble> {
        self.ensembles.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Ensemble> {
        self.ensembles.iter()
    }

    /// Latest ensemble at or before `timestamp`.
    pub fn at_or_before(&self, timestamp: DateTime<Utc>) -> Option<&Ensemble> {
        let end = self
            .ensembles
            .partition_point(|ensemble| ensemble.timestamp() <= timestamp);
        end.checked_sub(1).and_then(|i| self.ensembles.get(i))
    }

    /// Ensembles with `start <= timestamp <= end`.
    pub fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> &[Ensemble] {
        let lower = self
            .ensembles
            .partition_point(|ensemble| ensemble.timestamp() < start);
        let upper = self
            .ensembles
            .partition_point(|ensemble| ensemble.timestamp() <= end);
        if lower >= upper {
            &[]
        } else {
            &self.ensembles[lower..upper]
        }
    }

    pub fn navigation_state(&self) -> Option<&NavigationState> {
        self.integrator.state()
    }

    pub fn is_halted(&self) -> bool {
        self.integrator.is_halted()
    }

    pub fn config(&self) -> &NavConfig {
        self.integrator.config()
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    /// Restarts integration from the origin while keeping the history.
    pub fn reset_navigation(&mut self) {
        self.integrator.reset();
        self.logger.record("navigation state reset");
    }

    /// Drops all history and state for a new, unrelated run.
    pub fn reset(&mut self) {
        self.ensembles.clear();
        self.tracker.reset();
        self.integrator.reset();
        self.metrics.reset();
    }

    pub fn summary(&self) -> SeriesSummary {
        let derived: Vec<_> = self
            .ensembles
            .iter()
            .filter_map(|ensemble| ensemble.derived.as_ref())
            .collect();
        let measured = derived
            .iter()
            .filter(|d| {
                matches!(
                    d.source,
                    VelocitySource::BottomTrack
                        | VelocitySource::CurrentCorrected
                        | VelocitySource::WaterProfile
                )
            })
            .count();
        let speeds: Vec<f64> = derived
            .iter()
            .filter_map(|d| d.velocity.map(|v| v.speed()))
            .collect();
        let duration = match (self.ensembles.first(), self.ensembles.last()) {
            (Some(first), Some(last)) => {
                (last.timestamp() - first.timestamp()).num_milliseconds() as f64 / 1000.0
            }
            _ => 0.0,
        };

        SeriesSummary {
            count: self.ensembles.len(),
            valid_velocity_fraction: if derived.is_empty() {
                0.0
            } else {
                measured as f64 / derived.len() as f64
            },
            path_length: derived.iter().map(|d| d.displacement.norm()).sum(),
            mean_speed: StatsHelper::mean(&speeds),
            speed_std_dev: StatsHelper::std_dev(&speeds),
            duration,
            final_position: derived.last().map(|d| d.position),
        }
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = &'a Ensemble;
    type IntoIter = std::slice::Iter<'a, Ensemble>;

    fn into_iter(self) -> Self::IntoIter {
        self.ensembles.iter()
    }
}
