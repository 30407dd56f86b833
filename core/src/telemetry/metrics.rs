use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::Serialize;

use crate::prelude::ErrorKind;

pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

#[derive(Default)]
struct Metrics {
    decoded: usize,
    appended: usize,
    held_velocity: usize,
    rejected: BTreeMap<ErrorKind, usize>,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub decoded: usize,
    pub appended: usize,
    pub held_velocity: usize,
    pub rejected: BTreeMap<ErrorKind, usize>,
}

impl MetricsSnapshot {
    pub fn total_rejected(&self) -> usize {
        self.rejected.values().sum()
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    pub fn record_decoded(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.decoded += 1;
        }
    }

    pub fn record_appended(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.appended += 1;
        }
    }

    pub fn record_held_velocity(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.held_velocity += 1;
        }
    }

    pub fn record_rejection(&self, kind: ErrorKind) {
        if let Ok(mut metrics) = self.inner.lock() {
            *metrics.rejected.entry(kind).or_insert(0) += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            MetricsSnapshot {
                decoded: metrics.decoded,
                appended: metrics.appended,
                held_velocity: metrics.held_velocity,
                rejected: metrics.rejected.clone(),
            }
        } else {
            MetricsSnapshot::default()
        }
    }

    pub fn reset(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            *metrics = Metrics::default();
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_are_counted_per_kind() {
        let metrics = MetricsRecorder::new();
        metrics.record_decoded();
        metrics.record_rejection(ErrorKind::Checksum);
        metrics.record_rejection(ErrorKind::Checksum);
        metrics.record_rejection(ErrorKind::OutOfOrder);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.decoded, 1);
        assert_eq!(snapshot.rejected.get(&ErrorKind::Checksum), Some(&2));
        assert_eq!(snapshot.total_rejected(), 3);

        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }
}
