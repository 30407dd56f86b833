use tokio::sync::mpsc::Receiver;

use super::report::{BatchReport, EnsembleFailure};
use super::timeseries::TimeSeries;
use crate::pd0::Pd0Decoder;
use crate::prelude::{EnsembleDecoder, NavConfig, NavResult};

/// Drives the decode, classify, integrate and append pipeline one buffer
/// at a time.
///
/// Holds nothing between buffers beyond the series and the integrator
/// state. Buffers must each start at an ensemble boundary.
pub struct StreamingSession<D: EnsembleDecoder = Pd0Decoder> {
    decoder: D,
    series: TimeSeries,
    report: BatchReport,
    sequence: usize,
    byte_offset: usize,
}

impl StreamingSession<Pd0Decoder> {
    pub fn new(config: NavConfig) -> Self {
        Self::with_decoder(Pd0Decoder::new(), config)
    }
}

impl<D: EnsembleDecoder> StreamingSession<D> {
    pub fn with_decoder(decoder: D, config: NavConfig) -> Self {
        let report = BatchReport::new(config.max_reported_errors);
        Self {
            decoder,
            series: TimeSeries::new(config),
            report,
            sequence: 0,
            byte_offset: 0,
        }
    }

    pub fn family(&self) -> &'static str {
        self.decoder.family()
    }

    /// Decodes and appends one buffer, returning its logical index.
    ///
    /// Failures are recorded in the report as well as returned.
    pub fn push(&mut self, buffer: &[u8]) -> NavResult<u64> {
        let sequence = self.sequence;
        let byte_offset = self.byte_offset;
        self.sequence += 1;
        self.byte_offset += buffer.len();

        let result = match self.decoder.decode(buffer) {
            Ok(ensemble) => {
                self.series.metrics().record_decoded();
                self.series.append(ensemble)
            }
            Err(err) => {
                self.series.metrics().record_rejection(err.kind());
                Err(err)
            }
        };
        match &result {
            Ok(_) => self.report.record_success(),
            Err(err) => self.report.record_failure(EnsembleFailure {
                sequence,
                byte_offset,
                error: err.clone(),
            }),
        }
        result
    }

    /// Consumes buffers until the channel closes or a hard error halts
    /// integration.
    pub async fn drain(&mut self, mut receiver: Receiver<Vec<u8>>) -> &BatchReport {
        while let Some(buffer) = receiver.recv().await {
            if let Err(err) = self.push(&buffer) {
                if err.is_hard() {
                    break;
                }
            }
        }
        &self.report
    }

    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    pub fn report(&self) -> &BatchReport {
        &self.report
    }

    /// Forgets everything, e.g. before replaying a different file.
    pub fn reset(&mut self) {
        self.series.reset();
        self.report = BatchReport::new(self.series.config().max_reported_errors);
        self.sequence = 0;
        self.byte_offset = 0;
    }

    pub fn finish(self) -> (TimeSeries, BatchReport) {
        (self.series, self.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pd0::EnsembleBuilder;
    use crate::prelude::ErrorKind;
    use chrono::{Duration, TimeZone, Utc};
    use tokio::sync::mpsc;

    fn frame(number: u16, seconds: i64) -> Vec<u8> {
        let start = Utc.with_ymd_and_hms(2023, 8, 2, 6, 30, 0).single().unwrap();
        EnsembleBuilder::new(2)
            .ensemble_number(number)
            .timestamp(start + Duration::seconds(seconds))
            .uniform_velocity([0, 500, 0, 0])
            .encode()
            .unwrap()
    }

    #[test]
    fn push_reports_and_continues_past_bad_buffers() {
        let mut session = StreamingSession::new(NavConfig::default());
        assert_eq!(session.family(), "pd0");
        assert_eq!(session.push(&frame(1, 0)), Ok(1));
        assert_eq!(
            session.push(&[0x00, 0x01, 0x02]).unwrap_err().kind(),
            ErrorKind::Framing
        );
        assert_eq!(session.push(&frame(2, 1)), Ok(2));

        let report = session.report();
        assert_eq!(report.attempted, 3);
        assert_eq!(report.failures[0].sequence, 1);
        assert_eq!(report.failures[0].byte_offset, frame(1, 0).len());
        let metrics = session.series().metrics().snapshot();
        assert_eq!(metrics.decoded, 2);
        assert_eq!(metrics.rejected.get(&ErrorKind::Framing), Some(&1));
    }

    #[tokio::test]
    async fn drain_consumes_a_channel() {
        let (tx, rx) = mpsc::channel(4);
        let producer = tokio::spawn(async move {
            for i in 0..6u16 {
                if tx.send(frame(i, i64::from(i))).await.is_err() {
                    break;
                }
            }
        });

        let mut session = StreamingSession::new(NavConfig::default());
        let report = session.drain(rx).await.clone();
        producer.await.unwrap();

        assert_eq!(report.appended, 6);
        assert!(report.is_empty());
        let state = session.series().navigation_state().unwrap();
        assert!((state.position.y - 2.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn drain_stops_at_a_hard_error() {
        let (tx, rx) = mpsc::channel(8);
        for (number, seconds) in [(1u16, 5i64), (2, 3), (3, 6)] {
            tx.send(frame(number, seconds)).await.unwrap();
        }
        drop(tx);

        let mut session = StreamingSession::new(NavConfig::default());
        let report = session.drain(rx).await;
        assert_eq!(report.halted_at, Some(1));
        assert_eq!(report.attempted, 2);

        session.reset();
        assert!(session.series().is_empty());
        assert_eq!(session.push(&frame(1, 0)), Ok(1));
    }
}
