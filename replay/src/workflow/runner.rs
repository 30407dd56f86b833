use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use dvlcore::processing::SeriesSummary;
use dvlcore::telemetry::MetricsSnapshot;
use dvlcore::{BatchReport, StreamingSession, TimeSeries};
use log::info;
use serde::Serialize;
use tokio::runtime::Builder as TokioBuilder;
use tokio::sync::mpsc;

#[derive(Debug, Serialize)]
pub struct WorkflowResult {
    pub summary: SeriesSummary,
    pub report: BatchReport,
    pub metrics: MetricsSnapshot,
}

impl WorkflowResult {
    fn from_series(series: &TimeSeries, report: BatchReport) -> Self {
        Self {
            summary: series.summary(),
            report,
            metrics: series.metrics().snapshot(),
        }
    }
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    /// Replays every frame through the batch constructor.
    pub fn execute(&self, frames: &[Vec<u8>]) -> WorkflowResult {
        let (series, report) = TimeSeries::from_stream(frames, self.config.navigation.clone());
        info!(
            "batch replay: {} ensembles kept, {} rejected",
            series.len(),
            report.failed
        );
        WorkflowResult::from_series(&series, report)
    }

    /// Replays frames through a bounded channel, one ensemble at a time.
    pub fn execute_streaming(&self, frames: Vec<Vec<u8>>) -> anyhow::Result<WorkflowResult> {
        let runtime = TokioBuilder::new_multi_thread()
            .enable_all()
            .build()
            .context("creating runtime for streaming replay")?;
        let capacity = self.config.channel_capacity();
        let navigation = self.config.navigation.clone();

        runtime.block_on(async move {
            let (tx, rx) = mpsc::channel(capacity);
            let producer = tokio::spawn(async move {
                for frame in frames {
                    if tx.send(frame).await.is_err() {
                        // session stopped after a hard error
                        break;
                    }
                }
            });

            let mut session = StreamingSession::new(navigation);
            session.drain(rx).await;
            producer.await.context("joining frame producer")?;

            let (series, report) = session.finish();
            info!(
                "streaming replay: {} ensembles kept, {} rejected",
                series.len(),
                report.failed
            );
            Ok::<_, anyhow::Error>(WorkflowResult::from_series(&series, report))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::{build_mission, MissionConfig};

    fn config(corrupt: Vec<usize>) -> WorkflowConfig {
        WorkflowConfig {
            mission: MissionConfig {
                ensembles: 10,
                dropout: 0.0,
                corrupt,
                ..MissionConfig::default()
            },
            channel_capacity: Some(2),
            ..WorkflowConfig::default()
        }
    }

    #[test]
    fn runner_reports_the_corrupt_ensemble() {
        let cfg = config(vec![4]);
        let frames = build_mission(&cfg.mission).unwrap();
        let result = Runner::new(cfg).execute(&frames);
        assert_eq!(result.summary.count, 9);
        assert_eq!(result.report.failed, 1);
        assert_eq!(result.report.failures[0].sequence, 4);
        assert_eq!(result.metrics.appended, 9);
    }

    #[test]
    fn streaming_matches_batch() {
        let cfg = config(vec![]);
        let frames = build_mission(&cfg.mission).unwrap();
        let runner = Runner::new(cfg);
        let batch = runner.execute(&frames);
        let streamed = runner.execute_streaming(frames).unwrap();
        assert_eq!(streamed.summary, batch.summary);
        assert_eq!(streamed.report, batch.report);
    }
}
