pub mod coordinate;
pub mod navigation;
pub mod report;
pub mod rollover;
pub mod stream;
pub mod timeseries;

pub use coordinate::{CoordinateFrame, CoordinateResolver, CoordinateTransform, VelocityComponent};
pub use navigation::{
    DerivedFields, HorizontalVelocity, NavigationIntegrator, NavigationState, SampleQuality,
    Vector3, VelocitySample, VelocitySource,
};
pub use report::{BatchReport, EnsembleFailure};
pub use rollover::RolloverTracker;
pub use stream::StreamingSession;
pub use timeseries::{SeriesSummary, TimeSeries};
