pub mod config;
pub mod data_loader;
pub mod dynamic_detector;
pub mod error;
pub mod estimation;
pub mod features;
pub mod io;
pub mod matching;
pub mod model;
pub mod static_detector;
pub mod synthetic;
pub mod types;

pub use config::{
    DynamicDetectorConfig, OrbConfig, PipelineConfig, RansacConfig, StaticDetectorConfig,
    TransformKind,
};
pub use dynamic_detector::{DynamicDetector, TrackPhase, TrackState};
pub use error::{FrameError, TrainingError};
pub use features::{FeatureExtractor, OrbExtractor};
pub use model::{ProcessedImage, TrainedModel, TrainedModelBuilder};
pub use static_detector::StaticDetector;
pub use types::{DetectionResult, ImageSize};

/// Dynamic detector over a static one, wired from one [`PipelineConfig`].
pub fn tracker_from_config(
    model: std::sync::Arc<TrainedModel>,
    config: &PipelineConfig,
) -> DynamicDetector<OrbExtractor> {
    let extractor = OrbExtractor::new(config.extractor.clone());
    let detector = StaticDetector::new(model, extractor, config.detector.clone());
    DynamicDetector::new(detector, config.tracker.clone())
}
