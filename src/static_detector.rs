use std::sync::Arc;

use image::GrayImage;
use log::{debug, trace};

use crate::config::StaticDetectorConfig;
use crate::error::FrameError;
use crate::estimation;
use crate::features::FeatureExtractor;
use crate::matching::BruteForceMatcher;
use crate::model::TrainedModel;
use crate::types::{DetectionResult, ImageSize, Region};

fn validate_frame(frame: &GrayImage) -> Result<(), FrameError> {
    let size = ImageSize::of(frame);
    if size.is_empty() {
        Err(FrameError::Empty { size })
    } else {
        Ok(())
    }
}

/// Single-frame detector: descriptor matching followed by RANSAC verification.
///
/// Holds no per-frame state, so `detect_in` on the same frame always returns
/// the same result.
#[derive(Clone)]
pub struct StaticDetector<E: FeatureExtractor> {
    model: Arc<TrainedModel>,
    extractor: E,
    matcher: BruteForceMatcher,
    config: StaticDetectorConfig,
}

impl<E: FeatureExtractor> StaticDetector<E> {
    pub fn new(model: Arc<TrainedModel>, extractor: E, config: StaticDetectorConfig) -> Self {
        let matcher = BruteForceMatcher::new(config.max_descriptor_distance, config.ratio_test);
        StaticDetector {
            model,
            extractor,
            matcher,
            config,
        }
    }

    pub fn model(&self) -> &Arc<TrainedModel> {
        &self.model
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    pub fn config(&self) -> &StaticDetectorConfig {
        &self.config
    }

    /// Pixel size of the trained object.
    pub fn train_image_size(&self) -> ImageSize {
        self.model.reference_size()
    }

    /// Looks for the trained object anywhere in `frame`.
    pub fn detect_in(&self, frame: &GrayImage) -> DetectionResult {
        if let Err(e) = validate_frame(frame) {
            debug!("skipping frame: {}", e);
            return DetectionResult::not_found();
        }

        let features = self.extractor.extract(frame);
        let matches = self.matcher.match_model(&features, &self.model);
        let min_inliers = self.config.min_inliers.max(self.config.transform.sample_size());
        if matches.len() < min_inliers {
            trace!(
                "{} keypoints, {} matches: below {}",
                features.len(),
                matches.len(),
                min_inliers
            );
            return DetectionResult::not_found();
        }

        let correspondences = matches.correspondences(&features, &self.model);
        let Some(estimate) =
            estimation::estimate(self.config.transform, &correspondences, &self.config.ransac)
        else {
            trace!("no transform fits {} correspondences", correspondences.len());
            return DetectionResult::not_found();
        };
        if estimate.inliers.len() < min_inliers {
            trace!(
                "best consensus {} / {} below {}",
                estimate.inliers.len(),
                correspondences.len(),
                min_inliers
            );
            return DetectionResult::not_found();
        }
        if !estimate.transform.keeps_shape(self.train_image_size()) {
            debug!("rejecting folded transform {:?}", estimate.transform);
            return DetectionResult::not_found();
        }

        match estimate.transform.apply(glam::Vec2::ZERO) {
            Some(offset) => {
                trace!(
                    "found at ({:.1}, {:.1}) with {} inliers",
                    offset.x,
                    offset.y,
                    estimate.inliers.len()
                );
                DetectionResult::found_at(offset, estimate.inliers.len())
            }
            None => DetectionResult::not_found(),
        }
    }

    /// Runs [`Self::detect_in`] on a crop of `frame`; the offset is reported
    /// in full-frame coordinates.
    pub fn detect_in_region(&self, frame: &GrayImage, region: Region) -> DetectionResult {
        let Some(region) = region.clamp_to(ImageSize::of(frame)) else {
            return DetectionResult::not_found();
        };
        let crop =
            image::imageops::crop_imm(frame, region.x, region.y, region.width, region.height)
                .to_image();
        self.detect_in(&crop).translated(region.origin())
    }
}
