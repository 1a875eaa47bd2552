use image::GrayImage;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::TrainingError;
use crate::features::FeatureExtractor;
use crate::types::{Features, ImageSize};

/// Features of one training image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedImage {
    pub features: Features,
    pub size: ImageSize,
}

impl ProcessedImage {
    pub fn new(extractor: &dyn FeatureExtractor, image: &GrayImage) -> ProcessedImage {
        ProcessedImage {
            features: extractor.extract(image),
            size: ImageSize::of(image),
        }
    }
}

/// Immutable feature model of one planar object.
///
/// All training images share `reference_size`. Share it between detectors
/// through an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    images: Vec<ProcessedImage>,
    reference_size: ImageSize,
}

impl TrainedModel {
    /// Extracts features from every training image, in parallel.
    ///
    /// Fails when `images` is empty or any image differs in size from the first.
    pub fn from_images<E: FeatureExtractor>(
        images: &[GrayImage],
        extractor: &E,
    ) -> Result<TrainedModel, TrainingError> {
        let reference_size = validate_sizes(images.iter().map(ImageSize::of))?;
        let processed: Vec<ProcessedImage> = images
            .par_iter()
            .map(|img| ProcessedImage::new(extractor, img))
            .collect();
        for (i, p) in processed.iter().enumerate() {
            debug!("train image {}: {} keypoints", i, p.features.len());
        }
        let model = TrainedModel {
            images: processed,
            reference_size,
        };
        info!(
            "trained model from {} images of {}, {} keypoints",
            model.image_count(),
            reference_size,
            model.keypoint_count()
        );
        Ok(model)
    }

    /// Rebuilds a model from already extracted images, checking the size invariant.
    pub fn from_processed(images: Vec<ProcessedImage>) -> Result<TrainedModel, TrainingError> {
        let reference_size = validate_sizes(images.iter().map(|p| p.size))?;
        Ok(TrainedModel {
            images,
            reference_size,
        })
    }

    pub fn images(&self) -> &[ProcessedImage] {
        &self.images
    }

    pub fn into_images(self) -> Vec<ProcessedImage> {
        self.images
    }

    pub fn reference_size(&self) -> ImageSize {
        self.reference_size
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn keypoint_count(&self) -> usize {
        self.images.iter().map(|p| p.features.len()).sum()
    }
}

fn validate_sizes(sizes: impl Iterator<Item = ImageSize>) -> Result<ImageSize, TrainingError> {
    let mut reference: Option<ImageSize> = None;
    for (index, size) in sizes.enumerate() {
        match reference {
            None => reference = Some(size),
            Some(expected) if expected != size => {
                return Err(TrainingError::InconsistentImageSize {
                    index,
                    expected,
                    found: size,
                });
            }
            Some(_) => {}
        }
    }
    reference.ok_or(TrainingError::EmptyTrainingSet)
}

/// Collects training images before a single [`TrainedModel`] build.
#[derive(Default)]
pub struct TrainedModelBuilder {
    images: Vec<GrayImage>,
}

impl TrainedModelBuilder {
    pub fn new() -> TrainedModelBuilder {
        TrainedModelBuilder::default()
    }

    pub fn add_train_image(mut self, image: GrayImage) -> TrainedModelBuilder {
        self.images.push(image);
        self
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn build<E: FeatureExtractor>(self, extractor: &E) -> Result<TrainedModel, TrainingError> {
        TrainedModel::from_images(&self.images, extractor)
    }
}

impl Extend<GrayImage> for TrainedModelBuilder {
    fn extend<T: IntoIterator<Item = GrayImage>>(&mut self, iter: T) {
        self.images.extend(iter);
    }
}
