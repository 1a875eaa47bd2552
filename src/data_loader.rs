use std::path::{Path, PathBuf};

use glob::glob;
use image::{GrayImage, ImageReader};
use indicatif::ParallelProgressIterator;
use log::{info, warn};
use rayon::prelude::*;

use crate::error::TrainingError;
use crate::features::FeatureExtractor;
use crate::model::TrainedModel;

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "pgm"];

fn img_filter(rp: glob::GlobResult) -> Option<PathBuf> {
    let p = rp.ok()?;
    let ext = p.extension()?.to_string_lossy().to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str()).then_some(p)
}

/// Image files directly inside `folder`, sorted by path.
pub fn list_images(folder: &str) -> Result<Vec<PathBuf>, glob::PatternError> {
    let pattern = format!("{}/*", glob::Pattern::escape(folder));
    let mut paths: Vec<PathBuf> = glob(&pattern)?.filter_map(img_filter).collect();
    paths.sort();
    Ok(paths)
}

/// Decodes an image file as 8-bit grayscale. Failures are logged and yield `None`.
pub fn load_gray(path: &Path) -> Option<GrayImage> {
    let decoded = ImageReader::open(path)
        .map_err(image::ImageError::IoError)
        .and_then(|reader| reader.with_guessed_format().map_err(image::ImageError::IoError))
        .and_then(|reader| reader.decode());
    match decoded {
        Ok(img) => Some(img.to_luma8()),
        Err(e) => {
            warn!("cannot decode {}: {}", path.display(), e);
            None
        }
    }
}

/// Loads every decodable image of `folder` in path order.
pub fn load_train_folder(folder: &str) -> Result<Vec<GrayImage>, TrainingError> {
    let paths = list_images(folder).map_err(|e| TrainingError::Folder {
        path: folder.to_string(),
        message: e.to_string(),
    })?;
    log::trace!("{} candidate training files in {}", paths.len(), folder);
    let images: Vec<GrayImage> = paths
        .par_iter()
        .progress_count(paths.len() as u64)
        .filter_map(|p| load_gray(p))
        .collect();
    if images.is_empty() {
        return Err(TrainingError::EmptyTrainingSet);
    }
    info!("loaded {} training images from {}", images.len(), folder);
    Ok(images)
}

/// Builds a model from the training images in `folder`.
pub fn create_from_train_folder<E: FeatureExtractor>(
    folder: &str,
    extractor: &E,
) -> Result<TrainedModel, TrainingError> {
    let images = load_train_folder(folder)?;
    TrainedModel::from_images(&images, extractor)
}

/// Frames of `folder` in path order, decoded lazily.
///
/// A file that fails to decode yields an empty image, which detectors report
/// as "not found" without interrupting the sequence.
pub fn frames(
    folder: &str,
) -> Result<impl Iterator<Item = (PathBuf, GrayImage)> + use<>, glob::PatternError> {
    let paths = list_images(folder)?;
    Ok(paths.into_iter().map(|p| {
        let img = load_gray(&p).unwrap_or_else(|| GrayImage::new(0, 0));
        (p, img)
    }))
}
