pub mod fast;
pub mod orb;
pub mod pyramid;

use image::GrayImage;

use crate::types::Features;

pub use orb::OrbExtractor;

/// Turns an image into keypoints with co-indexed descriptors.
///
/// Implementations must be deterministic and return an empty set, not a
/// failure, for degenerate images.
pub trait FeatureExtractor: Send + Sync {
    fn extract(&self, image: &GrayImage) -> Features;

    /// Grid step under which extraction commutes with translating the image.
    ///
    /// Crops whose origin is a multiple of this value yield the same interior
    /// features as the full image, shifted.
    fn alignment(&self) -> u32 {
        1
    }
}

impl<T: FeatureExtractor + ?Sized> FeatureExtractor for std::sync::Arc<T> {
    fn extract(&self, image: &GrayImage) -> Features {
        (**self).extract(image)
    }

    fn alignment(&self) -> u32 {
        (**self).alignment()
    }
}
