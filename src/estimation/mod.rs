pub mod homography;
pub mod ransac;
pub mod translation;

use glam::Vec2;
use nalgebra as na;

use crate::config::TransformKind;
use crate::types::ImageSize;

pub use ransac::{RansacEstimate, estimate};

/// A model keypoint and the frame keypoint it was matched to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    pub model: Vec2,
    pub frame: Vec2,
}

/// Mapping from training-image coordinates to frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlanarTransform {
    Translation(Vec2),
    Homography(na::Matrix3<f64>),
}

impl PlanarTransform {
    pub fn apply(&self, p: Vec2) -> Option<Vec2> {
        match self {
            PlanarTransform::Translation(t) => Some(p + *t),
            PlanarTransform::Homography(h) => homography::project(h, p),
        }
    }

    /// Distance between the mapped model point and the frame point.
    pub fn reprojection_error(&self, c: &Correspondence) -> f32 {
        self.apply(c.model)
            .map(|p| p.distance(c.frame))
            .unwrap_or(f32::INFINITY)
    }

    /// Rejects mappings that fold or mirror a rectangle of `size`.
    ///
    /// The projected corners must stay in front of the camera and form a
    /// convex quad with the same winding.
    pub fn keeps_shape(&self, size: ImageSize) -> bool {
        let PlanarTransform::Homography(h) = self else {
            return true;
        };
        let mut projected = [Vec2::ZERO; 4];
        for (dst, corner) in projected.iter_mut().zip(size.corners()) {
            let w = h[(2, 0)] * corner.x as f64 + h[(2, 1)] * corner.y as f64 + h[(2, 2)];
            if w <= f64::EPSILON {
                return false;
            }
            match homography::project(h, corner) {
                Some(p) => *dst = p,
                None => return false,
            }
        }
        (0..4).all(|i| {
            let a = projected[i];
            let b = projected[(i + 1) % 4];
            let c = projected[(i + 2) % 4];
            (b - a).perp_dot(c - b) > 0.0
        })
    }
}

impl TransformKind {
    /// Correspondences needed to determine the transform.
    pub fn sample_size(self) -> usize {
        match self {
            TransformKind::Translation => 1,
            TransformKind::Homography => 4,
        }
    }

    /// Exact fit to a minimal sample.
    pub fn fit_minimal(self, sample: &[Correspondence]) -> Option<PlanarTransform> {
        match self {
            TransformKind::Translation => translation::fit(sample).map(PlanarTransform::Translation),
            TransformKind::Homography => {
                homography::solve_four_point(sample).map(PlanarTransform::Homography)
            }
        }
    }

    /// Least-squares fit to any number of correspondences.
    pub fn fit(self, correspondences: &[Correspondence]) -> Option<PlanarTransform> {
        match self {
            TransformKind::Translation => {
                translation::fit(correspondences).map(PlanarTransform::Translation)
            }
            TransformKind::Homography => {
                homography::fit_dlt(correspondences).map(PlanarTransform::Homography)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_keeps_any_shape() {
        let t = PlanarTransform::Translation(Vec2::new(5.0, -2.0));
        assert!(t.keeps_shape(ImageSize::new(10, 10)));
        assert_eq!(t.apply(Vec2::ZERO), Some(Vec2::new(5.0, -2.0)));
    }

    #[test]
    fn mirrored_homography_is_rejected() {
        let mirror = na::Matrix3::new(-1.0, 0.0, 100.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        assert!(!PlanarTransform::Homography(mirror).keeps_shape(ImageSize::new(50, 40)));
        let shift = na::Matrix3::new(1.0, 0.0, 3.0, 0.0, 1.0, 4.0, 0.0, 0.0, 1.0);
        assert!(PlanarTransform::Homography(shift).keeps_shape(ImageSize::new(50, 40)));
    }
}
