use log::{debug, trace};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use super::{Correspondence, PlanarTransform};
use crate::config::{RansacConfig, TransformKind};

/// Best consensus found by [`estimate`].
#[derive(Debug, Clone)]
pub struct RansacEstimate {
    pub transform: PlanarTransform,
    /// Indices of the correspondences within tolerance of `transform`.
    pub inliers: Vec<usize>,
    pub iterations: usize,
}

fn collect_inliers(
    transform: &PlanarTransform,
    correspondences: &[Correspondence],
    tolerance: f32,
) -> Vec<usize> {
    correspondences
        .iter()
        .enumerate()
        .filter(|(_, c)| transform.reprojection_error(c) <= tolerance)
        .map(|(i, _)| i)
        .collect()
}

/// Iterations needed to draw one outlier-free sample with probability `confidence`.
fn required_iterations(inliers: usize, total: usize, sample_size: usize, confidence: f64) -> usize {
    let w = inliers as f64 / total as f64;
    let p_good = w.powi(sample_size as i32);
    if p_good >= 1.0 - f64::EPSILON {
        return 1;
    }
    if p_good <= f64::EPSILON {
        return usize::MAX;
    }
    let confidence = confidence.clamp(0.0, 1.0 - 1e-12);
    ((1.0 - confidence).ln() / (1.0 - p_good).ln()).ceil().max(1.0) as usize
}

/// Robustly fits `kind` to `correspondences`.
///
/// Sampling is seeded from `config.seed`, so the same input always gives the
/// same estimate. The largest consensus wins, the first one found on ties;
/// it is then refitted on all its inliers unless that loses support.
pub fn estimate(
    kind: TransformKind,
    correspondences: &[Correspondence],
    config: &RansacConfig,
) -> Option<RansacEstimate> {
    let n = correspondences.len();
    let sample_size = kind.sample_size();
    if n < sample_size {
        return None;
    }
    let tolerance = config.reprojection_tolerance;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut indices: Vec<usize> = (0..n).collect();
    let mut sample = Vec::with_capacity(sample_size);

    let mut best: Option<(PlanarTransform, Vec<usize>)> = None;
    let mut max_iterations = config.max_iterations;
    let mut iterations = 0;
    while iterations < max_iterations {
        iterations += 1;
        let (picked, _) = indices.partial_shuffle(&mut rng, sample_size);
        sample.clear();
        sample.extend(picked.iter().map(|&i| correspondences[i]));
        let Some(candidate) = kind.fit_minimal(&sample) else {
            continue;
        };
        let inliers = collect_inliers(&candidate, correspondences, tolerance);
        if best.as_ref().is_none_or(|(_, b)| inliers.len() > b.len()) {
            max_iterations = max_iterations.min(required_iterations(
                inliers.len(),
                n,
                sample_size,
                config.confidence,
            ));
            let all = inliers.len() == n;
            best = Some((candidate, inliers));
            if all {
                break;
            }
        }
    }

    let (transform, inliers) = best?;
    trace!(
        "ransac: {} / {} inliers after {} iterations",
        inliers.len(),
        n,
        iterations
    );

    let inlier_set: Vec<Correspondence> = inliers.iter().map(|&i| correspondences[i]).collect();
    if let Some(refit) = kind.fit(&inlier_set) {
        let refit_inliers = collect_inliers(&refit, correspondences, tolerance);
        if refit_inliers.len() >= inliers.len() {
            return Some(RansacEstimate {
                transform: refit,
                inliers: refit_inliers,
                iterations,
            });
        }
        debug!(
            "refit lost support ({} < {}), keeping minimal-sample model",
            refit_inliers.len(),
            inliers.len()
        );
    }
    Some(RansacEstimate {
        transform,
        inliers,
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use rand::Rng;

    fn scene(outliers: usize) -> Vec<Correspondence> {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let shift = Vec2::new(50.0, 30.0);
        let mut out: Vec<Correspondence> = (0..40)
            .map(|_| {
                let model = Vec2::new(rng.random_range(0.0..100.0), rng.random_range(0.0..80.0));
                Correspondence {
                    model,
                    frame: model + shift,
                }
            })
            .collect();
        for _ in 0..outliers {
            out.push(Correspondence {
                model: Vec2::new(rng.random_range(0.0..100.0), rng.random_range(0.0..80.0)),
                frame: Vec2::new(rng.random_range(0.0..320.0), rng.random_range(0.0..240.0)),
            });
        }
        out
    }

    #[test]
    fn iterations_shrink_with_inlier_ratio() {
        assert_eq!(required_iterations(10, 10, 4, 0.99), 1);
        let half = required_iterations(50, 100, 4, 0.99);
        let most = required_iterations(90, 100, 4, 0.99);
        assert!(most < half);
        assert_eq!(required_iterations(0, 100, 4, 0.99), usize::MAX);
    }

    #[test]
    fn translation_survives_outliers() {
        let data = scene(30);
        let est = estimate(TransformKind::Translation, &data, &RansacConfig::default()).unwrap();
        assert!(est.inliers.len() >= 40);
        let offset = est.transform.apply(Vec2::ZERO).unwrap();
        assert!(offset.distance(Vec2::new(50.0, 30.0)) < 0.5, "{offset}");
    }

    #[test]
    fn homography_survives_outliers() {
        let data = scene(30);
        let est = estimate(TransformKind::Homography, &data, &RansacConfig::default()).unwrap();
        assert!(est.inliers.len() >= 40);
        let offset = est.transform.apply(Vec2::ZERO).unwrap();
        assert!(offset.distance(Vec2::new(50.0, 30.0)) < 0.5, "{offset}");
    }

    #[test]
    fn same_seed_same_estimate() {
        let data = scene(20);
        let cfg = RansacConfig::default();
        let a = estimate(TransformKind::Homography, &data, &cfg).unwrap();
        let b = estimate(TransformKind::Homography, &data, &cfg).unwrap();
        assert_eq!(a.transform, b.transform);
        assert_eq!(a.inliers, b.inliers);
    }

    #[test]
    fn too_few_correspondences() {
        let data = scene(0);
        assert!(estimate(TransformKind::Homography, &data[..3], &RansacConfig::default()).is_none());
    }
}
