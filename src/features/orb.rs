//! ORB-style extractor: FAST keypoints on a box pyramid, intensity-centroid
//! orientation and steered 256-bit BRIEF descriptors.

use std::cmp::Ordering;

use glam::Vec2;
use image::GrayImage;
use log::trace;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::fast::FastDetector;
use super::pyramid::Pyramid;
use super::FeatureExtractor;
use crate::config::OrbConfig;
use crate::types::{Descriptor, Features, Keypoint};

/// Radius of the disc the BRIEF test points and the orientation moments use.
const PATCH_RADIUS: i32 = 12;
/// Half size of the box each BRIEF test point is averaged over.
const SMOOTH_RADIUS: i32 = 2;
/// Keypoints closer than this to a level border have no complete patch.
pub const EDGE_THRESHOLD: u32 = 16;

const DESCRIPTOR_BITS: usize = 256;

/// Summed-area table for constant-time box sums.
struct IntegralImage {
    stride: usize,
    sums: Vec<u32>,
}

impl IntegralImage {
    fn new(img: &GrayImage) -> IntegralImage {
        let w = img.width() as usize;
        let h = img.height() as usize;
        let stride = w + 1;
        let mut sums = vec![0u32; stride * (h + 1)];
        let data = img.as_raw();
        for y in 0..h {
            let mut row = 0u32;
            for x in 0..w {
                row = row.wrapping_add(data[y * w + x] as u32);
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1].wrapping_add(row);
            }
        }
        IntegralImage { stride, sums }
    }

    /// Sum over the `(2r+1)²` box centred on `(x, y)`. The box must lie inside the image.
    ///
    /// Wrapping arithmetic stays exact as long as the box sum itself fits in `u32`.
    fn box_sum(&self, x: i32, y: i32, r: i32) -> u32 {
        let x0 = (x - r) as usize;
        let y0 = (y - r) as usize;
        let x1 = (x + r + 1) as usize;
        let y1 = (y + r + 1) as usize;
        let s = self.stride;
        self.sums[y1 * s + x1]
            .wrapping_add(self.sums[y0 * s + x0])
            .wrapping_sub(self.sums[y0 * s + x1])
            .wrapping_sub(self.sums[y1 * s + x0])
    }
}

#[derive(Clone)]
pub struct OrbExtractor {
    config: OrbConfig,
    fast: FastDetector,
    /// BRIEF point pairs relative to the keypoint, before steering.
    pattern: Vec<[Vec2; 2]>,
    /// Half width of each row of the orientation disc.
    disc_half_widths: Vec<i32>,
}

impl OrbExtractor {
    pub fn new(config: OrbConfig) -> OrbExtractor {
        let fast = FastDetector::new(config.fast_threshold, config.arc_length);
        let pattern = sampling_pattern(config.pattern_seed);
        let disc_half_widths = (-PATCH_RADIUS..=PATCH_RADIUS)
            .map(|dy| ((PATCH_RADIUS * PATCH_RADIUS - dy * dy) as f32).sqrt().floor() as i32)
            .collect();
        OrbExtractor {
            config,
            fast,
            pattern,
            disc_half_widths,
        }
    }

    pub fn config(&self) -> &OrbConfig {
        &self.config
    }

    fn orientation(&self, img: &GrayImage, x: i32, y: i32) -> f32 {
        let mut m01 = 0i64;
        let mut m10 = 0i64;
        for (row, &half) in self.disc_half_widths.iter().enumerate() {
            let dy = row as i32 - PATCH_RADIUS;
            for dx in -half..=half {
                let v = img.get_pixel((x + dx) as u32, (y + dy) as u32)[0] as i64;
                m10 += dx as i64 * v;
                m01 += dy as i64 * v;
            }
        }
        (m01 as f32).atan2(m10 as f32)
    }

    fn describe(&self, integral: &IntegralImage, x: i32, y: i32, angle: f32) -> Descriptor {
        let (sin, cos) = angle.sin_cos();
        let steer = |p: Vec2| -> (i32, i32) {
            (
                (cos * p.x - sin * p.y).round() as i32,
                (sin * p.x + cos * p.y).round() as i32,
            )
        };
        let mut descriptor: Descriptor = [0; 32];
        for (bit, [a, b]) in self.pattern.iter().enumerate() {
            let (ax, ay) = steer(*a);
            let (bx, by) = steer(*b);
            let va = integral.box_sum(x + ax, y + ay, SMOOTH_RADIUS);
            let vb = integral.box_sum(x + bx, y + by, SMOOTH_RADIUS);
            if va < vb {
                descriptor[bit / 8] |= 1 << (bit % 8);
            }
        }
        descriptor
    }

    fn extract_level(&self, img: &GrayImage, level: usize, out: &mut Vec<(Keypoint, Descriptor)>) {
        let (w, h) = img.dimensions();
        let integral = IntegralImage::new(img);
        let scale = (1u32 << level) as f32;
        let corners = self.fast.detect(img);
        let before = out.len();
        for c in corners {
            if c.x < EDGE_THRESHOLD
                || c.y < EDGE_THRESHOLD
                || c.x >= w - EDGE_THRESHOLD
                || c.y >= h - EDGE_THRESHOLD
            {
                continue;
            }
            let (x, y) = (c.x as i32, c.y as i32);
            let angle = if self.config.oriented {
                self.orientation(img, x, y)
            } else {
                0.0
            };
            // centre of the level pixel in level-0 coordinates
            let position = Vec2::new(
                c.x as f32 * scale + (scale - 1.0) / 2.0,
                c.y as f32 * scale + (scale - 1.0) / 2.0,
            );
            let keypoint = Keypoint {
                position,
                scale,
                angle,
                response: c.score,
                level: level as u8,
            };
            out.push((keypoint, self.describe(&integral, x, y, angle)));
        }
        trace!("level {} ({}x{}): {} keypoints", level, w, h, out.len() - before);
    }
}

impl Default for OrbExtractor {
    fn default() -> Self {
        OrbExtractor::new(OrbConfig::default())
    }
}

impl FeatureExtractor for OrbExtractor {
    fn extract(&self, image: &GrayImage) -> Features {
        let min_size = 2 * EDGE_THRESHOLD + 1;
        if image.width() < min_size || image.height() < min_size {
            return Features::default();
        }
        let pyramid = Pyramid::build(image, self.config.pyramid_levels, min_size);
        let mut candidates = Vec::new();
        for (level, img) in pyramid.levels() {
            self.extract_level(img, level, &mut candidates);
        }

        // stable sort keeps level and raster order among equal responses
        candidates.sort_by(|a, b| {
            b.0.response
                .partial_cmp(&a.0.response)
                .unwrap_or(Ordering::Equal)
        });
        candidates.truncate(self.config.max_features);

        let mut features = Features::default();
        for (keypoint, descriptor) in candidates {
            features.push(keypoint, descriptor);
        }
        features
    }

    fn alignment(&self) -> u32 {
        1 << self.config.pyramid_levels.clamp(1, 16).saturating_sub(1)
    }
}

/// Draws the BRIEF test pairs uniformly inside the patch disc.
fn sampling_pattern(seed: u64) -> Vec<[Vec2; 2]> {
    fn sample_point(rng: &mut ChaCha8Rng) -> Vec2 {
        loop {
            let x = rng.random_range(-PATCH_RADIUS..=PATCH_RADIUS);
            let y = rng.random_range(-PATCH_RADIUS..=PATCH_RADIUS);
            if x * x + y * y <= PATCH_RADIUS * PATCH_RADIUS {
                return Vec2::new(x as f32, y as f32);
            }
        }
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut pattern = Vec::with_capacity(DESCRIPTOR_BITS);
    while pattern.len() < DESCRIPTOR_BITS {
        let a = sample_point(&mut rng);
        let b = sample_point(&mut rng);
        if a != b {
            pattern.push([a, b]);
        }
    }
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn pattern_is_deterministic_and_inside_patch() {
        let p0 = sampling_pattern(7);
        let p1 = sampling_pattern(7);
        assert_eq!(p0, p1);
        assert_eq!(p0.len(), DESCRIPTOR_BITS);
        let r = PATCH_RADIUS as f32;
        assert!(p0.iter().flatten().all(|p| p.length() <= r));
    }

    #[test]
    fn integral_box_sum_matches_direct_sum() {
        let img = GrayImage::from_fn(9, 7, |x, y| Luma([(x * 7 + y * 3) as u8]));
        let integral = IntegralImage::new(&img);
        let direct: u32 = (1..=5)
            .flat_map(|y| (2..=6).map(move |x| (x, y)))
            .map(|(x, y)| img.get_pixel(x, y)[0] as u32)
            .sum();
        assert_eq!(integral.box_sum(4, 3, 2), direct);
    }

    #[test]
    fn orientation_points_towards_bright_side() {
        let extractor = OrbExtractor::default();
        let img = GrayImage::from_fn(40, 40, |x, _| Luma([if x > 20 { 200 } else { 10 }]));
        let angle = extractor.orientation(&img, 20, 20);
        assert!(angle.abs() < 1e-3, "angle {}", angle);
    }

    #[test]
    fn alignment_follows_pyramid_depth() {
        let one = OrbExtractor::new(OrbConfig {
            pyramid_levels: 1,
            ..Default::default()
        });
        assert_eq!(one.alignment(), 1);
        assert_eq!(OrbExtractor::default().alignment(), 4);
    }
}
