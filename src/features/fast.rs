//! FAST-N corner detection with 3×3 non-maximum suppression.
//!
//! Each pixel is compared with the 16 pixels of a Bresenham circle of radius
//! 3. It is a corner when at least `arc_length` contiguous circle pixels are
//! all brighter than `center + threshold` or all darker than
//! `center - threshold`.

use image::GrayImage;

/// Circle of radius 3, clockwise from 12 o'clock.
const CIRCLE_OFFSETS: [(i32, i32); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

const CARDINALS: [usize; 4] = [0, 4, 8, 12];

/// Corner in pixel coordinates of the image it was detected in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    pub x: u32,
    pub y: u32,
    /// Sum of `|diff| - threshold` over the qualifying circle pixels.
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct FastDetector {
    pub threshold: u8,
    pub arc_length: usize,
}

impl FastDetector {
    /// `arc_length` is clamped to 9..=12.
    pub fn new(threshold: u8, arc_length: usize) -> FastDetector {
        FastDetector {
            threshold,
            arc_length: arc_length.clamp(9, 12),
        }
    }

    /// Corner scores for every pixel, row-major. Zero marks "not a corner".
    pub fn score_map(&self, img: &GrayImage) -> Vec<f32> {
        let w = img.width() as usize;
        let h = img.height() as usize;
        let mut scores = vec![0.0; w * h];
        if w <= 6 || h <= 6 {
            return scores;
        }

        let data = img.as_raw();
        let offsets: Vec<isize> = CIRCLE_OFFSETS
            .iter()
            .map(|&(dx, dy)| dy as isize * w as isize + dx as isize)
            .collect();
        let thresh = self.threshold as i16;
        let min_cardinals = if self.arc_length >= 12 { 3 } else { 2 };

        for y in 3..h - 3 {
            for x in 3..w - 3 {
                let idx = y * w + x;
                let center = data[idx] as i16;
                let at = |k: usize| data[(idx as isize + offsets[k]) as usize] as i16;

                let (bright, dark) = CARDINALS.iter().fold((0, 0), |(b, d), &k| {
                    let v = at(k);
                    (
                        b + (v > center + thresh) as usize,
                        d + (v < center - thresh) as usize,
                    )
                });
                if bright < min_cardinals && dark < min_cardinals {
                    continue;
                }

                let mut circle = [0i16; 16];
                for (k, v) in circle.iter_mut().enumerate() {
                    *v = at(k);
                }
                scores[idx] = self.corner_score(center, &circle, thresh);
            }
        }
        scores
    }

    /// Detects corners, keeping only 3×3 local maxima of the score.
    ///
    /// Equal scores are resolved in favour of the earlier pixel in raster order.
    pub fn detect(&self, img: &GrayImage) -> Vec<Corner> {
        let w = img.width() as usize;
        let h = img.height() as usize;
        let scores = self.score_map(img);
        let mut corners = Vec::new();
        if w <= 6 || h <= 6 {
            return corners;
        }

        for y in 3..h - 3 {
            for x in 3..w - 3 {
                let idx = y * w + x;
                let s = scores[idx];
                if s <= 0.0 {
                    continue;
                }
                let mut is_max = true;
                'window: for ny in y - 1..=y + 1 {
                    for nx in x - 1..=x + 1 {
                        let nidx = ny * w + nx;
                        if nidx == idx {
                            continue;
                        }
                        let ns = scores[nidx];
                        if ns > s || (ns == s && nidx < idx) {
                            is_max = false;
                            break 'window;
                        }
                    }
                }
                if is_max {
                    corners.push(Corner {
                        x: x as u32,
                        y: y as u32,
                        score: s,
                    });
                }
            }
        }
        corners
    }

    fn corner_score(&self, center: i16, circle: &[i16; 16], thresh: i16) -> f32 {
        let mut bright_mask: u16 = 0;
        let mut dark_mask: u16 = 0;
        let mut bright_sum = 0i32;
        let mut dark_sum = 0i32;
        for (i, &v) in circle.iter().enumerate() {
            let diff = v - center;
            if diff > thresh {
                bright_mask |= 1 << i;
                bright_sum += (diff - thresh) as i32;
            } else if diff < -thresh {
                dark_mask |= 1 << i;
                dark_sum += (-diff - thresh) as i32;
            }
        }

        let mut score = 0;
        if has_contiguous_run(bright_mask, self.arc_length) {
            score = bright_sum;
        }
        if has_contiguous_run(dark_mask, self.arc_length) {
            score = score.max(dark_sum);
        }
        score as f32
    }
}

/// True when `mask`, read as a circle of 16 bits, holds `n` consecutive set bits.
fn has_contiguous_run(mask: u16, n: usize) -> bool {
    let mut m = (mask as u32) | ((mask as u32) << 16);
    for _ in 1..n {
        m &= m >> 1;
    }
    m != 0
}
