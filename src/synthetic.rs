//! Synthetic scenes: a textured planar object pasted into flat frames.
//!
//! Used by the test suite, the benchmarks and `pdrs generate`.

use image::{GrayImage, Luma};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Random block texture with strong corners at block junctions.
pub fn textured_object(width: u32, height: u32, block: u32, seed: u64) -> GrayImage {
    let block = block.max(1);
    let cols = width.div_ceil(block) as usize;
    let rows = height.div_ceil(block) as usize;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let levels: Vec<u8> = (0..cols * rows).map(|_| rng.random()).collect();
    GrayImage::from_fn(width, height, |x, y| {
        let cell = (y / block) as usize * cols + (x / block) as usize;
        Luma([levels[cell]])
    })
}

pub fn solid_frame(width: u32, height: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([value]))
}

/// Copies `object` into `frame` with its top-left corner at `(x, y)`, clipping at the borders.
pub fn paste(frame: &mut GrayImage, object: &GrayImage, x: i64, y: i64) {
    image::imageops::replace(frame, object, x, y);
}

/// Frame of `width`×`height` filled with `background`, with `object` at `offset` when given.
pub fn frame_with_object(
    width: u32,
    height: u32,
    background: u8,
    object: &GrayImage,
    offset: Option<(i64, i64)>,
) -> GrayImage {
    let mut frame = solid_frame(width, height, background);
    if let Some((x, y)) = offset {
        paste(&mut frame, object, x, y);
    }
    frame
}

/// Object offset for each frame of a sequence that drifts by `step` per frame
/// from `start`, with the object hidden on the frames listed in `absent`.
pub fn drifting_offsets(
    frames: usize,
    start: (i64, i64),
    step: (i64, i64),
    absent: &[usize],
) -> Vec<Option<(i64, i64)>> {
    (0..frames)
        .map(|i| {
            if absent.contains(&i) {
                None
            } else {
                Some((start.0 + step.0 * i as i64, start.1 + step.1 * i as i64))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_is_reproducible() {
        let a = textured_object(30, 20, 6, 3);
        let b = textured_object(30, 20, 6, 3);
        assert_eq!(a, b);
        assert_ne!(a, textured_object(30, 20, 6, 4));
        assert_eq!(a.get_pixel(0, 0), a.get_pixel(5, 5));
    }

    #[test]
    fn paste_clips_at_border() {
        let obj = solid_frame(10, 10, 200);
        let frame = frame_with_object(20, 20, 0, &obj, Some((15, -5)));
        assert_eq!(frame.get_pixel(19, 0)[0], 200);
        assert_eq!(frame.get_pixel(14, 0)[0], 0);
        assert_eq!(frame.get_pixel(19, 5)[0], 0);
    }

    #[test]
    fn offsets_skip_absent_frames() {
        let offsets = drifting_offsets(4, (10, 20), (2, 0), &[2]);
        assert_eq!(offsets, vec![Some((10, 20)), Some((12, 20)), None, Some((16, 20))]);
    }
}
