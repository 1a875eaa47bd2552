use image::{GrayImage, Luma};

/// Grayscale image pyramid; every level halves the previous one with a 2×2 box filter.
///
/// Level 0 borrows the source image.
pub struct Pyramid<'a> {
    base: &'a GrayImage,
    upper: Vec<GrayImage>,
}

impl<'a> Pyramid<'a> {
    /// Builds at most `num_levels` levels, stopping before a level would be
    /// narrower or shorter than `min_size`.
    pub fn build(base: &'a GrayImage, num_levels: usize, min_size: u32) -> Pyramid<'a> {
        let mut upper: Vec<GrayImage> = Vec::new();
        for _ in 1..num_levels.max(1) {
            let prev = upper.last().unwrap_or(base);
            if prev.width() / 2 < min_size || prev.height() / 2 < min_size {
                break;
            }
            let next = downsample_2x(prev);
            upper.push(next);
        }
        Pyramid { base, upper }
    }

    pub fn num_levels(&self) -> usize {
        1 + self.upper.len()
    }

    pub fn level(&self, level: usize) -> &GrayImage {
        if level == 0 {
            self.base
        } else {
            &self.upper[level - 1]
        }
    }

    pub fn levels(&self) -> impl Iterator<Item = (usize, &GrayImage)> {
        std::iter::once(self.base).chain(self.upper.iter()).enumerate()
    }
}

fn downsample_2x(src: &GrayImage) -> GrayImage {
    GrayImage::from_fn(src.width() / 2, src.height() / 2, |x, y| {
        let sum = src.get_pixel(2 * x, 2 * y)[0] as u16
            + src.get_pixel(2 * x + 1, 2 * y)[0] as u16
            + src.get_pixel(2 * x, 2 * y + 1)[0] as u16
            + src.get_pixel(2 * x + 1, 2 * y + 1)[0] as u16;
        Luma([((sum + 2) / 4) as u8])
    })
}
