use glam::Vec2;
use serde::{Deserialize, Serialize};

/// 256-bit binary descriptor, compared with Hamming distance.
pub type Descriptor = [u8; 32];

/// Pixel width and height of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> ImageSize {
        ImageSize { width, height }
    }

    pub fn of(img: &image::GrayImage) -> ImageSize {
        ImageSize::new(img.width(), img.height())
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Corners in clockwise order starting at the origin.
    pub fn corners(&self) -> [Vec2; 4] {
        let w = self.width as f32;
        let h = self.height as f32;
        [Vec2::ZERO, Vec2::new(w, 0.0), Vec2::new(w, h), Vec2::new(0.0, h)]
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Salient image location in level-0 pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub position: Vec2,
    /// Pyramid scale factor, `2^level`.
    pub scale: f32,
    /// Patch orientation in radians.
    pub angle: f32,
    /// FAST corner score.
    pub response: f32,
    pub level: u8,
}

/// Keypoints with their co-indexed descriptors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Features {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
}

impl Features {
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn push(&mut self, keypoint: Keypoint, descriptor: Descriptor) {
        self.keypoints.push(keypoint);
        self.descriptors.push(descriptor);
    }
}

/// Axis-aligned pixel rectangle inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Region {
        Region {
            x,
            y,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }

    /// Clamps the region to an image of `size`. Returns `None` when nothing is left.
    pub fn clamp_to(&self, size: ImageSize) -> Option<Region> {
        if self.x >= size.width || self.y >= size.height {
            return None;
        }
        let width = self.width.min(size.width - self.x);
        let height = self.height.min(size.height - self.y);
        if width == 0 || height == 0 {
            None
        } else {
            Some(Region::new(self.x, self.y, width, height))
        }
    }
}

/// Outcome of one `detect_in` call.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Top-left corner of the object in frame coordinates, when found.
    pub offset: Option<Vec2>,
    /// Geometric inliers supporting the detection. Zero when bridged.
    pub inliers: usize,
    /// The offset was carried over from an earlier frame.
    pub bridged: bool,
}

impl DetectionResult {
    pub fn not_found() -> DetectionResult {
        DetectionResult::default()
    }

    pub fn found_at(offset: Vec2, inliers: usize) -> DetectionResult {
        DetectionResult {
            offset: Some(offset),
            inliers,
            bridged: false,
        }
    }

    pub fn bridged_at(offset: Vec2) -> DetectionResult {
        DetectionResult {
            offset: Some(offset),
            inliers: 0,
            bridged: true,
        }
    }

    pub fn found(&self) -> bool {
        self.offset.is_some()
    }

    pub fn translated(self, delta: Vec2) -> DetectionResult {
        DetectionResult {
            offset: self.offset.map(|o| o + delta),
            ..self
        }
    }
}
