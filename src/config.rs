use serde::{Deserialize, Serialize};

/// Feature extraction settings for [`crate::features::orb::OrbExtractor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbConfig {
    /// FAST intensity threshold.
    pub fast_threshold: u8,
    /// Contiguous circle pixels required by FAST, 9..=12.
    pub arc_length: usize,
    /// Strongest keypoints kept per image, over all pyramid levels.
    pub max_features: usize,
    pub pyramid_levels: usize,
    /// Steer descriptors by the intensity-centroid orientation.
    pub oriented: bool,
    /// Seed of the BRIEF sampling pattern. Models and frames must agree on it.
    pub pattern_seed: u64,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            fast_threshold: 20,
            arc_length: 9,
            max_features: 1000,
            pyramid_levels: 3,
            oriented: true,
            pattern_seed: 0x5eed_b71e,
        }
    }
}

/// Geometric model fitted between model and frame keypoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    Translation,
    Homography,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacConfig {
    pub max_iterations: usize,
    /// Inlier threshold on the reprojection error, in pixels.
    pub reprojection_tolerance: f32,
    /// Stop early once a sample free of outliers was drawn with this probability.
    pub confidence: f64,
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            reprojection_tolerance: 3.0,
            confidence: 0.995,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticDetectorConfig {
    /// Matches with a larger Hamming distance are rejected.
    pub max_descriptor_distance: u32,
    /// Optional best / second-best distance ratio test.
    pub ratio_test: Option<f32>,
    /// Minimum matches before fitting, and minimum inliers after fitting.
    pub min_inliers: usize,
    pub transform: TransformKind,
    pub ransac: RansacConfig,
}

impl Default for StaticDetectorConfig {
    fn default() -> Self {
        Self {
            max_descriptor_distance: 32,
            ratio_test: Some(0.8),
            min_inliers: 10,
            transform: TransformKind::Homography,
            ransac: RansacConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicDetectorConfig {
    /// Consecutive misses bridged with the last known offset.
    pub miss_tolerance: usize,
    /// Margin around the last known position searched first while tracking.
    pub search_radius: Option<u32>,
    /// Exponential smoothing weight of the previous offset.
    ///
    /// Read through [`DynamicDetectorConfig::smoothing_weight`]: values are
    /// clamped to `[0, 0.99]` and a non-finite value disables smoothing.
    pub smoothing: f32,
}

impl DynamicDetectorConfig {
    /// Effective weight of the previous offset, in `[0, 0.99]`.
    pub fn smoothing_weight(&self) -> f32 {
        if self.smoothing.is_finite() {
            self.smoothing.clamp(0.0, 0.99)
        } else {
            0.0
        }
    }
}

impl Default for DynamicDetectorConfig {
    fn default() -> Self {
        Self {
            miss_tolerance: 2,
            search_radius: Some(48),
            smoothing: 0.0,
        }
    }
}

/// Every tunable of the pipeline, loadable from a single JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub extractor: OrbConfig,
    pub detector: StaticDetectorConfig,
    pub tracker: DynamicDetectorConfig,
}
