use glam::Vec2;
use image::GrayImage;
use log::{debug, info, trace};

use crate::config::DynamicDetectorConfig;
use crate::features::FeatureExtractor;
use crate::static_detector::StaticDetector;
use crate::types::{DetectionResult, ImageSize, Region};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackPhase {
    /// No prior detection; every frame gets a full static search.
    #[default]
    Idle,
    /// The object was seen recently at `TrackState::last_offset`.
    Tracking,
}

/// Per-detector memory carried from one frame to the next. Fixed size.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackState {
    phase: TrackPhase,
    last_offset: Option<Vec2>,
    misses: usize,
    frames: u64,
}

impl TrackState {
    pub fn phase(&self) -> TrackPhase {
        self.phase
    }

    pub fn last_offset(&self) -> Option<Vec2> {
        self.last_offset
    }

    /// Consecutive frames without a fresh detection while tracking.
    pub fn misses(&self) -> usize {
        self.misses
    }

    /// Frames processed since construction or the last reset.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn start_tracking(&mut self, offset: Vec2) {
        self.phase = TrackPhase::Tracking;
        self.last_offset = Some(offset);
        self.misses = 0;
    }

    fn lose(&mut self) {
        self.phase = TrackPhase::Idle;
        self.last_offset = None;
        self.misses = 0;
    }
}

/// Temporal layer over a [`StaticDetector`].
///
/// While tracking, short runs of missed frames are bridged with the last
/// known offset, and the search starts in a window around it.
pub struct DynamicDetector<E: FeatureExtractor> {
    detector: StaticDetector<E>,
    config: DynamicDetectorConfig,
    state: TrackState,
}

impl<E: FeatureExtractor> DynamicDetector<E> {
    pub fn new(detector: StaticDetector<E>, config: DynamicDetectorConfig) -> Self {
        DynamicDetector {
            detector,
            config,
            state: TrackState::default(),
        }
    }

    pub fn static_detector(&self) -> &StaticDetector<E> {
        &self.detector
    }

    pub fn config(&self) -> &DynamicDetectorConfig {
        &self.config
    }

    pub fn state(&self) -> &TrackState {
        &self.state
    }

    pub fn train_image_size(&self) -> ImageSize {
        self.detector.train_image_size()
    }

    /// Forgets the track; the next frame is searched from scratch.
    pub fn reset(&mut self) {
        self.state = TrackState::default();
    }

    pub fn detect_in(&mut self, frame: &GrayImage) -> DetectionResult {
        self.state.frames += 1;
        match (self.state.phase, self.state.last_offset) {
            (TrackPhase::Tracking, Some(last)) => self.track(frame, last),
            _ => self.acquire(frame),
        }
    }

    fn acquire(&mut self, frame: &GrayImage) -> DetectionResult {
        let result = self.detector.detect_in(frame);
        if let Some(offset) = result.offset {
            debug!(
                "frame {}: acquired at ({:.1}, {:.1})",
                self.state.frames, offset.x, offset.y
            );
            self.state.start_tracking(offset);
        }
        result
    }

    fn track(&mut self, frame: &GrayImage, last: Vec2) -> DetectionResult {
        let fresh = self.search(frame, last);
        if let Some(offset) = fresh.offset {
            let s = self.config.smoothing_weight();
            let smoothed = last * s + offset * (1.0 - s);
            self.state.start_tracking(smoothed);
            return DetectionResult {
                offset: Some(smoothed),
                ..fresh
            };
        }

        self.state.misses += 1;
        if self.state.misses <= self.config.miss_tolerance {
            trace!(
                "frame {}: bridging miss {} / {}",
                self.state.frames, self.state.misses, self.config.miss_tolerance
            );
            DetectionResult::bridged_at(last)
        } else {
            info!(
                "frame {}: lost track after {} misses",
                self.state.frames, self.state.misses
            );
            self.state.lose();
            DetectionResult::not_found()
        }
    }

    /// Window search around `last`, falling back to the whole frame.
    fn search(&self, frame: &GrayImage, last: Vec2) -> DetectionResult {
        if let Some(region) = self
            .config
            .search_radius
            .and_then(|radius| self.search_region(ImageSize::of(frame), last, radius))
        {
            let result = self.detector.detect_in_region(frame, region);
            if result.found() {
                return result;
            }
            trace!("window {:?} empty, scanning full frame", region);
        }
        self.detector.detect_in(frame)
    }

    /// Window covering the object at `last` plus `radius` on every side.
    ///
    /// The origin snaps to the extractor alignment so window features equal
    /// full-frame features. `None` when the window would be the whole frame.
    fn search_region(&self, frame: ImageSize, last: Vec2, radius: u32) -> Option<Region> {
        let size = self.detector.train_image_size();
        let align = self.detector.extractor().alignment().max(1);
        let radius = radius as f32;

        let x0 = (last.x - radius).floor().max(0.0) as u32;
        let y0 = (last.y - radius).floor().max(0.0) as u32;
        let x0 = x0 - x0 % align;
        let y0 = y0 - y0 % align;
        let x1 = ((last.x + size.width as f32 + radius).ceil().max(0.0) as u32).min(frame.width);
        let y1 = ((last.y + size.height as f32 + radius).ceil().max(0.0) as u32).min(frame.height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        let region = Region::new(x0, y0, x1 - x0, y1 - y0);
        if region == Region::new(0, 0, frame.width, frame.height) {
            None
        } else {
            Some(region)
        }
    }
}
