use std::sync::Arc;

use glam::Vec2;
use image::GrayImage;
use planar_object_tracker::synthetic::{frame_with_object, paste, solid_frame, textured_object};
use planar_object_tracker::types::Region;
use planar_object_tracker::{
    ImageSize, OrbExtractor, StaticDetector, StaticDetectorConfig, TrainedModel, TransformKind,
};

fn object() -> GrayImage {
    textured_object(100, 80, 6, 7)
}

fn detector_with(config: StaticDetectorConfig) -> StaticDetector<OrbExtractor> {
    let extractor = OrbExtractor::default();
    let model = TrainedModel::from_images(&[object()], &extractor).unwrap();
    StaticDetector::new(Arc::new(model), extractor, config)
}

fn detector() -> StaticDetector<OrbExtractor> {
    detector_with(StaticDetectorConfig::default())
}

fn assert_near(actual: Option<Vec2>, expected: Vec2) {
    let actual = actual.expect("object should be found");
    assert!(
        actual.distance(expected) < 3.0,
        "found at {:?}, expected {:?}",
        actual,
        expected
    );
}

#[test]
fn test_finds_pasted_object() {
    let detector = detector();
    assert_eq!(detector.train_image_size(), ImageSize::new(100, 80));

    let frame = frame_with_object(320, 240, 128, &object(), Some((50, 30)));
    let result = detector.detect_in(&frame);
    assert_near(result.offset, Vec2::new(50.0, 30.0));
    assert!(result.inliers >= detector.config().min_inliers);
    assert!(!result.bridged);
}

#[test]
fn test_finds_object_at_several_positions() {
    let detector = detector();
    for (x, y) in [(0, 0), (220, 160), (120, 70), (14, 150)] {
        let frame = frame_with_object(320, 240, 128, &object(), Some((x, y)));
        let result = detector.detect_in(&frame);
        assert_near(result.offset, Vec2::new(x as f32, y as f32));
    }
}

#[test]
fn test_finds_object_on_textured_background() {
    let detector = detector();
    for block in [6, 9, 15] {
        let mut frame = textured_object(320, 240, block, 555);
        paste(&mut frame, &object(), 60, 40);
        let result = detector.detect_in(&frame);
        assert_near(result.offset, Vec2::new(60.0, 40.0));
        assert!(result.inliers >= detector.config().min_inliers, "block {}", block);
    }
}

#[test]
fn test_solid_frame_is_not_found() {
    let detector = detector();
    let result = detector.detect_in(&solid_frame(320, 240, 128));
    assert!(!result.found());
    assert_eq!(result.inliers, 0);
}

#[test]
fn test_other_texture_is_not_found() {
    let detector = detector();
    let other = textured_object(100, 80, 6, 99);
    let frame = frame_with_object(320, 240, 128, &other, Some((50, 30)));
    assert!(!detector.detect_in(&frame).found());
}

#[test]
fn test_detection_is_idempotent() {
    let detector = detector();
    let frame = frame_with_object(320, 240, 128, &object(), Some((70, 44)));
    let first = detector.detect_in(&frame);
    for _ in 0..3 {
        assert_eq!(detector.detect_in(&frame), first);
    }

    let clone = detector.clone();
    assert_eq!(clone.detect_in(&frame), first);
}

#[test]
fn test_empty_and_tiny_frames() {
    let detector = detector();
    assert!(!detector.detect_in(&GrayImage::new(0, 0)).found());
    assert!(!detector.detect_in(&GrayImage::new(320, 0)).found());
    assert!(!detector.detect_in(&solid_frame(8, 8, 0)).found());
}

#[test]
fn test_translation_transform() {
    let config = StaticDetectorConfig {
        transform: TransformKind::Translation,
        ..Default::default()
    };
    let detector = detector_with(config);
    let frame = frame_with_object(320, 240, 128, &object(), Some((150, 100)));
    assert_near(detector.detect_in(&frame).offset, Vec2::new(150.0, 100.0));
    assert!(!detector.detect_in(&solid_frame(320, 240, 50)).found());
}

#[test]
fn test_without_ratio_test_on_flat_background() {
    let config = StaticDetectorConfig {
        ratio_test: None,
        ..Default::default()
    };
    let detector = detector_with(config);
    let frame = frame_with_object(320, 240, 128, &object(), Some((50, 30)));
    assert_near(detector.detect_in(&frame).offset, Vec2::new(50.0, 30.0));
}

#[test]
fn test_unreachable_inlier_count() {
    let config = StaticDetectorConfig {
        min_inliers: 100_000,
        ..Default::default()
    };
    let detector = detector_with(config);
    let frame = frame_with_object(320, 240, 128, &object(), Some((50, 30)));
    assert!(!detector.detect_in(&frame).found());
}

#[test]
fn test_region_detection_reports_frame_coordinates() {
    let detector = detector();
    let frame = frame_with_object(320, 240, 128, &object(), Some((120, 80)));

    let result = detector.detect_in_region(&frame, Region::new(64, 40, 220, 160));
    assert_near(result.offset, Vec2::new(120.0, 80.0));

    // window without the object
    let empty = detector.detect_in_region(&frame, Region::new(0, 0, 100, 70));
    assert!(!empty.found());

    // window outside the frame
    let outside = detector.detect_in_region(&frame, Region::new(400, 0, 50, 50));
    assert!(!outside.found());
}

#[test]
fn test_several_training_images() {
    let extractor = OrbExtractor::default();
    let decoy = textured_object(100, 80, 6, 1234);
    let model = TrainedModel::from_images(&[decoy, object()], &extractor).unwrap();
    let detector = StaticDetector::new(Arc::new(model), extractor, Default::default());

    let frame = frame_with_object(320, 240, 128, &object(), Some((60, 90)));
    assert_near(detector.detect_in(&frame).offset, Vec2::new(60.0, 90.0));
}

#[test]
fn test_detectors_share_one_model() {
    let extractor = OrbExtractor::default();
    let model = Arc::new(TrainedModel::from_images(&[object()], &extractor).unwrap());
    let a = StaticDetector::new(model.clone(), extractor.clone(), Default::default());
    let b = StaticDetector::new(model.clone(), extractor, Default::default());
    assert_eq!(Arc::strong_count(&model), 3);

    let frame = frame_with_object(320, 240, 128, &object(), Some((50, 30)));
    let handles: Vec<_> = [a, b]
        .into_iter()
        .map(|d| {
            let frame = frame.clone();
            std::thread::spawn(move || d.detect_in(&frame))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results[0], results[1]);
    assert_near(results[0].offset, Vec2::new(50.0, 30.0));
}
