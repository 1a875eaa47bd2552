use glam::Vec2;
use planar_object_tracker::features::fast::FastDetector;
use planar_object_tracker::matching::{BruteForceMatcher, hamming_distance};
use planar_object_tracker::synthetic::{frame_with_object, solid_frame, textured_object};
use planar_object_tracker::{FeatureExtractor, OrbConfig, OrbExtractor, StaticDetectorConfig};

#[test]
fn test_extraction_is_deterministic() {
    let img = textured_object(120, 90, 6, 3);
    let a = OrbExtractor::default().extract(&img);
    let b = OrbExtractor::default().extract(&img);
    assert!(!a.is_empty());
    assert_eq!(a, b);
    assert_eq!(a.keypoints.len(), a.descriptors.len());
}

#[test]
fn test_flat_and_small_images_have_no_features() {
    let extractor = OrbExtractor::default();
    assert!(extractor.extract(&solid_frame(200, 150, 77)).is_empty());
    assert!(extractor.extract(&textured_object(20, 20, 4, 1)).is_empty());
    assert!(extractor.extract(&image::GrayImage::new(0, 0)).is_empty());
}

#[test]
fn test_keypoints_stay_inside_image() {
    let img = textured_object(160, 120, 5, 21);
    let features = OrbExtractor::default().extract(&img);
    for kp in &features.keypoints {
        assert!(kp.position.x >= 0.0 && kp.position.x < 160.0);
        assert!(kp.position.y >= 0.0 && kp.position.y < 120.0);
        assert_eq!(kp.scale, (1u32 << kp.level) as f32);
    }
}

#[test]
fn test_max_features_keeps_strongest() {
    let img = textured_object(200, 160, 4, 5);
    let all = OrbExtractor::default().extract(&img);
    let capped = OrbExtractor::new(OrbConfig {
        max_features: 25,
        ..Default::default()
    })
    .extract(&img);
    assert!(all.len() > 25);
    assert_eq!(capped.len(), 25);

    let weakest_kept = capped.keypoints.last().unwrap().response;
    assert!(capped.keypoints.windows(2).all(|w| w[0].response >= w[1].response));
    assert!(all.keypoints[25..].iter().all(|kp| kp.response <= weakest_kept));
}

#[test]
fn test_pasted_object_keeps_its_features() {
    let extractor = OrbExtractor::default();
    let object = textured_object(100, 80, 6, 7);
    let trained = extractor.extract(&object);
    let frame = extractor.extract(&frame_with_object(320, 240, 128, &object, Some((50, 30))));
    let shift = Vec2::new(50.0, 30.0);

    assert!(trained.len() >= 10);
    for (kp, d) in trained.keypoints.iter().zip(&trained.descriptors) {
        let twin = frame
            .keypoints
            .iter()
            .zip(&frame.descriptors)
            .find(|(f, _)| f.level == kp.level && f.position.distance(kp.position + shift) < 1e-3);
        let (_, twin_descriptor) = twin.expect("every object keypoint reappears in the frame");
        assert_eq!(hamming_distance(d, twin_descriptor), 0);
    }
}

#[test]
fn test_different_textures_do_not_match() {
    let extractor = OrbExtractor::default();
    let a = extractor.extract(&textured_object(100, 80, 6, 7));
    let b = extractor.extract(&textured_object(100, 80, 6, 99));
    let config = StaticDetectorConfig::default();
    let matcher = BruteForceMatcher::new(config.max_descriptor_distance, config.ratio_test);
    let matches = matcher.match_descriptors(&b.descriptors, &a.descriptors, 0);
    assert!(matches.len() < 10, "{} spurious matches", matches.len());
}

#[test]
fn test_alignment_follows_pyramid_depth() {
    for (levels, align) in [(1, 1), (2, 2), (3, 4), (4, 8)] {
        let extractor = OrbExtractor::new(OrbConfig {
            pyramid_levels: levels,
            ..Default::default()
        });
        assert_eq!(extractor.alignment(), align);
    }
}

#[test]
fn test_fast_ignores_flat_image() {
    let fast = FastDetector::new(20, 9);
    assert!(fast.detect(&solid_frame(64, 64, 200)).is_empty());
    assert!(!fast.detect(&textured_object(64, 64, 8, 2)).is_empty());
}
