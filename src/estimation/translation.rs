use glam::Vec2;

use super::Correspondence;

/// Mean displacement from model to frame points.
pub fn fit(correspondences: &[Correspondence]) -> Option<Vec2> {
    if correspondences.is_empty() {
        return None;
    }
    let sum = correspondences
        .iter()
        .fold(glam::DVec2::ZERO, |acc, c| acc + (c.frame - c.model).as_dvec2());
    let mean = (sum / correspondences.len() as f64).as_vec2();
    mean.is_finite().then_some(mean)
}
