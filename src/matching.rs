//! Brute-force nearest-neighbour matching of binary descriptors.

use log::trace;

use crate::estimation::Correspondence;
use crate::model::TrainedModel;
use crate::types::{Descriptor, Features};

/// Number of differing bits between two descriptors.
pub fn hamming_distance(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// One frame descriptor paired with its nearest descriptor of a training image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorMatch {
    /// Index into the frame features.
    pub query: usize,
    /// Index of the training image in the model.
    pub train_image: usize,
    /// Index into that training image's features.
    pub train: usize,
    pub distance: u32,
}

/// Matches surviving the distance filter for one frame.
#[derive(Debug, Clone, Default)]
pub struct MatchSet {
    pub matches: Vec<DescriptorMatch>,
}

impl MatchSet {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Model-to-frame point pairs for geometric verification.
    pub fn correspondences(&self, frame: &Features, model: &TrainedModel) -> Vec<Correspondence> {
        self.matches
            .iter()
            .map(|m| Correspondence {
                model: model.images()[m.train_image].features.keypoints[m.train].position,
                frame: frame.keypoints[m.query].position,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct BruteForceMatcher {
    pub max_distance: u32,
    pub ratio_test: Option<f32>,
}

impl BruteForceMatcher {
    pub fn new(max_distance: u32, ratio_test: Option<f32>) -> BruteForceMatcher {
        BruteForceMatcher {
            max_distance,
            ratio_test,
        }
    }

    /// Best and second-best candidates: `(index, distance, second_distance)`.
    ///
    /// The first index wins among equal distances.
    pub fn nearest(query: &Descriptor, train: &[Descriptor]) -> Option<(usize, u32, u32)> {
        let mut best: Option<(usize, u32)> = None;
        let mut second = u32::MAX;
        for (i, candidate) in train.iter().enumerate() {
            let d = hamming_distance(query, candidate);
            match best {
                Some((_, best_d)) if d >= best_d => second = second.min(d),
                Some((_, best_d)) => {
                    second = best_d;
                    best = Some((i, d));
                }
                None => best = Some((i, d)),
            }
        }
        best.map(|(i, d)| (i, d, second))
    }

    fn accepts(&self, distance: u32, second: u32) -> bool {
        if distance > self.max_distance {
            return false;
        }
        match self.ratio_test {
            Some(ratio) if second != u32::MAX => (distance as f32) < ratio * second as f32,
            _ => true,
        }
    }

    /// Matches every query descriptor against one training descriptor set.
    pub fn match_descriptors(
        &self,
        query: &[Descriptor],
        train: &[Descriptor],
        train_image: usize,
    ) -> Vec<DescriptorMatch> {
        query
            .iter()
            .enumerate()
            .filter_map(|(q, d)| {
                let (t, distance, second) = Self::nearest(d, train)?;
                self.accepts(distance, second).then_some(DescriptorMatch {
                    query: q,
                    train_image,
                    train: t,
                    distance,
                })
            })
            .collect()
    }

    /// Matches frame features against every image of the model.
    pub fn match_model(&self, frame: &Features, model: &TrainedModel) -> MatchSet {
        let mut matches = Vec::new();
        for (idx, image) in model.images().iter().enumerate() {
            let found = self.match_descriptors(&frame.descriptors, &image.features.descriptors, idx);
            trace!("train image {}: {} matches", idx, found.len());
            matches.extend(found);
        }
        MatchSet { matches }
    }
}
