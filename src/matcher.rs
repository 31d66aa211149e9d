/*
Brute force descriptor matching. Every template descriptor is compared to every
screenshot descriptor, the two nearest by euclidean distance are kept, and the
screenshot position of the nearest one survives when it passes the match policy.
*/

use rayon::prelude::*;

use crate::features::Keypoint;

/// Acceptance rule for a nearest-neighbour pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MatchPolicy {
    /// keep a match iff `nearest < threshold`
    #[default]
    AbsoluteDistance,
    /// additionally require `nearest < ratio * second_nearest` (Lowe's ratio test).
    /// Changes behaviour against the absolute-only rule, so it is opt-in.
    RatioTest { ratio: f32 },
}

/// Nearest and second nearest screenshot keypoints for one template keypoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchCandidate {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: f32,
    /// index and distance of the runner-up, absent when the screenshot has one keypoint
    pub second: Option<(usize, f32)>,
}

impl MatchCandidate {
    pub fn accepted(&self, threshold: f32, policy: MatchPolicy) -> bool {
        if self.distance >= threshold {
            return false;
        }
        match (policy, self.second) {
            (MatchPolicy::AbsoluteDistance, _) => true,
            (MatchPolicy::RatioTest { ratio }, Some((_, second))) => {
                self.distance < ratio * second
            }
            (MatchPolicy::RatioTest { .. }, None) => true,
        }
    }
}

/// k=2 nearest neighbour search of `query` descriptors among `train` descriptors.
/// Ties go to the lower train index. Output order follows `query`.
pub fn knn2(query: &[Keypoint], train: &[Keypoint]) -> Vec<MatchCandidate> {
    if train.is_empty() {
        return Vec::new();
    }
    query
        .par_iter()
        .enumerate()
        .map(|(query_idx, q)| {
            let mut best: (usize, f32) = (0, f32::INFINITY);
            let mut second: Option<(usize, f32)> = None;
            for (train_idx, t) in train.iter().enumerate() {
                let distance = q.descriptor.distance(&t.descriptor);
                if distance < best.1 {
                    if best.1.is_finite() {
                        second = Some(best);
                    }
                    best = (train_idx, distance);
                } else if second.map_or(true, |(_, d)| distance < d) {
                    second = Some((train_idx, distance));
                }
            }
            MatchCandidate {
                query_idx,
                train_idx: best.0,
                distance: best.1,
                second,
            }
        })
        .collect()
}

/// Screenshot positions of every accepted nearest neighbour.
/// Duplicates are kept: two template keypoints hitting the same screenshot keypoint count twice.
pub fn match_points(
    template: &[Keypoint],
    screenshot: &[Keypoint],
    threshold: f32,
    policy: MatchPolicy,
) -> Vec<(f32, f32)> {
    knn2(template, screenshot)
        .into_iter()
        .filter(|candidate| candidate.accepted(threshold, policy))
        .map(|candidate| screenshot[candidate.train_idx].position())
        .collect()
}
