//! Adaptive clustering of an ordered embedding sequence.
//!
//! Consecutive blocks stay in the same cluster until the cosine distance
//! between neighbours jumps above a threshold calibrated on the document
//! itself: mean + sigma_factor * std of all adjacent distances. A document
//! that flows smoothly gets a low threshold; one that jumps between topics
//! gets a high one.

use paperscope_core::cosine_similarity;
use paperscope_core::defaults::{CLUSTER_FALLBACK_THRESHOLD, CLUSTER_SIGMA_FACTOR};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveClusterer {
    sigma_factor: f32,
    fallback_threshold: f32,
}

impl Default for AdaptiveClusterer {
    fn default() -> Self {
        Self::new(CLUSTER_SIGMA_FACTOR, CLUSTER_FALLBACK_THRESHOLD)
    }
}

impl AdaptiveClusterer {
    pub fn new(sigma_factor: f32, fallback_threshold: f32) -> Self {
        Self {
            sigma_factor,
            fallback_threshold,
        }
    }

    /// Label each vector with a cluster id.
    ///
    /// Labels start at 0 and either repeat or increase by one between
    /// neighbours. A new cluster starts where the distance to the previous
    /// vector is strictly greater than the threshold.
    pub fn cluster<V: AsRef<[f32]>>(&self, vectors: &[V]) -> Vec<usize> {
        if vectors.is_empty() {
            return Vec::new();
        }
        let distances = adjacent_distances(vectors);
        let threshold = self.threshold(&distances);

        let mut labels = Vec::with_capacity(vectors.len());
        let mut current = 0usize;
        labels.push(current);
        for distance in distances {
            if distance > threshold {
                current += 1;
            }
            labels.push(current);
        }
        labels
    }

    /// Mean plus `sigma_factor` population standard deviations, or the
    /// fallback when there are no distances.
    pub fn threshold(&self, distances: &[f32]) -> f32 {
        if distances.is_empty() {
            return self.fallback_threshold;
        }
        let n = distances.len() as f64;
        let mean = distances.iter().map(|&d| d as f64).sum::<f64>() / n;
        let variance = distances
            .iter()
            .map(|&d| (d as f64 - mean).powi(2))
            .sum::<f64>()
            / n;
        (mean + self.sigma_factor as f64 * variance.sqrt()) as f32
    }
}

/// Cosine distance between each vector and its successor.
///
/// A zero-norm vector has similarity 0 with anything, hence distance 1.
pub fn adjacent_distances<V: AsRef<[f32]>>(vectors: &[V]) -> Vec<f32> {
    vectors
        .windows(2)
        .map(|pair| 1.0 - cosine_similarity(pair[0].as_ref(), pair[1].as_ref()))
        .collect()
}
