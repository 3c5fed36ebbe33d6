//! Lloyd's k-means over standardized feature rows.
//!
//! Centers are seeded with k-means++ and the whole run is repeated
//! [`DEFAULT_N_INIT`] times; the run with the lowest inertia (sum of squared
//! distances to the assigned center) wins. Iteration stops after
//! [`DEFAULT_MAX_ITER`] rounds or once the total center shift drops to
//! [`DEFAULT_TOLERANCE`].
//!
//! A cluster that loses all its points takes over the point farthest from its
//! own center, so every fit returns exactly `k` non-empty clusters when there
//! are at least `k` distinct points.

use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{scaler::FeatureRow, similarity::squared_distance};
use crate::types::FEATURE_DIMENSIONS;

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_MAX_ITER: usize = 300;
pub const DEFAULT_TOLERANCE: f64 = 1e-4;
pub const DEFAULT_N_INIT: usize = 10;

/// Lloyd's k-means with k-means++ seeding.
///
/// Runs are reproducible: the random generator is seeded with a fixed value
/// and every initialization draws from the same generator in sequence.
#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    seed: u64,
    max_iter: usize,
    tolerance: f64,
    n_init: usize,
}

/// Result of [`KMeans::fit`].
///
/// `labels` is parallel to the input points and indexes into `centers`.
#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub centers: Vec<FeatureRow>,
    pub labels: Vec<usize>,
    pub inertia: f64,
}

impl KMeans {
    /// Creates a k-means configuration for `k` clusters with default settings.
    ///
    /// # Example
    ///
    /// ```
    /// let fit = KMeans::new(2).fit(&rows);
    /// assert_eq!(fit.labels.len(), rows.len());
    /// ```
    pub fn new(k: usize) -> Self {
        Self {
            k,
            seed: DEFAULT_SEED,
            max_iter: DEFAULT_MAX_ITER,
            tolerance: DEFAULT_TOLERANCE,
            n_init: DEFAULT_N_INIT,
        }
    }

    /// Replaces the random seed (default 42).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the number of independent initializations, at least 1.
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    /// Partitions `points` into `k` clusters.
    ///
    /// The caller must ensure `1 <= k <= points.len()`; with fewer distinct
    /// points than `k` some clusters end up sharing identical centers.
    pub fn fit(&self, points: &[FeatureRow]) -> KMeansFit {
        if points.is_empty() || self.k == 0 {
            return KMeansFit {
                centers: Vec::new(),
                labels: vec![0; points.len()],
                inertia: 0.0,
            };
        }

        let k = self.k.min(points.len());
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<KMeansFit> = None;

        for _ in 0..self.n_init {
            let centers = kmeans_plus_plus(points, k, &mut rng);
            let fit = self.lloyd(points, centers);
            if best.as_ref().is_none_or(|b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }

        best.unwrap_or_else(|| KMeansFit {
            centers: Vec::new(),
            labels: vec![0; points.len()],
            inertia: 0.0,
        })
    }

    fn lloyd(&self, points: &[FeatureRow], mut centers: Vec<FeatureRow>) -> KMeansFit {
        let k = centers.len();
        let mut labels = vec![0; points.len()];

        for _ in 0..self.max_iter {
            for (label, point) in labels.iter_mut().zip(points) {
                *label = nearest(&centers, point).0;
            }

            let mut sums = vec![[0.0; FEATURE_DIMENSIONS]; k];
            let mut counts = vec![0usize; k];
            for (label, point) in labels.iter().zip(points) {
                counts[*label] += 1;
                for (s, x) in sums[*label].iter_mut().zip(point) {
                    *s += x;
                }
            }

            let mut next = centers.clone();
            for c in 0..k {
                if counts[c] > 0 {
                    for d in 0..FEATURE_DIMENSIONS {
                        next[c][d] = sums[c][d] / counts[c] as f64;
                    }
                }
            }

            // empty clusters take over the worst-fitting point
            for c in 0..k {
                if counts[c] > 0 {
                    continue;
                }
                let farthest = labels
                    .iter()
                    .zip(points)
                    .enumerate()
                    .filter(|(_, (label, _))| counts[**label] > 1)
                    .map(|(i, (label, point))| (i, squared_distance(point, &next[*label])))
                    .fold(None, |acc: Option<(usize, f64)>, (i, dist)| match acc {
                        Some((_, best)) if best >= dist => acc,
                        _ => Some((i, dist)),
                    });
                if let Some((i, _)) = farthest {
                    counts[labels[i]] -= 1;
                    labels[i] = c;
                    counts[c] = 1;
                    next[c] = points[i];
                }
            }

            let shift: f64 = centers
                .iter()
                .zip(&next)
                .map(|(a, b)| squared_distance(a, b))
                .sum();
            centers = next;
            if shift <= self.tolerance {
                break;
            }
        }

        let mut inertia = 0.0;
        for (label, point) in labels.iter_mut().zip(points) {
            let (c, dist) = nearest(&centers, point);
            *label = c;
            inertia += dist;
        }

        KMeansFit {
            centers,
            labels,
            inertia,
        }
    }
}

/// Returns the index of the closest center and the squared distance to it.
/// Ties go to the lowest index.
pub fn nearest(centers: &[FeatureRow], point: &FeatureRow) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, center) in centers.iter().enumerate() {
        let dist = squared_distance(point, center);
        if dist < best.1 {
            best = (i, dist);
        }
    }
    best
}

fn kmeans_plus_plus(points: &[FeatureRow], k: usize, rng: &mut StdRng) -> Vec<FeatureRow> {
    let mut centers = Vec::with_capacity(k);
    centers.push(points[rng.random_range(0..points.len())]);

    let mut distances: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centers[0]))
        .collect();

    while centers.len() < k {
        let total: f64 = distances.iter().sum();
        let index = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            let mut cumulative = 0.0;
            let mut chosen = None;
            for (i, dist) in distances.iter().enumerate() {
                cumulative += dist;
                if *dist > 0.0 && cumulative >= target {
                    chosen = Some(i);
                    break;
                }
            }
            // rounding can leave the target just past the last bucket
            chosen.unwrap_or_else(|| {
                distances
                    .iter()
                    .rposition(|d| *d > 0.0)
                    .unwrap_or(points.len() - 1)
            })
        } else {
            rng.random_range(0..points.len())
        };

        let center = points[index];
        for (dist, point) in distances.iter_mut().zip(points) {
            *dist = dist.min(squared_distance(point, &center));
        }
        centers.push(center);
    }

    centers
}
