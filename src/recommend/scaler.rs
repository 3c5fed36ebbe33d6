//! Per-dimension standardization of audio-feature rows.
//!
//! Audio features live on very different scales: `tempo` is in the hundreds,
//! `loudness` is negative decibels, most others are in `[0, 1]`. Standardizing
//! keeps distance and similarity from being dominated by the large ones.

use crate::types::FEATURE_DIMENSIONS;

/// One track's features in [`crate::types::FEATURE_COLUMNS`] order.
pub type FeatureRow = [f64; FEATURE_DIMENSIONS];

/// Standardizes every dimension to zero mean and unit variance.
///
/// Uses the population standard deviation. A dimension without spread gets a
/// scale of 1.0, so it maps to 0 instead of dividing by zero.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: FeatureRow,
    scale: FeatureRow,
}

impl StandardScaler {
    /// Computes mean and standard deviation of every dimension of `rows`.
    ///
    /// An empty input yields the identity scaler (mean 0, scale 1).
    pub fn fit(rows: &[FeatureRow]) -> Self {
        let mut mean = [0.0; FEATURE_DIMENSIONS];
        let mut scale = [1.0; FEATURE_DIMENSIONS];
        if rows.is_empty() {
            return Self { mean, scale };
        }

        let count = rows.len() as f64;
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        mean.iter_mut().for_each(|m| *m /= count);

        let mut variance = [0.0; FEATURE_DIMENSIONS];
        for row in rows {
            for d in 0..FEATURE_DIMENSIONS {
                let diff = row[d] - mean[d];
                variance[d] += diff * diff;
            }
        }

        for d in 0..FEATURE_DIMENSIONS {
            let std = (variance[d] / count).sqrt();
            if std > f64::EPSILON {
                scale[d] = std;
            }
        }

        Self { mean, scale }
    }

    /// Maps `row` to `(row - mean) / scale`.
    pub fn transform(&self, row: &FeatureRow) -> FeatureRow {
        let mut out = [0.0; FEATURE_DIMENSIONS];
        for d in 0..FEATURE_DIMENSIONS {
            out[d] = (row[d] - self.mean[d]) / self.scale[d];
        }
        out
    }

    /// Per-dimension mean of the fitted rows.
    pub fn mean(&self) -> &FeatureRow {
        &self.mean
    }

    /// Per-dimension divisor; 1.0 where the fitted rows had no spread.
    pub fn scale(&self) -> &FeatureRow {
        &self.scale
    }
}
