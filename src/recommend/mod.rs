//! # Recommendation Engine
//!
//! Turns a user's tracks into recommendations using their audio features.
//!
//! ## Overview
//!
//! Training ([`Recommender::fit`]) standardizes the 11-dimension feature vector
//! of every track, then partitions the standardized vectors with k-means.
//! Recommending ([`Recommender::recommend`]) looks up the seed track, restricts
//! the candidates to the seed's cluster and ranks them by cosine similarity to
//! the seed.
//!
//! ```text
//! tracks ──► StandardScaler ──► KMeans(k, seed 42) ──► labels
//!                                                       │
//! seed id ──► scaled seed vector ──► same-cluster candidates ──► cosine rank ──► top n
//! ```
//!
//! Clustering first bounds the similarity scan to a relevant subset. It does not
//! guarantee the global top-n: a track just across a cluster boundary can be
//! closer to the seed than one inside it.
//!
//! ## Ownership
//!
//! A [`Recommender`] holds at most one fitted model and is owned by a single
//! user session (see [`crate::session::ModelStore`]). Nothing here is global.

mod kmeans;
mod scaler;
mod similarity;

use std::collections::{HashMap, HashSet};

use thiserror::Error;

pub use kmeans::{KMeans, KMeansFit, nearest};
pub use scaler::{FeatureRow, StandardScaler};
pub use similarity::cosine_similarity;

use crate::{
    types::{FEATURE_COLUMNS, Recommendation, TrackRecord},
    warning,
};

pub const DEFAULT_CLUSTERS: usize = 5;

#[derive(Debug, Error, PartialEq)]
pub enum RecommendError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("model has not been trained")]
    NotFitted,

    #[error("track {0} is not part of the fitted set")]
    NotFound(String),
}

#[derive(Debug, Clone)]
struct FittedModel {
    scaler: StandardScaler,
    tracks: Vec<TrackRecord>,
    raw: Vec<FeatureRow>,
    scaled: Vec<FeatureRow>,
    labels: Vec<usize>,
    n_clusters: usize,
}

/// Clusters tracks by audio features and ranks similar tracks within a cluster.
#[derive(Debug, Clone, Default)]
pub struct Recommender {
    model: Option<FittedModel>,
}

impl Recommender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    /// Trains the model on `tracks` and returns one cluster label per fitted track.
    ///
    /// Tracks are fitted in input order; a repeated track id keeps its first
    /// occurrence. The previous model, if any, is replaced only on success.
    ///
    /// # Errors
    ///
    /// - [`RecommendError::InvalidInput`] if `tracks` is empty, `k` is zero, or
    ///   a track has no feature vector or a non-finite feature value.
    ///
    /// # Cluster Count
    ///
    /// `k` above the number of distinct feature vectors is capped to that
    /// number, since extra clusters could only duplicate existing centers.
    pub fn fit(&mut self, tracks: &[TrackRecord], k: usize) -> Result<Vec<usize>, RecommendError> {
        if tracks.is_empty() {
            return Err(RecommendError::InvalidInput(
                "cannot train on an empty track collection".to_string(),
            ));
        }
        if k == 0 {
            return Err(RecommendError::InvalidInput(
                "number of clusters must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut fitted = Vec::with_capacity(tracks.len());
        let mut raw = Vec::with_capacity(tracks.len());
        for track in tracks {
            if !seen.insert(track.id.as_str()) {
                continue;
            }
            let row = feature_row(track)?;
            fitted.push(track.clone());
            raw.push(row);
        }

        let scaler = StandardScaler::fit(&raw);
        let scaled: Vec<FeatureRow> = raw.iter().map(|row| scaler.transform(row)).collect();

        let distinct = count_distinct(&scaled);
        let n_clusters = if k > distinct {
            warning!(
                "Requested {} clusters but only {} distinct tracks; using {}",
                k,
                distinct,
                distinct
            );
            distinct
        } else {
            k
        };

        let fit = KMeans::new(n_clusters).fit(&scaled);
        let labels = fit.labels;

        self.model = Some(FittedModel {
            scaler,
            tracks: fitted,
            raw,
            scaled,
            labels: labels.clone(),
            n_clusters,
        });

        Ok(labels)
    }

    /// Number of clusters of the fitted model.
    pub fn n_clusters(&self) -> Option<usize> {
        self.model.as_ref().map(|m| m.n_clusters)
    }

    /// Tracks of the fitted model, in fitting order.
    pub fn tracks(&self) -> &[TrackRecord] {
        self.model
            .as_ref()
            .map(|m| m.tracks.as_slice())
            .unwrap_or_default()
    }

    /// Cluster label of every fitted track, parallel to [`Recommender::tracks`].
    pub fn labels(&self) -> &[usize] {
        self.model
            .as_ref()
            .map(|m| m.labels.as_slice())
            .unwrap_or_default()
    }

    /// Returns up to `n` tracks most similar to `seed_id` from the seed's cluster.
    ///
    /// Candidates are ordered by descending cosine similarity of their scaled
    /// feature vectors to the scaled seed vector; equal similarities keep
    /// fitting order. The seed itself is never part of the result. A cluster
    /// with fewer than `n` other tracks yields all of them.
    ///
    /// # Errors
    ///
    /// - [`RecommendError::NotFitted`] if [`Recommender::fit`] has not succeeded yet
    /// - [`RecommendError::NotFound`] if `seed_id` is not among the fitted tracks
    pub fn recommend(&self, seed_id: &str, n: usize) -> Result<Vec<Recommendation>, RecommendError> {
        let model = self.model.as_ref().ok_or(RecommendError::NotFitted)?;
        let seed_index = model
            .tracks
            .iter()
            .position(|t| t.id == seed_id)
            .ok_or_else(|| RecommendError::NotFound(seed_id.to_string()))?;

        let seed_vector = model.scaler.transform(&model.raw[seed_index]);
        let seed_cluster = model.labels[seed_index];

        let mut candidates: Vec<(usize, f64)> = model
            .labels
            .iter()
            .enumerate()
            .filter(|(i, label)| **label == seed_cluster && *i != seed_index)
            .map(|(i, _)| (i, cosine_similarity(&seed_vector, &model.scaled[i])))
            .collect();

        // sort_by is stable, equal scores keep fitting order
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
        candidates.truncate(n);

        Ok(candidates
            .into_iter()
            .map(|(i, similarity)| Recommendation {
                track: model.tracks[i].clone(),
                similarity,
                cluster: seed_cluster,
            })
            .collect())
    }

    /// Merges the recommendations of several seeds into one ranked list.
    ///
    /// Every seed contributes its whole cluster as candidates; a track suggested
    /// by more than one seed keeps its best similarity. The merged list is cut
    /// to `n` only after the seeds are removed. Seeds are excluded from the
    /// result. Unknown seeds fail the whole call with
    /// [`RecommendError::NotFound`].
    pub fn recommend_many(
        &self,
        seed_ids: &[String],
        n: usize,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        if self.model.is_none() {
            return Err(RecommendError::NotFitted);
        }

        let seeds: HashSet<&str> = seed_ids.iter().map(String::as_str).collect();
        let mut merged: Vec<Recommendation> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for seed in seed_ids {
            for rec in self.recommend(seed, usize::MAX)? {
                if seeds.contains(rec.track.id.as_str()) {
                    continue;
                }
                match positions.get(&rec.track.id) {
                    Some(&pos) => {
                        if rec.similarity > merged[pos].similarity {
                            merged[pos] = rec;
                        }
                    }
                    None => {
                        positions.insert(rec.track.id.clone(), merged.len());
                        merged.push(rec);
                    }
                }
            }
        }

        merged.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        merged.truncate(n);
        Ok(merged)
    }
}

fn feature_row(track: &TrackRecord) -> Result<FeatureRow, RecommendError> {
    let features = track.features.as_ref().ok_or_else(|| {
        RecommendError::InvalidInput(format!("track {} has no audio features", track.id))
    })?;

    let row = features.as_array();
    if let Some(d) = row.iter().position(|x| !x.is_finite()) {
        return Err(RecommendError::InvalidInput(format!(
            "track {} has no usable value for {}",
            track.id, FEATURE_COLUMNS[d]
        )));
    }
    Ok(row)
}

fn count_distinct(rows: &[FeatureRow]) -> usize {
    let mut distinct: HashSet<[u64; crate::types::FEATURE_DIMENSIONS]> = HashSet::new();
    for row in rows {
        // +0.0 and -0.0 compare equal but differ in bits
        distinct.insert(row.map(|x| (x + 0.0).to_bits()));
    }
    distinct.len()
}
