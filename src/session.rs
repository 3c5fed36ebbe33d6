//! # Session Model Store
//!
//! Keeps one fitted [`Recommender`] per Spotify user id. The store is part of
//! the application state and shared by every request handler.
//!
//! ## Concurrency
//!
//! The map sits behind a [`tokio::sync::RwLock`]. Recommendation lookups only
//! take the read lock and run side by side; training and clearing take the
//! write lock. Fitting itself happens before the lock is taken, so a long
//! training run never blocks other users.
//!
//! ## Lifetime
//!
//! Models live in memory until they are replaced, cleared, or the process
//! exits. Nothing is persisted.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::{
    recommend::{RecommendError, Recommender},
    types::{Recommendation, TrackRecord},
};

/// Fitted recommendation models, one per Spotify user.
///
/// Cloning the store is cheap and every clone shares the same map. Training
/// for one user never touches another user's model.
#[derive(Debug, Clone, Default)]
pub struct ModelStore {
    models: Arc<RwLock<HashMap<String, Recommender>>>,
}

impl ModelStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trains a fresh model for `user_id` and stores it on success.
    ///
    /// # Arguments
    ///
    /// * `user_id` - Spotify user id owning the model
    /// * `tracks` - Tracks with audio features to fit on
    /// * `k` - Requested number of clusters
    ///
    /// # Returns
    ///
    /// The fitted tracks with their cluster label, and the effective number of
    /// clusters. A failed training leaves the previous model in place.
    pub async fn fit(
        &self,
        user_id: &str,
        tracks: &[TrackRecord],
        k: usize,
    ) -> Result<(Vec<(String, usize)>, usize), RecommendError> {
        let mut recommender = Recommender::new();
        let labels = recommender.fit(tracks, k)?;
        let assignments = recommender
            .tracks()
            .iter()
            .zip(labels)
            .map(|(track, label)| (track.id.clone(), label))
            .collect();
        let n_clusters = recommender.n_clusters().unwrap_or(k);

        self.models
            .write()
            .await
            .insert(user_id.to_string(), recommender);

        Ok((assignments, n_clusters))
    }

    /// Recommends up to `n` tracks similar to `seed_id` from the user's model.
    ///
    /// # Errors
    ///
    /// - [`RecommendError::NotFitted`] if the user has no model
    /// - [`RecommendError::NotFound`] if the seed is not part of it
    pub async fn recommend(
        &self,
        user_id: &str,
        seed_id: &str,
        n: usize,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        let models = self.models.read().await;
        models
            .get(user_id)
            .ok_or(RecommendError::NotFitted)?
            .recommend(seed_id, n)
    }

    /// Recommends for several seeds; without seeds the first fitted track is used.
    pub async fn recommend_many(
        &self,
        user_id: &str,
        seed_ids: &[String],
        n: usize,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        let models = self.models.read().await;
        let recommender = models.get(user_id).ok_or(RecommendError::NotFitted)?;

        if seed_ids.is_empty() {
            let first = recommender
                .tracks()
                .first()
                .map(|t| t.id.clone())
                .ok_or(RecommendError::NotFitted)?;
            return recommender.recommend(&first, n);
        }

        recommender.recommend_many(seed_ids, n)
    }

    /// Whether `user_id` has a trained model.
    pub async fn has_model(&self, user_id: &str) -> bool {
        self.models.read().await.contains_key(user_id)
    }

    /// Drops the model of `user_id`. Returns whether a model existed.
    pub async fn clear(&self, user_id: &str) -> bool {
        self.models.write().await.remove(user_id).is_some()
    }
}
