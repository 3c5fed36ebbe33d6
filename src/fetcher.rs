//! Batched audio-feature retrieval and merging of features onto tracks.
//!
//! Spotify caps audio-feature lookups at [`MAX_FEATURE_BATCH`] track IDs per
//! request. [`fetch_features`] splits larger sets into batches and fetches them
//! one after another. The policy is best effort:
//!
//! - a failed batch is logged, its index range is recorded in
//!   [`FeatureBatches::failed_batches`], and the remaining batches still run
//! - an [`ApiError::Unauthorized`] aborts the whole call, since every further
//!   batch would fail the same way
//!
//! [`merge_tracks`] then attaches the features to their tracks. A track without
//! a feature entry is dropped from the merged list.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::{
    error::ApiError,
    info,
    spotify::SpotifyClient,
    types::{AudioFeatures, FeatureBatches, MergedTracks, SpotifyTrack, TrackRecord},
    warning,
};

pub use crate::spotify::tracks::MAX_FEATURE_BATCH;

/// Anything that can resolve audio features for a batch of track IDs.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// Returns features parallel to `ids`, `None` where none exist.
    async fn audio_features(
        &self,
        token: &str,
        ids: &[String],
    ) -> Result<Vec<Option<AudioFeatures>>, ApiError>;
}

#[async_trait]
impl FeatureSource for SpotifyClient {
    async fn audio_features(
        &self,
        token: &str,
        ids: &[String],
    ) -> Result<Vec<Option<AudioFeatures>>, ApiError> {
        SpotifyClient::audio_features(self, token, ids).await
    }
}

/// Fetches audio features for `ids` in batches of [`MAX_FEATURE_BATCH`].
///
/// IDs are de-duplicated first, keeping their first position; empty IDs
/// are ignored. Failed batch ranges refer to positions in that de-duplicated
/// list.
pub async fn fetch_features<S: FeatureSource + ?Sized>(
    source: &S,
    token: &str,
    ids: &[String],
) -> Result<FeatureBatches, ApiError> {
    let mut seen = HashSet::new();
    let mut unique: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !id.is_empty() && seen.insert(id.as_str()) {
            unique.push(id.clone());
        }
    }

    let mut result = FeatureBatches::default();
    for (index, chunk) in unique.chunks(MAX_FEATURE_BATCH).enumerate() {
        let start = index * MAX_FEATURE_BATCH;
        let range = start..start + chunk.len();

        match source.audio_features(token, chunk).await {
            Ok(features) => {
                result.features.extend(features.into_iter().flatten());
            }
            Err(ApiError::Unauthorized(msg)) => return Err(ApiError::Unauthorized(msg)),
            Err(e) => {
                warning!(
                    "Audio feature batch {} (tracks {}..{}) failed, skipping: {}",
                    index + 1,
                    range.start,
                    range.end,
                    e
                );
                result.failed_batches.push(range);
            }
        }
    }

    info!(
        "Resolved audio features for {} of {} tracks",
        result.features.len(),
        unique.len()
    );
    Ok(result)
}

/// Attaches features to tracks, dropping tracks that have none.
///
/// Output order follows `tracks`. Tracks without an ID (local files) are
/// dropped as well.
pub fn merge_tracks(tracks: &[SpotifyTrack], features: &[AudioFeatures]) -> Vec<TrackRecord> {
    let by_id: HashMap<&str, &AudioFeatures> =
        features.iter().map(|f| (f.id.as_str(), f)).collect();

    tracks
        .iter()
        .filter_map(|track| {
            let id = track.id.as_deref()?;
            let features = by_id.get(id)?;
            Some(TrackRecord {
                id: id.to_string(),
                name: track.name.clone(),
                artist: track.primary_artist().to_string(),
                popularity: track.popularity,
                duration_ms: track.duration_ms,
                features: Some(features.vector),
            })
        })
        .collect()
}

/// Fetches features for `tracks` and merges them, reporting failed batches.
pub async fn fetch_merged<S: FeatureSource + ?Sized>(
    source: &S,
    token: &str,
    tracks: &[SpotifyTrack],
) -> Result<MergedTracks, ApiError> {
    let ids: Vec<String> = tracks.iter().filter_map(|t| t.id.clone()).collect();
    let batches = fetch_features(source, token, &ids).await?;

    Ok(MergedTracks {
        tracks: merge_tracks(tracks, &batches.features),
        failed_batches: batches.failed_batches,
    })
}
