use super::{SpotifyClient, TimeRange};
use crate::{
    error::ApiError,
    types::{
        AudioFeatures, AudioFeaturesResponse, Paging, PlayHistory, SearchResponse, SpotifyArtist,
        SpotifyTrack,
    },
};

/// Maximum number of track IDs per audio-features request.
pub const MAX_FEATURE_BATCH: usize = 20;

impl SpotifyClient {
    /// Retrieves the user's top tracks for a time range.
    ///
    /// # Arguments
    ///
    /// * `token` - Valid access token of the user
    /// * `time_range` - Affinity window (`short_term`, `medium_term`, `long_term`)
    /// * `limit` - Number of tracks to return (1-50)
    pub async fn top_tracks(
        &self,
        token: &str,
        time_range: TimeRange,
        limit: u32,
    ) -> Result<Vec<SpotifyTrack>, ApiError> {
        let page: Paging<SpotifyTrack> = self
            .get_json(
                token,
                &self.endpoint("me/top/tracks"),
                &[
                    ("time_range", time_range.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(page.items)
    }

    /// Retrieves the user's top artists for a time range.
    pub async fn top_artists(
        &self,
        token: &str,
        time_range: TimeRange,
        limit: u32,
    ) -> Result<Vec<SpotifyArtist>, ApiError> {
        let page: Paging<SpotifyArtist> = self
            .get_json(
                token,
                &self.endpoint("me/top/artists"),
                &[
                    ("time_range", time_range.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(page.items)
    }

    /// Retrieves the user's most recently played tracks, newest first.
    pub async fn recently_played(
        &self,
        token: &str,
        limit: u32,
    ) -> Result<Vec<PlayHistory>, ApiError> {
        let page: Paging<PlayHistory> = self
            .get_json(
                token,
                &self.endpoint("me/player/recently-played"),
                &[("limit", limit.to_string())],
            )
            .await?;
        Ok(page.items)
    }

    /// Retrieves audio features for up to [`MAX_FEATURE_BATCH`] tracks in one call.
    ///
    /// The result is parallel to `ids`; Spotify answers `null` for tracks it has
    /// no analysis for, which shows up as `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidInput`] for more than [`MAX_FEATURE_BATCH`] IDs
    /// without calling Spotify. Larger sets go through
    /// [`crate::fetcher::fetch_features`], which splits them into batches.
    pub async fn audio_features(
        &self,
        token: &str,
        ids: &[String],
    ) -> Result<Vec<Option<AudioFeatures>>, ApiError> {
        if ids.len() > MAX_FEATURE_BATCH {
            return Err(ApiError::InvalidInput(format!(
                "at most {} track ids per audio-features request, got {}",
                MAX_FEATURE_BATCH,
                ids.len()
            )));
        }
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let response: AudioFeaturesResponse = self
            .get_json(
                token,
                &self.endpoint("audio-features"),
                &[("ids", ids.join(","))],
            )
            .await?;
        Ok(response.audio_features)
    }

    /// Searches the catalog and returns the best matching track, if any.
    pub async fn search_track(
        &self,
        token: &str,
        query: &str,
    ) -> Result<Option<SpotifyTrack>, ApiError> {
        let response: SearchResponse = self
            .get_json(
                token,
                &self.endpoint("search"),
                &[
                    ("q", query.to_string()),
                    ("type", "track".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(response.tracks.items.into_iter().next())
    }
}
