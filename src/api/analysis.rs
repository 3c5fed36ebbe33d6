use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::{Deserialize, Serialize};
use std::ops::Range;

use super::{AppState, BearerToken};
use crate::{
    error::ApiError,
    fetcher, info,
    spotify::{MAX_PAGE_LIMIT, TimeRange, clamp_limit},
    types::{FeatureBatches, MergedTracks, PlayHistory, SpotifyArtist, SpotifyTrack, TrackRecord},
    utils,
};

const DEFAULT_LIMIT: u32 = 20;

#[derive(Debug, Default, Deserialize)]
pub struct TopParams {
    #[serde(default)]
    time_range: TimeRange,
    limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct FeatureParams {
    ids: String,
}

#[derive(Debug, Serialize)]
pub struct MergedTracksResponse {
    pub tracks: Vec<TrackRecord>,
    pub partial: bool,
    pub failed_batches: Vec<Range<usize>>,
}

impl From<MergedTracks> for MergedTracksResponse {
    fn from(merged: MergedTracks) -> Self {
        Self {
            partial: !merged.is_complete(),
            tracks: merged.tracks,
            failed_batches: merged.failed_batches,
        }
    }
}

pub async fn top_tracks(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    params: Result<Query<TopParams>, QueryRejection>,
) -> Result<Json<Vec<SpotifyTrack>>, ApiError> {
    let Query(params) = params?;
    let tracks = state
        .spotify
        .top_tracks(&token, params.time_range, clamp_limit(params.limit, DEFAULT_LIMIT))
        .await?;
    Ok(Json(tracks))
}

pub async fn top_artists(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    params: Result<Query<TopParams>, QueryRejection>,
) -> Result<Json<Vec<SpotifyArtist>>, ApiError> {
    let Query(params) = params?;
    let artists = state
        .spotify
        .top_artists(&token, params.time_range, clamp_limit(params.limit, DEFAULT_LIMIT))
        .await?;
    Ok(Json(artists))
}

pub async fn recently_played(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    params: Result<Query<LimitParams>, QueryRejection>,
) -> Result<Json<Vec<PlayHistory>>, ApiError> {
    let Query(params) = params?;
    let history = state
        .spotify
        .recently_played(&token, clamp_limit(params.limit, MAX_PAGE_LIMIT))
        .await?;
    Ok(Json(history))
}

/// Audio features for a comma separated list of track ids, fetched in batches.
pub async fn audio_features(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    params: Result<Query<FeatureParams>, QueryRejection>,
) -> Result<Json<FeatureBatches>, ApiError> {
    let Query(params) = params?;
    let ids = utils::parse_id_list(Some(&params.ids));
    if ids.is_empty() {
        return Err(ApiError::InvalidInput("no track ids given".to_string()));
    }

    let batches = fetcher::fetch_features(&state.spotify, &token, &ids).await?;
    Ok(Json(batches))
}

/// Top tracks merged with their audio features.
pub async fn user_top_tracks(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    params: Result<Query<TopParams>, QueryRejection>,
) -> Result<Json<MergedTracksResponse>, ApiError> {
    let Query(params) = params?;
    let tracks = state
        .spotify
        .top_tracks(&token, params.time_range, clamp_limit(params.limit, MAX_PAGE_LIMIT))
        .await?;
    info!("Fetched {} top tracks", tracks.len());

    let merged = fetcher::fetch_merged(&state.spotify, &token, &tracks).await?;
    Ok(Json(merged.into()))
}

/// Recently played tracks merged with their audio features.
pub async fn user_recently_played(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    params: Result<Query<LimitParams>, QueryRejection>,
) -> Result<Json<MergedTracksResponse>, ApiError> {
    let Query(params) = params?;
    let history = state
        .spotify
        .recently_played(&token, clamp_limit(params.limit, MAX_PAGE_LIMIT))
        .await?;
    info!("Fetched {} recently played tracks", history.len());

    let tracks: Vec<SpotifyTrack> = history.into_iter().map(|item| item.track).collect();
    let merged = fetcher::fetch_merged(&state.spotify, &token, &tracks).await?;
    Ok(Json(merged.into()))
}
