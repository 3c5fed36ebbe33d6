use std::ops::Range;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{AppState, CurrentUser, parse_optional_json};
use crate::{
    error::ApiError,
    fetcher,
    recommend::DEFAULT_CLUSTERS,
    spotify::{MAX_PAGE_LIMIT, TimeRange},
    success,
    types::{ClusterAssignment, Recommendation, TrackRecord},
    utils,
};

const DEFAULT_RECOMMENDATIONS: usize = 5;
const DEFAULT_LIST_LIMIT: usize = 20;

#[derive(Debug, Default, Deserialize)]
pub struct TrainRequest {
    tracks: Option<Vec<TrackRecord>>,
    n_clusters: Option<usize>,
    #[serde(default)]
    time_range: TimeRange,
}

#[derive(Debug, Serialize)]
pub struct TrainResponse {
    message: String,
    n_clusters: usize,
    tracks: usize,
    assignments: Vec<ClusterAssignment>,
    partial: bool,
    failed_batches: Vec<Range<usize>>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    seed_tracks: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SimilarParams {
    track_id: String,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TrackParams {
    n_recommendations: Option<usize>,
}

/// Trains the caller's recommendation model.
///
/// With `tracks` in the body the model is fitted on exactly those records.
/// Without, the caller's top tracks for `time_range` are fetched, merged with
/// their audio features, and used instead; feature batches that failed are
/// reported in the response.
pub async fn train(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Bytes,
) -> Result<Json<TrainResponse>, ApiError> {
    let request: TrainRequest = parse_optional_json(&body)?;
    let k = request.n_clusters.unwrap_or(DEFAULT_CLUSTERS);

    let (tracks, failed_batches) = match request.tracks {
        Some(tracks) => (tracks, Vec::new()),
        None => {
            let top = state
                .spotify
                .top_tracks(&user.token, request.time_range, MAX_PAGE_LIMIT)
                .await?;
            let merged = fetcher::fetch_merged(&state.spotify, &user.token, &top).await?;
            (merged.tracks, merged.failed_batches)
        }
    };

    let (assignments, n_clusters) = state.models.fit(&user.profile.id, &tracks, k).await?;
    success!(
        "Trained model for user {} on {} tracks ({} clusters)",
        user.profile.id,
        assignments.len(),
        n_clusters
    );

    Ok(Json(TrainResponse {
        message: "Model trained successfully".to_string(),
        n_clusters,
        tracks: assignments.len(),
        assignments: assignments
            .into_iter()
            .map(|(id, cluster)| ClusterAssignment { id, cluster })
            .collect(),
        partial: !failed_batches.is_empty(),
        failed_batches,
    }))
}

/// Recommendations for the comma separated `seed_tracks`, merged and ranked.
pub async fn recommendations(
    State(state): State<AppState>,
    user: CurrentUser,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Recommendation>>, ApiError> {
    let Query(params) = params?;
    let seeds = utils::parse_id_list(params.seed_tracks.as_deref());
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);

    let recommendations = state
        .models
        .recommend_many(&user.profile.id, &seeds, limit)
        .await?;
    Ok(Json(recommendations))
}

pub async fn similar_tracks(
    State(state): State<AppState>,
    user: CurrentUser,
    params: Result<Query<SimilarParams>, QueryRejection>,
) -> Result<Json<Vec<Recommendation>>, ApiError> {
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);

    let recommendations = state
        .models
        .recommend(&user.profile.id, &params.track_id, limit)
        .await?;
    Ok(Json(recommendations))
}

pub async fn track_recommendations(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(track_id): Path<String>,
    params: Result<Query<TrackParams>, QueryRejection>,
) -> Result<Json<Vec<Recommendation>>, ApiError> {
    let Query(params) = params?;
    let n = params.n_recommendations.unwrap_or(DEFAULT_RECOMMENDATIONS);

    let recommendations = state
        .models
        .recommend(&user.profile.id, &track_id, n)
        .await?;
    Ok(Json(recommendations))
}

pub async fn clear_model(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Json<Value> {
    let cleared = state.models.clear(&user.profile.id).await;
    Json(json!({ "cleared": cleared }))
}
