use axum::{
    Json,
    extract::{
        Multipart, Query, State, multipart::MultipartRejection, rejection::QueryRejection,
    },
};
use serde::{Deserialize, Serialize};

use super::{AppState, BearerToken};
use crate::{
    error::ApiError,
    types::{PlaylistSummary, UploadResponse},
    upload::{self, UploadRequest},
};

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

const DEFAULT_PLAYLIST_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct PlaylistParams {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct PlaylistsResponse {
    items: Vec<PlaylistSummary>,
    total: usize,
}

pub async fn playlists(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    params: Result<Query<PlaylistParams>, QueryRejection>,
) -> Result<Json<PlaylistsResponse>, ApiError> {
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(DEFAULT_PLAYLIST_LIMIT).max(1);

    let items = state.spotify.playlists(&token, limit).await?;
    Ok(Json(PlaylistsResponse {
        total: items.len(),
        items,
    }))
}

/// Accepts a multipart form with `file`, optional `playlist_id` and `add_to_liked`.
pub async fn upload(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
    let mut filename: Option<String> = None;
    let mut data: Option<Vec<u8>> = None;
    let mut playlist_id: Option<String> = None;
    let mut add_to_liked = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                filename = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::InvalidInput(e.body_text()))?;
                data = Some(bytes.to_vec());
            }
            "playlist_id" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::InvalidInput(e.body_text()))?;
                let value = value.trim();
                if !value.is_empty() {
                    playlist_id = Some(value.to_string());
                }
            }
            "add_to_liked" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::InvalidInput(e.body_text()))?;
                add_to_liked = parse_flag(&value);
            }
            _ => {}
        }
    }

    let filename = filename
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ApiError::InvalidInput("No filename provided".to_string()))?;
    upload::validate_filename(&filename)?;
    let data = data.ok_or_else(|| ApiError::InvalidInput("No file data provided".to_string()))?;

    let response = upload::process_upload(
        &state.spotify,
        &state.config.upload_dir,
        &token,
        UploadRequest {
            filename,
            data,
            playlist_id,
            add_to_liked,
        },
    )
    .await?;
    Ok(Json(response))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "on" | "yes"
    )
}
