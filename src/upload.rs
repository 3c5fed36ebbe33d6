//! Upload proxy: matches an uploaded audio file to a catalog track.
//!
//! The file itself is only staged on disk while the request runs. Its name is
//! turned into a search query, the best match is looked up on Spotify and can
//! then be appended to a playlist and/or saved to the user's liked songs.
//!
//! Individual steps report their failure in [`UploadResponse::error`] and the
//! request still succeeds; only an [`ApiError::Unauthorized`] aborts it.

use std::path::{Path, PathBuf};

use crate::{
    error::ApiError,
    info,
    spotify::SpotifyClient,
    success,
    types::UploadResponse,
    utils, warning,
};

pub const ALLOWED_EXTENSION: &str = "mp3";

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub filename: String,
    pub data: Vec<u8>,
    pub playlist_id: Option<String>,
    pub add_to_liked: bool,
}

/// Accepts only `.mp3` files, case-insensitively.
pub fn validate_filename(filename: &str) -> Result<(), ApiError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some(ALLOWED_EXTENSION) if file_stem(filename).is_some() => Ok(()),
        _ => Err(ApiError::InvalidInput(format!(
            "Only {} files are allowed",
            ALLOWED_EXTENSION.to_uppercase()
        ))),
    }
}

/// Derives the catalog search query from an uploaded file name.
///
/// `Daft_Punk - One More Time.mp3` becomes `Daft Punk - One More Time`.
pub fn search_query(filename: &str) -> String {
    file_stem(filename)
        .unwrap_or_default()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn file_stem(filename: &str) -> Option<&str> {
    Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.trim().is_empty())
}

/// Stages the upload, matches it to a track and applies the requested changes.
///
/// The staged file is removed before returning, whatever the outcome.
pub async fn process_upload(
    client: &SpotifyClient,
    upload_dir: &Path,
    token: &str,
    request: UploadRequest,
) -> Result<UploadResponse, ApiError> {
    validate_filename(&request.filename)?;
    if request.data.is_empty() {
        return Err(ApiError::InvalidInput("uploaded file is empty".to_string()));
    }

    let path = stage_file(upload_dir, &request.data).await?;
    info!(
        "Staged upload {} ({} bytes) at {}",
        request.filename,
        request.data.len(),
        path.display()
    );

    let result = match_and_apply(client, token, &request).await;

    if let Err(e) = async_fs::remove_file(&path).await {
        warning!("Failed to remove staged upload {}: {}", path.display(), e);
    }

    result
}

async fn stage_file(upload_dir: &Path, data: &[u8]) -> Result<PathBuf, ApiError> {
    async_fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| ApiError::Internal(format!("cannot create upload directory: {}", e)))?;

    let name = format!(
        "{}-{}.{}",
        utils::content_digest(data),
        utils::generate_state(),
        ALLOWED_EXTENSION
    );
    let path = upload_dir.join(name);
    async_fs::write(&path, data)
        .await
        .map_err(|e| ApiError::Internal(format!("cannot store upload: {}", e)))?;
    Ok(path)
}

async fn match_and_apply(
    client: &SpotifyClient,
    token: &str,
    request: &UploadRequest,
) -> Result<UploadResponse, ApiError> {
    let mut response = UploadResponse {
        message: "File uploaded successfully".to_string(),
        filename: request.filename.clone(),
        playlist_id: request.playlist_id.clone(),
        add_to_liked: request.add_to_liked,
        ..Default::default()
    };

    let query = search_query(&request.filename);
    let track = match client.search_track(token, &query).await {
        Ok(Some(track)) => track,
        Ok(None) => {
            warning!("No catalog match for '{}'", query);
            response.error = Some("Could not find matching track on Spotify".to_string());
            return Ok(response);
        }
        Err(e @ ApiError::Unauthorized(_)) => return Err(e),
        Err(e) => {
            response.error = Some(format!("Error searching for track: {}", e));
            return Ok(response);
        }
    };

    let Some(track_id) = track.id.clone() else {
        response.error = Some("Matching track cannot be added to a library".to_string());
        return Ok(response);
    };

    response.track_uri = Some(track.uri.clone());
    response.track_name = Some(track.name.clone());
    response.artist_name = Some(track.primary_artist().to_string());
    info!("Matched '{}' to {} by {}", query, track.name, track.primary_artist());

    let mut errors = Vec::new();

    if let Some(playlist_id) = request.playlist_id.as_deref().filter(|id| !id.is_empty()) {
        match client
            .add_to_playlist(token, playlist_id, vec![track.uri.clone()])
            .await
        {
            Ok(_) => match client.playlist(token, playlist_id).await {
                Ok(playlist) => {
                    success!("Added {} to playlist {}", track.name, playlist.name);
                    response.playlist_name = Some(playlist.name);
                }
                Err(e) => warning!("Added to playlist but could not read its name: {}", e),
            },
            Err(e @ ApiError::Unauthorized(_)) => return Err(e),
            Err(e) => errors.push(format!("Error adding to playlist: {}", e)),
        }
    }

    if request.add_to_liked {
        match client.save_tracks(token, vec![track_id]).await {
            Ok(()) => success!("Added {} to liked songs", track.name),
            Err(e @ ApiError::Unauthorized(_)) => return Err(e),
            Err(e) => errors.push(format!("Error adding to liked songs: {}", e)),
        }
    }

    if !errors.is_empty() {
        response.error = Some(errors.join("; "));
    }
    Ok(response)
}
