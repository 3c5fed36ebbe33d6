use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Number of dimensions of an [`AudioFeatureVector`].
pub const FEATURE_DIMENSIONS: usize = 11;

/// Column names in the order produced by [`AudioFeatureVector::as_array`].
pub const FEATURE_COLUMNS: [&str; FEATURE_DIMENSIONS] = [
    "danceability",
    "energy",
    "key",
    "loudness",
    "mode",
    "speechiness",
    "acousticness",
    "instrumentalness",
    "liveness",
    "valence",
    "tempo",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_in: u64,
    pub obtained_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub token: Token,
    pub user: UserProfile,
}

/// The acoustic description of a track as reported by the audio-features endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatureVector {
    pub danceability: f64,
    pub energy: f64,
    pub key: i32,
    pub loudness: f64,
    pub mode: i32,
    pub speechiness: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub valence: f64,
    pub tempo: f64,
}

impl AudioFeatureVector {
    pub fn as_array(&self) -> [f64; FEATURE_DIMENSIONS] {
        [
            self.danceability,
            self.energy,
            self.key as f64,
            self.loudness,
            self.mode as f64,
            self.speechiness,
            self.acousticness,
            self.instrumentalness,
            self.liveness,
            self.valence,
            self.tempo,
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub id: String,
    #[serde(flatten)]
    pub vector: AudioFeatureVector,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFeaturesResponse {
    pub audio_features: Vec<Option<AudioFeatures>>,
}

/// A track merged with its audio features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub popularity: u32,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub features: Option<AudioFeatureVector>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleArtist {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTrack {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub artists: Vec<SimpleArtist>,
    #[serde(default)]
    pub popularity: u32,
    #[serde(default)]
    pub duration_ms: u64,
}

impl SpotifyTrack {
    pub fn primary_artist(&self) -> &str {
        self.artists
            .first()
            .map(|artist| artist.name.as_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub popularity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paging<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayHistory {
    pub track: SpotifyTrack,
    pub played_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistOwner {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub public: Option<bool>,
    #[serde(default)]
    pub collaborative: bool,
    #[serde(default)]
    pub snapshot_id: Option<String>,
    #[serde(default)]
    pub owner: Option<PlaylistOwner>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub tracks: Paging<SpotifyTrack>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTrackToPlaylistRequest {
    pub uris: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTrackToPlaylistResponse {
    pub snapshot_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveTracksRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FeatureBatches {
    pub features: Vec<AudioFeatures>,
    pub failed_batches: Vec<Range<usize>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MergedTracks {
    pub tracks: Vec<TrackRecord>,
    pub failed_batches: Vec<Range<usize>>,
}

impl MergedTracks {
    pub fn is_complete(&self) -> bool {
        self.failed_batches.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub track: TrackRecord,
    pub similarity: f64,
    pub cluster: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterAssignment {
    pub id: String,
    pub cluster: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
    pub playlist_id: Option<String>,
    pub add_to_liked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
