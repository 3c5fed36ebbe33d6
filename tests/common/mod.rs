#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::{Value, json};
use sporlyze::{
    api::AppState,
    config::{Config, DEFAULT_FRONTEND_ORIGIN, DEFAULT_SCOPES},
    types::{AudioFeatureVector, TrackRecord},
};

pub const ALICE: &str = "token-alice";
pub const BOB: &str = "token-bob";
pub const CAROL: &str = "token-carol";

#[derive(Default)]
pub struct MockSpotify {
    pub feature_calls: Mutex<Vec<Vec<String>>>,
    pub fail_feature_call: Mutex<Option<usize>>,
    pub saved_tracks: Mutex<Vec<String>>,
    pub playlist_adds: Mutex<Vec<(String, Vec<String>)>>,
    pub search_queries: Mutex<Vec<String>>,
}

pub struct TestServer {
    pub base_url: String,
    pub mock: Arc<MockSpotify>,
}

/// Starts a local stand-in for the Spotify accounts service and Web API.
pub async fn spawn_mock_spotify() -> TestServer {
    let mock = Arc::new(MockSpotify::default());

    let app = Router::new()
        .route("/token", post(token))
        .route("/v1/me", get(me))
        .route("/v1/me/top/tracks", get(top_tracks))
        .route("/v1/me/top/artists", get(top_artists))
        .route("/v1/me/player/recently-played", get(recently_played))
        .route("/v1/me/playlists", get(playlists))
        .route("/v1/me/tracks", put(save_tracks))
        .route("/v1/audio-features", get(audio_features))
        .route("/v1/search", get(search))
        .route("/v1/playlists/{id}", get(playlist))
        .route("/v1/playlists/{id}/tracks", post(add_tracks))
        .with_state(Arc::clone(&mock));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{}", addr),
        mock,
    }
}

pub fn test_config(base_url: &str, upload_dir: PathBuf) -> Config {
    Config {
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        redirect_uri: "http://127.0.0.1:8000/spotify/callback".to_string(),
        auth_url: "https://accounts.example.com/authorize".to_string(),
        token_url: format!("{}/token", base_url),
        api_url: format!("{}/v1", base_url),
        scope: DEFAULT_SCOPES.join(" "),
        server_address: "127.0.0.1:0".parse().unwrap(),
        frontend_origin: DEFAULT_FRONTEND_ORIGIN.to_string(),
        upload_dir,
    }
}

pub fn test_state(base_url: &str, upload_dir: PathBuf) -> AppState {
    AppState::new(test_config(base_url, upload_dir))
}

/// Feature vector of the calm group (`group == 0`) or the party group.
pub fn group_features(group: usize, i: usize) -> AudioFeatureVector {
    let j = i as f64;
    if group == 0 {
        AudioFeatureVector {
            danceability: 0.20 + 0.01 * j,
            energy: 0.15 + 0.01 * j,
            key: 2,
            loudness: -18.0 - 0.1 * j,
            mode: 0,
            speechiness: 0.04,
            acousticness: 0.90 - 0.01 * j,
            instrumentalness: 0.70,
            liveness: 0.10,
            valence: 0.20,
            tempo: 80.0 + j,
        }
    } else {
        AudioFeatureVector {
            danceability: 0.85 + 0.01 * j,
            energy: 0.90,
            key: 7,
            loudness: -4.0 + 0.1 * j,
            mode: 1,
            speechiness: 0.10,
            acousticness: 0.05,
            instrumentalness: 0.0,
            liveness: 0.30,
            valence: 0.85 - 0.01 * j,
            tempo: 128.0 + j,
        }
    }
}

pub fn record(id: &str, features: Option<AudioFeatureVector>) -> TrackRecord {
    TrackRecord {
        id: id.to_string(),
        name: format!("Track {}", id),
        artist: "Test Artist".to_string(),
        popularity: 50,
        duration_ms: 200_000,
        features,
    }
}

fn features_for(id: &str) -> Option<AudioFeatureVector> {
    let (prefix, index) = id.rsplit_once('-')?;
    let index: usize = index.parse().ok()?;
    match prefix {
        "calm" => Some(group_features(0, index)),
        "party" => Some(group_features(1, index)),
        "track" => Some(group_features(index % 2, index)),
        _ => None,
    }
}

fn track_json(id: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Song {}", id),
        "uri": format!("spotify:track:{}", id),
        "artists": [{ "id": "artist-1", "name": "Mock Artist" }],
        "popularity": 60,
        "duration_ms": 180000,
    })
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": { "status": 401, "message": "Invalid access token" } })),
    )
        .into_response()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn user_for(headers: &HeaderMap) -> Option<&'static str> {
    match bearer(headers)?.as_str() {
        ALICE => Some("alice"),
        BOB => Some("bob"),
        CAROL => Some("carol"),
        _ => None,
    }
}

async fn token(Form(form): Form<HashMap<String, String>>) -> Response {
    let grant = form.get("grant_type").map(String::as_str);
    match (grant, form.get("code"), form.get("refresh_token")) {
        (Some("authorization_code"), Some(code), _) if code == "good-code" => Json(json!({
            "access_token": ALICE,
            "token_type": "Bearer",
            "scope": "user-top-read",
            "expires_in": 3600,
            "refresh_token": "refresh-1",
        }))
        .into_response(),
        (Some("refresh_token"), _, Some(refresh)) if refresh == "refresh-1" => Json(json!({
            "access_token": "token-alice-2",
            "token_type": "Bearer",
            "scope": "user-top-read",
            "expires_in": 3600,
        }))
        .into_response(),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Invalid authorization code" })),
        )
            .into_response(),
    }
}

async fn me(headers: HeaderMap) -> Response {
    match user_for(&headers) {
        Some(user) => Json(json!({ "id": user, "display_name": user })).into_response(),
        None => unauthorized(),
    }
}

async fn top_tracks(headers: HeaderMap) -> Response {
    if user_for(&headers).is_none() {
        return unauthorized();
    }
    let items: Vec<Value> = (0..6)
        .flat_map(|i| [track_json(&format!("calm-{}", i)), track_json(&format!("party-{}", i))])
        .collect();
    Json(json!({ "items": items, "next": null, "total": 12 })).into_response()
}

async fn top_artists(headers: HeaderMap) -> Response {
    if user_for(&headers).is_none() {
        return unauthorized();
    }
    Json(json!({
        "items": [{ "id": "artist-1", "name": "Mock Artist", "genres": ["ambient"], "popularity": 70 }],
        "next": null,
    }))
    .into_response()
}

async fn recently_played(headers: HeaderMap) -> Response {
    if user_for(&headers).is_none() {
        return unauthorized();
    }
    Json(json!({
        "items": [
            { "track": track_json("calm-1"), "played_at": "2024-05-01T10:00:00Z" },
            { "track": track_json("unknown-1"), "played_at": "2024-05-01T09:55:00Z" },
            { "track": track_json("party-2"), "played_at": "2024-05-01T09:50:00Z" },
        ],
        "next": null,
    }))
    .into_response()
}

async fn playlists(
    headers: HeaderMap,
    State(_mock): State<Arc<MockSpotify>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if user_for(&headers).is_none() {
        return unauthorized();
    }
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("127.0.0.1")
        .to_string();

    if query.get("offset").map(String::as_str) == Some("2") {
        return Json(json!({
            "items": [{ "id": "pl3", "name": "Third", "collaborative": false }],
            "next": null,
            "total": 3,
        }))
        .into_response();
    }

    Json(json!({
        "items": [
            { "id": "pl1", "name": "Road Trip", "collaborative": false },
            { "id": "pl2", "name": "Focus", "collaborative": true },
        ],
        "next": format!("http://{}/v1/me/playlists?offset=2&limit=2", host),
        "total": 3,
    }))
    .into_response()
}

async fn audio_features(
    headers: HeaderMap,
    State(mock): State<Arc<MockSpotify>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if user_for(&headers).is_none() {
        return unauthorized();
    }
    let ids: Vec<String> = query
        .get("ids")
        .map(|ids| ids.split(',').map(str::to_string).collect())
        .unwrap_or_default();

    let call = {
        let mut calls = mock.feature_calls.lock().unwrap();
        calls.push(ids.clone());
        calls.len() - 1
    };
    if *mock.fail_feature_call.lock().unwrap() == Some(call) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": { "status": 500, "message": "feature service unavailable" } })),
        )
            .into_response();
    }

    let features: Vec<Value> = ids
        .iter()
        .map(|id| match features_for(id) {
            Some(vector) => {
                let mut value = serde_json::to_value(vector).unwrap();
                value["id"] = json!(id);
                value["type"] = json!("audio_features");
                value
            }
            None => Value::Null,
        })
        .collect();
    Json(json!({ "audio_features": features })).into_response()
}

async fn search(
    headers: HeaderMap,
    State(mock): State<Arc<MockSpotify>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if user_for(&headers).is_none() {
        return unauthorized();
    }
    let q = query.get("q").cloned().unwrap_or_default();
    mock.search_queries.lock().unwrap().push(q.clone());

    let items = if q.contains("nothing") {
        Vec::new()
    } else {
        vec![track_json("calm-3")]
    };
    Json(json!({ "tracks": { "items": items, "next": null, "total": 1 } })).into_response()
}

async fn playlist(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if user_for(&headers).is_none() {
        return unauthorized();
    }
    Json(json!({ "id": id, "name": "Road Trip", "collaborative": false })).into_response()
}

async fn add_tracks(
    headers: HeaderMap,
    State(mock): State<Arc<MockSpotify>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if user_for(&headers).is_none() {
        return unauthorized();
    }
    if id == "forbidden" {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": { "status": 403, "message": "You cannot add tracks to this playlist" } })),
        )
            .into_response();
    }
    let uris: Vec<String> = serde_json::from_value(body["uris"].clone()).unwrap_or_default();
    mock.playlist_adds.lock().unwrap().push((id, uris));
    (StatusCode::CREATED, Json(json!({ "snapshot_id": "snap-1" }))).into_response()
}

async fn save_tracks(
    headers: HeaderMap,
    State(mock): State<Arc<MockSpotify>>,
    Json(body): Json<Value>,
) -> Response {
    if user_for(&headers).is_none() {
        return unauthorized();
    }
    let ids: Vec<String> = serde_json::from_value(body["ids"].clone()).unwrap_or_default();
    mock.saved_tracks.lock().unwrap().extend(ids);
    StatusCode::OK.into_response()
}
