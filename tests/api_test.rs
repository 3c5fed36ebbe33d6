mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use common::{ALICE, BOB, TestServer, spawn_mock_spotify, test_state};
use serde_json::{Value, json};
use sporlyze::server::router;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "sporlyze-test-boundary";

struct TestApp {
    app: Router,
    spotify: TestServer,
    upload_dir: TempDir,
}

async fn test_app() -> TestApp {
    let spotify = spawn_mock_spotify().await;
    let upload_dir = tempfile::tempdir().unwrap();
    let state = test_state(&spotify.base_url, upload_dir.path().join("staging"));
    TestApp {
        app: router(state),
        spotify,
        upload_dir,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn post_empty(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn multipart_upload(filename: &str, fields: &[(&str, &str)]) -> Request<Body> {
    multipart_upload_as(ALICE, filename, fields)
}

fn multipart_upload_as(token: &str, filename: &str, fields: &[(&str, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: audio/mpeg\r\n\r\nID3 not really an mp3\r\n--{BOUNDARY}--\r\n"
    ));

    Request::builder()
        .method("POST")
        .uri("/upload/upload")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn ids(values: &Value) -> Vec<String> {
    values
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health() {
    let t = test_app().await;
    let (status, body) = send(&t.app, get("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&t.app, get("/", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Sporlyze API");
}

#[tokio::test]
async fn test_missing_bearer_is_structured_401() {
    let t = test_app().await;
    let response = t
        .app
        .clone()
        .oneshot(get("/auth/me", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["status"], 401);
    assert_eq!(body["error"]["message"], "No authorization header provided");
}

#[tokio::test]
async fn test_malformed_and_rejected_tokens() {
    let t = test_app().await;

    let request = Request::builder()
        .uri("/auth/me")
        .header(header::AUTHORIZATION, "Basic abc")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Invalid authorization header format");

    let (status, body) = send(&t.app, get("/auth/me", Some("stolen"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Could not validate credentials");
}

#[tokio::test]
async fn test_me_returns_profile() {
    let t = test_app().await;
    let (status, body) = send(&t.app, get("/auth/me", Some(ALICE))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "alice");
}

#[tokio::test]
async fn test_login_redirects_to_consent_page() {
    let t = test_app().await;
    let response = t
        .app
        .clone()
        .oneshot(get("/spotify/login", None))
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("https://accounts.example.com/authorize?"));
    assert!(location.contains("client_id=client-id"));
    assert!(location.contains("response_type=code"));
    assert!(location.contains("show_dialog=true"));
    assert!(location.contains("state="));
}

#[tokio::test]
async fn test_callback_exchanges_code() {
    let t = test_app().await;
    let (status, body) = send(&t.app, get("/spotify/callback?code=good-code", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["access_token"], ALICE);
    assert_eq!(body["refresh_token"], "refresh-1");
    assert_eq!(body["expires_in"], 3600);
    assert_eq!(body["user"]["id"], "alice");
}

#[tokio::test]
async fn test_callback_with_bad_code_is_401() {
    let t = test_app().await;
    let (status, body) = send(&t.app, get("/spotify/callback?code=expired", None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Invalid authorization code");

    let (status, _) = send(&t.app, get("/spotify/callback?error=access_denied", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&t.app, get("/spotify/callback", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_keeps_refresh_token() {
    let t = test_app().await;
    let request = post_json(
        "/spotify/refresh",
        None,
        json!({ "refresh_token": "refresh-1" }),
    );
    let (status, body) = send(&t.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["access_token"], "token-alice-2");
    assert_eq!(body["refresh_token"], "refresh-1");

    let request = Request::builder()
        .method("POST")
        .uri("/spotify/refresh?refresh_token=revoked")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_audio_features_reports_failed_batch() {
    let t = test_app().await;
    *t.spotify.mock.fail_feature_call.lock().unwrap() = Some(1);

    let list: Vec<String> = (0..45).map(|i| format!("track-{}", i)).collect();
    let uri = format!("/analysis/audio-features?ids={}", list.join(","));
    let (status, body) = send(&t.app, get(&uri, Some(ALICE))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["features"].as_array().unwrap().len(), 25);
    assert_eq!(body["failed_batches"], json!([{ "start": 20, "end": 40 }]));

    let sizes: Vec<usize> = t
        .spotify
        .mock
        .feature_calls
        .lock()
        .unwrap()
        .iter()
        .map(Vec::len)
        .collect();
    assert_eq!(sizes, vec![20, 20, 5]);
}

#[tokio::test]
async fn test_recently_played_drops_tracks_without_features() {
    let t = test_app().await;
    let (status, body) = send(&t.app, get("/user/recently-played", Some(ALICE))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body["tracks"]), vec!["calm-1", "party-2"]);
    assert_eq!(body["partial"], false);
    assert!(body["tracks"][0]["features"]["tempo"].is_number());
}

#[tokio::test]
async fn test_top_tracks_passthrough() {
    let t = test_app().await;
    let (status, body) = send(
        &t.app,
        get("/analysis/top-tracks?time_range=short_term&limit=5", Some(ALICE)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 12);

    let (status, _) = send(
        &t.app,
        get("/analysis/top-tracks?time_range=forever", Some(ALICE)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recommend_before_training_is_409() {
    let t = test_app().await;
    let (status, body) = send(&t.app, get("/recommendations/calm-0", Some(ALICE))).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["status"], 409);
}

#[tokio::test]
async fn test_train_from_top_tracks_then_recommend() {
    let t = test_app().await;
    let (status, body) = send(&t.app, post_empty("/recommendations/train", ALICE)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tracks"], 12);
    assert_eq!(body["n_clusters"], 5);
    assert_eq!(body["partial"], false);

    let (status, body) = send(
        &t.app,
        get("/recommendations/calm-0?n_recommendations=3", Some(ALICE)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let recommended = ids(&body);
    assert!(recommended.len() <= 3);
    assert!(!recommended.contains(&"calm-0".to_string()));
    assert!(recommended.iter().all(|id| id.starts_with("calm-")));

    let (status, _) = send(&t.app, get("/recommendations/nope", Some(ALICE))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_train_with_explicit_tracks() {
    let t = test_app().await;
    let tracks: Vec<Value> = (0..4)
        .map(|i| {
            serde_json::to_value(common::record(
                &format!("party-{}", i),
                Some(common::group_features(1, i)),
            ))
            .unwrap()
        })
        .collect();
    let request = post_json(
        "/recommendations/train",
        Some(ALICE),
        json!({ "tracks": tracks, "n_clusters": 1 }),
    );
    let (status, body) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["n_clusters"], 1);
    assert!(t.spotify.mock.feature_calls.lock().unwrap().is_empty());

    let (status, body) = send(
        &t.app,
        get("/recommendations/similar-tracks?track_id=party-0&limit=2", Some(ALICE)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["party-1", "party-2"]);

    let request = post_json("/recommendations/train", Some(ALICE), json!({ "tracks": [] }));
    let (status, _) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_models_are_isolated_between_users() {
    let t = test_app().await;
    let request = post_json("/recommendations/train", Some(ALICE), json!({ "n_clusters": 2 }));
    let (status, _) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&t.app, get("/recommendations/calm-0", Some(BOB))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &t.app,
        get("/recommendations?seed_tracks=calm-0,calm-1&limit=10", Some(ALICE)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let recommended = ids(&body);
    assert!(!recommended.is_empty());
    assert!(!recommended.contains(&"calm-1".to_string()));

    let request = Request::builder()
        .method("DELETE")
        .uri("/recommendations/model")
        .header(header::AUTHORIZATION, format!("Bearer {}", ALICE))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleared"], true);

    let (status, _) = send(&t.app, get("/recommendations/calm-0", Some(ALICE))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_playlists_follow_pagination() {
    let t = test_app().await;
    let (status, body) = send(&t.app, get("/upload/playlists", Some(ALICE))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(ids(&body["items"]), vec!["pl1", "pl2", "pl3"]);

    let (_, body) = send(&t.app, get("/upload/playlists?limit=2", Some(ALICE))).await;
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn test_upload_rejects_non_mp3() {
    let t = test_app().await;
    let (status, body) = send(&t.app, multipart_upload("cover.wav", &[])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Only MP3 files are allowed");
    assert!(t.spotify.mock.search_queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_adds_to_playlist_and_liked() {
    let t = test_app().await;
    let request = multipart_upload(
        "Calm_Three.mp3",
        &[("playlist_id", "pl1"), ("add_to_liked", "true")],
    );
    let (status, body) = send(&t.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "File uploaded successfully");
    assert_eq!(body["track_uri"], "spotify:track:calm-3");
    assert_eq!(body["playlist_name"], "Road Trip");
    assert_eq!(body["add_to_liked"], true);
    assert!(body.get("error").is_none());

    let mock = &t.spotify.mock;
    assert_eq!(*mock.search_queries.lock().unwrap(), vec!["Calm Three"]);
    assert_eq!(
        *mock.playlist_adds.lock().unwrap(),
        vec![("pl1".to_string(), vec!["spotify:track:calm-3".to_string()])]
    );
    assert_eq!(*mock.saved_tracks.lock().unwrap(), vec!["calm-3"]);

    // Staged file is gone
    let staging = t.upload_dir.path().join("staging");
    assert_eq!(std::fs::read_dir(staging).unwrap().count(), 0);
}

#[tokio::test]
async fn test_upload_reports_step_failures() {
    let t = test_app().await;

    let request = multipart_upload("nothing here.mp3", &[("add_to_liked", "true")]);
    let (status, body) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], "Could not find matching track on Spotify");
    assert!(t.spotify.mock.saved_tracks.lock().unwrap().is_empty());

    let request = multipart_upload(
        "calm.mp3",
        &[("playlist_id", "forbidden"), ("add_to_liked", "true")],
    );
    let (status, body) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::OK);
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("Error adding to playlist"));
    assert_eq!(*t.spotify.mock.saved_tracks.lock().unwrap(), vec!["calm-3"]);

    let staging = t.upload_dir.path().join("staging");
    assert_eq!(std::fs::read_dir(staging).unwrap().count(), 0);
}

#[tokio::test]
async fn test_upload_aborts_on_rejected_token_and_cleans_up() {
    let t = test_app().await;
    let request = multipart_upload_as("expired", "calm.mp3", &[("add_to_liked", "true")]);
    let response = t.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    assert!(t.spotify.mock.saved_tracks.lock().unwrap().is_empty());

    // The file was staged before the search failed and is removed again
    let staging = t.upload_dir.path().join("staging");
    assert!(staging.is_dir());
    assert_eq!(std::fs::read_dir(staging).unwrap().count(), 0);
}
