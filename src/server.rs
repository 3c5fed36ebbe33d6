use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;

use crate::{
    Res,
    api::{self, AppState},
    config::{Config, DEFAULT_FRONTEND_ORIGIN},
    info, success, warning,
};

/// Builds the application router with all routes and the CORS policy.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.frontend_origin);

    Router::new()
        .route("/", get(api::root))
        .route("/health", get(api::health))
        .route("/spotify/login", get(api::login))
        .route("/spotify/callback", get(api::callback))
        .route("/spotify/refresh", post(api::refresh))
        .route("/auth/me", get(api::me))
        .route("/analysis/top-tracks", get(api::top_tracks))
        .route("/analysis/top-artists", get(api::top_artists))
        .route("/analysis/recently-played", get(api::recently_played))
        .route("/analysis/audio-features", get(api::audio_features))
        .route("/user/top-tracks", get(api::user_top_tracks))
        .route("/user/recently-played", get(api::user_recently_played))
        .route("/recommendations", get(api::recommendations))
        .route("/recommendations/train", post(api::train))
        .route("/recommendations/similar-tracks", get(api::similar_tracks))
        .route("/recommendations/model", delete(api::clear_model))
        .route("/recommendations/{track_id}", get(api::track_recommendations))
        .route("/upload/playlists", get(api::playlists))
        .route(
            "/upload/upload",
            post(api::upload).layer(DefaultBodyLimit::max(api::MAX_UPLOAD_BYTES)),
        )
        .layer(cors)
        .with_state(state)
}

/// Binds the configured address and serves until Ctrl-C.
pub async fn start_api_server(config: Config) -> Res<()> {
    let addr = config.server_address;
    let state = AppState::new(config);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    success!("Server stopped");
    Ok(())
}

fn cors_layer(origin: &str) -> CorsLayer {
    let origin = HeaderValue::from_str(origin).unwrap_or_else(|_| {
        warning!(
            "Invalid FRONTEND_ORIGIN '{}', falling back to {}",
            origin,
            DEFAULT_FRONTEND_ORIGIN
        );
        HeaderValue::from_static(DEFAULT_FRONTEND_ORIGIN)
    });

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warning!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
