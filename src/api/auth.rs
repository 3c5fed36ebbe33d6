use axum::{
    Json,
    body::Bytes,
    extract::{Query, State, rejection::QueryRejection},
    response::Redirect,
};
use serde::Deserialize;

use super::{AppState, CurrentUser, parse_optional_json};
use crate::{
    error::ApiError,
    info, success,
    types::{LoginResponse, Token, UserProfile},
    utils, warning,
};

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshParams {
    refresh_token: Option<String>,
}

pub async fn login(State(state): State<AppState>) -> Redirect {
    let url = state.spotify.authorize_url(&utils::generate_state());
    info!("Redirecting to Spotify authorization");
    Redirect::to(&url)
}

/// Completes the login: exchanges the code and returns tokens with the profile.
pub async fn callback(
    State(state): State<AppState>,
    params: Result<Query<CallbackParams>, QueryRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Query(params) = params?;

    if let Some(error) = params.error {
        warning!("Authorization denied: {}", error);
        return Err(ApiError::Unauthorized(format!(
            "Authorization denied: {}",
            error
        )));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::InvalidInput("missing authorization code".to_string()))?;

    let token = state.spotify.exchange_code(&code).await?;
    let user = state.spotify.current_user(&token.access_token).await?;
    success!("User {} logged in", user.id);

    Ok(Json(LoginResponse { token, user }))
}

/// Renews an access token.
///
/// The refresh token is read from a JSON body `{"refresh_token": "..."}` or,
/// failing that, from the `refresh_token` query parameter.
pub async fn refresh(
    State(state): State<AppState>,
    query: Result<Query<RefreshParams>, QueryRejection>,
    body: Bytes,
) -> Result<Json<Token>, ApiError> {
    let Query(query) = query?;
    let from_body: RefreshParams = parse_optional_json(&body)?;

    let refresh_token = from_body
        .refresh_token
        .or(query.refresh_token)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::InvalidInput("missing refresh_token".to_string()))?;

    let token = state.spotify.refresh(&refresh_token).await?;
    Ok(Json(token))
}

pub async fn me(user: CurrentUser) -> Json<UserProfile> {
    Json(user.profile)
}
