use chrono::Utc;
use reqwest::StatusCode;
use serde_json::Value;

use super::{SpotifyClient, check_status, upstream_message};
use crate::{
    error::ApiError,
    types::{Token, TokenResponse, UserProfile},
    warning,
};

impl SpotifyClient {
    /// Builds the Spotify authorization URL the user is redirected to at login.
    ///
    /// The URL requests an authorization `code` for the configured redirect URI
    /// and scopes, always shows the consent dialog, and carries `state` so the
    /// frontend can match the callback to the login it started.
    ///
    /// # Example
    ///
    /// ```
    /// let url = client.authorize_url("Xb3k...");
    /// // https://accounts.spotify.com/authorize?client_id=...&response_type=code&...
    /// ```
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{auth_url}?client_id={client_id}&response_type=code&redirect_uri={redirect_uri}&scope={scope}&show_dialog=true&state={state}",
            auth_url = self.auth_url,
            client_id = urlencoding::encode(&self.client_id),
            redirect_uri = urlencoding::encode(&self.redirect_uri),
            scope = urlencoding::encode(&self.scope),
            state = urlencoding::encode(state),
        )
    }

    /// Exchanges an authorization code for an access token.
    ///
    /// Completes the authorization-code flow. The token is returned to the
    /// caller as is; the backend keeps no copy.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Unauthorized`] if Spotify rejects the code (`invalid_grant`)
    /// - [`ApiError::ExternalApi`] for other token endpoint failures
    pub async fn exchange_code(&self, code: &str) -> Result<Token, ApiError> {
        let response = self
            .token_request(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .await?;

        Ok(Token {
            access_token: response.access_token,
            refresh_token: response.refresh_token.unwrap_or_default(),
            scope: response.scope.unwrap_or_default(),
            expires_in: response.expires_in.unwrap_or(3600),
            obtained_at: Utc::now().timestamp() as u64,
        })
    }

    /// Exchanges a refresh token for a fresh access token.
    ///
    /// Spotify may or may not rotate the refresh token. When the response
    /// carries none, the one that was sent stays valid and is returned again.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Token, ApiError> {
        let response = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;

        Ok(Token {
            access_token: response.access_token,
            refresh_token: response
                .refresh_token
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| refresh_token.to_string()),
            scope: response.scope.unwrap_or_default(),
            expires_in: response.expires_in.unwrap_or(3600),
            obtained_at: Utc::now().timestamp() as u64,
        })
    }

    /// Validates an access token by fetching the profile it belongs to.
    pub async fn current_user(&self, token: &str) -> Result<UserProfile, ApiError> {
        self.get_json(token, &self.endpoint("me"), &[]).await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, ApiError> {
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            warning!("Token request rejected: {}", body);
            let json: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
            if json["error"].as_str() == Some("invalid_grant") {
                return Err(ApiError::Unauthorized(
                    upstream_message(&body).unwrap_or_else(|| "invalid grant".to_string()),
                ));
            }
            return Err(ApiError::ExternalApi {
                status: 400,
                detail: upstream_message(&body).unwrap_or_else(|| "Bad Request".to_string()),
            });
        }

        let response = check_status(response).await?;
        Ok(response.json::<TokenResponse>().await?)
    }
}
