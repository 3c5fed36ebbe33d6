use super::{MAX_PAGE_LIMIT, SpotifyClient, check_status};
use crate::{
    error::ApiError,
    info,
    types::{
        AddTrackToPlaylistRequest, AddTrackToPlaylistResponse, Paging, PlaylistSummary,
        SaveTracksRequest,
    },
};

impl SpotifyClient {
    /// Retrieves up to `limit` playlists of the user.
    ///
    /// Follows the `next` links of the paging object until `limit` playlists are
    /// collected or Spotify has no more pages.
    pub async fn playlists(
        &self,
        token: &str,
        limit: usize,
    ) -> Result<Vec<PlaylistSummary>, ApiError> {
        let page_size = limit.clamp(1, MAX_PAGE_LIMIT as usize);
        let mut playlists = Vec::new();
        let mut page: Paging<PlaylistSummary> = self
            .get_json(
                token,
                &self.endpoint("me/playlists"),
                &[("limit", page_size.to_string())],
            )
            .await?;

        loop {
            playlists.append(&mut page.items);
            if playlists.len() >= limit {
                playlists.truncate(limit);
                break;
            }
            match page.next.take() {
                Some(next) => page = self.get_json(token, &next, &[]).await?,
                None => break,
            }
        }

        info!("Found {} playlists", playlists.len());
        Ok(playlists)
    }

    pub async fn playlist(&self, token: &str, playlist_id: &str) -> Result<PlaylistSummary, ApiError> {
        let url = self.endpoint(&format!("playlists/{}", urlencoding::encode(playlist_id)));
        self.get_json(token, &url, &[]).await
    }

    /// Appends tracks to a playlist and returns the new snapshot id.
    pub async fn add_to_playlist(
        &self,
        token: &str,
        playlist_id: &str,
        uris: Vec<String>,
    ) -> Result<String, ApiError> {
        let url = self.endpoint(&format!(
            "playlists/{}/tracks",
            urlencoding::encode(playlist_id)
        ));
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&AddTrackToPlaylistRequest { uris })
            .send()
            .await?;

        let response = check_status(response).await?;
        let body = response.json::<AddTrackToPlaylistResponse>().await?;
        Ok(body.snapshot_id)
    }

    /// Saves tracks to the user's liked songs.
    pub async fn save_tracks(&self, token: &str, ids: Vec<String>) -> Result<(), ApiError> {
        let response = self
            .http
            .put(self.endpoint("me/tracks"))
            .bearer_auth(token)
            .json(&SaveTracksRequest { ids })
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}
