use std::time::{Duration, Instant};

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::Mutex;
use url::Url;

use crate::error::{FetchError, RemoteError};
use crate::model::{PlaylistId, TrackId};
use crate::ports::track_provider::{Page, PlaylistSummary, TrackProvider, UserProfile};
use crate::spotify::auth::{SpotifyApiCredentials, refresh_access_token};
use crate::spotify::types::{
    Paging, SpotifyPlaylist, SpotifyTokenResponse, SpotifyTrackItem, SpotifyUser,
};

pub const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Refresh this long before the access token actually expires.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);
const PLAYLISTS_PAGE_SIZE: usize = 50;

#[derive(Debug)]
struct AccessToken {
    value: String,
    refresh_token: Option<String>,
    expires_at: Instant,
}

impl AccessToken {
    fn from_response(response: SpotifyTokenResponse, previous_refresh: Option<String>) -> Self {
        Self {
            value: response.access_token,
            // Refresh responses may omit the refresh token, the old one stays valid then.
            refresh_token: response.refresh_token.or(previous_refresh),
            expires_at: Instant::now() + Duration::from_secs(response.expires_in),
        }
    }

    fn needs_refresh(&self, now: Instant) -> bool {
        self.refresh_token.is_some() && self.expires_at.saturating_duration_since(now) < REFRESH_MARGIN
    }
}

/// Spotify Web API client for an authenticated user
#[derive(Debug)]
pub struct SpotifyWebClient {
    http: reqwest::Client,
    credentials: SpotifyApiCredentials,
    api_base: Url,
    market: String,
    token: Mutex<AccessToken>,
}

impl SpotifyWebClient {
    pub fn new(
        http: reqwest::Client,
        credentials: SpotifyApiCredentials,
        api_base: Url,
        token: SpotifyTokenResponse,
    ) -> Self {
        Self {
            http,
            credentials,
            api_base,
            market: "US".to_string(),
            token: Mutex::new(AccessToken::from_response(token, None)),
        }
    }

    pub fn with_market(mut self, market: &str) -> Self {
        self.market = market.to_string();
        self
    }

    async fn bearer(&self) -> Result<String, RemoteError> {
        let mut token = self.token.lock().await;
        if token.needs_refresh(Instant::now())
            && let Some(refresh_token) = token.refresh_token.clone()
        {
            let response = refresh_access_token(&self.http, &self.credentials, &refresh_token)
                .await
                .map_err(|error| RemoteError::new(Some(401), error.to_string()))?;
            *token = AccessToken::from_response(response, Some(refresh_token));
            log::debug!("Refreshed spotify access token");
        }
        Ok(token.value.clone())
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        self.api_base
            .join(path)
            .map_err(|error| RemoteError::new(None, format!("Invalid endpoint {path}: {error}")))
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, RemoteError> {
        let bearer = self.bearer().await?;
        let response = request
            .bearer_auth(bearer)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let reason = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error text".to_string());
            return Err(RemoteError::new(
                Some(status.as_u16()),
                format!("{status}: {reason}"),
            ));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, RemoteError> {
        let response = self.send(self.http.get(url)).await?;
        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl TrackProvider for SpotifyWebClient {
    async fn current_user(&self) -> Result<UserProfile, FetchError> {
        let user: SpotifyUser = self.get_json(self.endpoint("me")?).await?;
        Ok(user.into())
    }

    async fn current_user_playlists(&self) -> Result<Vec<PlaylistSummary>, FetchError> {
        let mut url = self.endpoint("me/playlists")?;
        url.query_pairs_mut()
            .append_pair("limit", &PLAYLISTS_PAGE_SIZE.to_string());

        let mut playlists = Vec::new();
        let mut next_url = Some(url);
        while let Some(url) = next_url {
            let page: Paging<SpotifyPlaylist> = self.get_json(url).await?;
            playlists.extend(page.items.into_iter().map(PlaylistSummary::from));
            next_url = page
                .next
                .map(|next| Url::parse(&next))
                .transpose()
                .map_err(|error| FetchError::TransientFetch(error.to_string()))?;
        }

        Ok(playlists)
    }

    async fn fetch_library_page(&self, offset: usize, limit: usize) -> Result<Page, FetchError> {
        let mut url = self.endpoint("me/tracks")?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string())
            .append_pair("market", &self.market);

        let paging: Paging<SpotifyTrackItem> = self.get_json(url).await?;
        Ok(paging.into())
    }

    async fn fetch_playlist_page(
        &self,
        playlist_id: &PlaylistId,
        offset: usize,
        limit: usize,
    ) -> Result<Page, FetchError> {
        let mut url = self.endpoint(&format!("playlists/{playlist_id}/tracks"))?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string())
            .append_pair("additional_types", "track,episode")
            .append_pair(
                "fields",
                "items(track(id,is_local,type,linked_from(id))),total,next",
            );

        let paging: Paging<SpotifyTrackItem> = self.get_json(url).await?;
        Ok(paging.into())
    }

    async fn remove_from_library(&self, tracks: &[TrackId]) -> Result<(), RemoteError> {
        let ids: Vec<&str> = tracks.iter().map(TrackId::as_str).collect();
        let url = self.endpoint("me/tracks")?;
        self.send(self.http.delete(url).json(&json!({ "ids": ids })))
            .await?;
        Ok(())
    }

    async fn add_to_library(&self, tracks: &[TrackId]) -> Result<(), RemoteError> {
        let ids: Vec<&str> = tracks.iter().map(TrackId::as_str).collect();
        let url = self.endpoint("me/tracks")?;
        self.send(self.http.put(url).json(&json!({ "ids": ids })))
            .await?;
        Ok(())
    }

    async fn replace_playlist_items(
        &self,
        playlist_id: &PlaylistId,
        tracks: &[TrackId],
    ) -> Result<(), RemoteError> {
        let uris: Vec<String> = tracks.iter().map(TrackId::uri).collect();
        let url = self.endpoint(&format!("playlists/{playlist_id}/tracks"))?;
        self.send(self.http.put(url).json(&json!({ "uris": uris })))
            .await?;
        Ok(())
    }

    async fn append_playlist_items(
        &self,
        playlist_id: &PlaylistId,
        tracks: &[TrackId],
    ) -> Result<(), RemoteError> {
        let uris: Vec<String> = tracks.iter().map(TrackId::uri).collect();
        let url = self.endpoint(&format!("playlists/{playlist_id}/tracks"))?;
        self.send(self.http.post(url).json(&json!({ "uris": uris })))
            .await?;
        Ok(())
    }
}
