//! Read-only access to the YouTube Data API v3 list endpoints.

use crate::auth::Credentials;
use crate::catalog::{RemoteCatalog, ResolvedEntity, Resource};
use crate::error::CatalogError;
use crate::youtube_api::{
    channels::Channel,
    playlist_items::PlaylistItem,
    playlists::Playlist,
    types::{ListResponse, MAX_PAGE_SIZE},
    videos::Video,
};
use async_trait::async_trait;
use http::Method;
use serde::de::DeserializeOwned;
use tracing::instrument;

/// Every lookup asks for the same parts, which is all the catalog ever reads.
const PARTS: &str = "snippet,contentDetails";

/// Client for the YouTube Data API v3.
///
/// Requests are authorized with either an API key or an OAuth token, see [`Credentials`].
/// Any transport failure or non-success status becomes [`CatalogError::RemoteUnavailable`].
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    credentials: Credentials,
    client: reqwest::Client,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(credentials: Credentials, client: reqwest::Client) -> Self {
        Self {
            credentials,
            client,
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
        }
    }

    /// Points the client at another host, such as a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Makes an authorized request to a YouTube API resource with common error handling.
    ///
    /// Returns the raw [`reqwest::Response`] for resource-specific parsing.
    #[instrument(skip(self), level = tracing::Level::TRACE)]
    pub(crate) async fn make_authenticated_request(
        &self,
        method: Method,
        resource: &str,
        query_params: &[(&str, &str)],
    ) -> Result<reqwest::Response, CatalogError> {
        let url = format!("{}/{}", self.base_url, resource);
        let endpoint = format!("youtube.{resource}");

        let request = self
            .client
            .request(method.clone(), &url)
            .query(query_params);
        let response = self
            .credentials
            .authorize(request, &endpoint)
            .await?
            .send()
            .await
            .map_err(|e| CatalogError::remote(&endpoint, format!("send {method} {url}: {e}")))?;

        let status_code = response.status();
        if !status_code.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(CatalogError::remote(
                &endpoint,
                format!("status {status_code}: {error_text}"),
            ));
        }

        Ok(response)
    }

    async fn list<T: DeserializeOwned>(
        &self,
        resource: &str,
        query_params: &[(&str, &str)],
    ) -> Result<ListResponse<T>, CatalogError> {
        self.make_authenticated_request(Method::GET, resource, query_params)
            .await?
            .json()
            .await
            .map_err(|e| {
                CatalogError::remote(&format!("youtube.{resource}"), format!("parse response: {e}"))
            })
    }

    /// Looks up a video by id.
    ///
    /// See: <https://developers.google.com/youtube/v3/docs/videos/list>
    #[instrument(skip(self))]
    pub async fn list_videos(&self, id: &str) -> Result<ListResponse<Video>, CatalogError> {
        self.list("videos", &[("part", PARTS), ("id", id)]).await
    }

    /// Looks up a playlist by id.
    ///
    /// See: <https://developers.google.com/youtube/v3/docs/playlists/list>
    #[instrument(skip(self))]
    pub async fn list_playlists(&self, id: &str) -> Result<ListResponse<Playlist>, CatalogError> {
        self.list("playlists", &[("part", PARTS), ("id", id)]).await
    }

    /// Looks up a channel by id.
    ///
    /// See: <https://developers.google.com/youtube/v3/docs/channels/list>
    #[instrument(skip(self))]
    pub async fn list_channels(&self, id: &str) -> Result<ListResponse<Channel>, CatalogError> {
        self.list("channels", &[("part", PARTS), ("id", id)]).await
    }

    /// Looks up a channel by its legacy username.
    #[instrument(skip(self))]
    pub async fn list_channels_for_username(
        &self,
        username: &str,
    ) -> Result<ListResponse<Channel>, CatalogError> {
        self.list("channels", &[("part", PARTS), ("forUsername", username)])
            .await
    }

    /// Fetches one page of a playlist's items.
    ///
    /// See: <https://developers.google.com/youtube/v3/docs/playlistItems/list>
    #[instrument(skip(self))]
    pub async fn list_playlist_items(
        &self,
        playlist_id: &str,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<ListResponse<PlaylistItem>, CatalogError> {
        let max_results = max_results.clamp(1, MAX_PAGE_SIZE).to_string();
        let mut query_params = vec![
            ("part", PARTS),
            ("playlistId", playlist_id),
            ("maxResults", max_results.as_str()),
        ];
        if let Some(token) = page_token {
            query_params.push(("pageToken", token));
        }
        self.list("playlistItems", &query_params).await
    }
}

#[async_trait]
impl RemoteCatalog for YouTubeClient {
    async fn list_by_id(
        &self,
        resource: Resource,
        id: &str,
    ) -> Result<Vec<ResolvedEntity>, CatalogError> {
        let found: Vec<ResolvedEntity> = match resource {
            Resource::Channel => self
                .list_channels(id)
                .await?
                .items
                .into_iter()
                .map(ResolvedEntity::Channel)
                .collect(),
            Resource::Playlist => self
                .list_playlists(id)
                .await?
                .items
                .into_iter()
                .map(ResolvedEntity::Playlist)
                .collect(),
            Resource::Video => self
                .list_videos(id)
                .await?
                .items
                .into_iter()
                .map(ResolvedEntity::Video)
                .collect(),
        };
        tracing::debug!(?resource, id, found = found.len(), "listed by id");
        Ok(found)
    }

    async fn list_by_username(
        &self,
        username: &str,
    ) -> Result<Vec<ResolvedEntity>, CatalogError> {
        Ok(self
            .list_channels_for_username(username)
            .await?
            .items
            .into_iter()
            .map(ResolvedEntity::Channel)
            .collect())
    }

    async fn list_page(
        &self,
        playlist_id: &str,
        page_size: u32,
        page_token: Option<String>,
    ) -> Result<ListResponse<PlaylistItem>, CatalogError> {
        self.list_playlist_items(playlist_id, page_size, page_token.as_deref())
            .await
    }
}
