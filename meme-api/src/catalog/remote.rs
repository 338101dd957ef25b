use super::{EntityKind, ItemPage, ResolvedEntity};
use crate::error::CatalogError;
use crate::youtube_api::playlist_items::PlaylistItem;
use crate::youtube_api::types::{ListResponse, MAX_PAGE_SIZE, Page, PagedStream, StopAt, settle};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_stream::{Stream, StreamExt};
use tracing::instrument;

/// The resources [`RemoteCatalog::list_by_id`] can look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Channel,
    Playlist,
    Video,
}

/// The listing calls the catalog needs from the remote metadata API.
///
/// Implemented by [`crate::youtube_api::client::YouTubeClient`]; anything else implementing it
/// (such as an in-memory fake) can stand in for YouTube.
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    /// Looks up a resource by id. An unknown id yields an empty list, not an error.
    async fn list_by_id(
        &self,
        resource: Resource,
        id: &str,
    ) -> Result<Vec<ResolvedEntity>, CatalogError>;

    /// Looks up channels by legacy username.
    async fn list_by_username(&self, username: &str)
    -> Result<Vec<ResolvedEntity>, CatalogError>;

    /// Fetches one page of a playlist's items.
    async fn list_page(
        &self,
        playlist_id: &str,
        page_size: u32,
        page_token: Option<String>,
    ) -> Result<ListResponse<PlaylistItem>, CatalogError>;
}

/// Entity lookups and playlist pagination on top of a [`RemoteCatalog`].
///
/// Never touches the cache.
#[derive(Clone)]
pub struct CatalogClient {
    remote: Arc<dyn RemoteCatalog>,
    page_size: u32,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    /// `page_size` is clamped to what the API accepts.
    pub fn new(remote: Arc<dyn RemoteCatalog>, page_size: u32) -> Self {
        Self {
            remote,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Fetches the entity of `kind` identified by `id`.
    ///
    /// Channels are looked up by id first and by username second, since `/user/` URLs carry a
    /// username rather than an id. For [`EntityKind::PlaylistItemPage`], `id` is a playlist id
    /// and the result is its first page of items.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_entity(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<ResolvedEntity, CatalogError> {
        match kind {
            EntityKind::Channel => {
                let found = self.remote.list_by_id(Resource::Channel, id).await?;
                if let Some(channel) = found.into_iter().next() {
                    return Ok(channel);
                }
                tracing::debug!(id, "no channel with that id, trying as username");
                self.remote
                    .list_by_username(id)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| CatalogError::NotFound {
                        kind,
                        id: id.to_string(),
                    })
            }
            EntityKind::Playlist => self
                .remote
                .list_by_id(Resource::Playlist, id)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| CatalogError::EmptyResult {
                    kind,
                    id: id.to_string(),
                }),
            EntityKind::Video => self
                .remote
                .list_by_id(Resource::Video, id)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| CatalogError::NotFound {
                    kind,
                    id: id.to_string(),
                }),
            EntityKind::PlaylistItemPage => {
                let page = self.fetch_page(id).await?;
                Ok(ResolvedEntity::PlaylistItemPage(ItemPage {
                    playlist_id: id.to_string(),
                    page,
                }))
            }
        }
    }

    /// A lazy stream over the pages of a playlist's items, starting from the first page.
    pub fn pages<'a>(
        &'a self,
        playlist_id: &'a str,
    ) -> impl Stream<Item = Result<Page<PlaylistItem>, CatalogError>> + use<'a> {
        let remote = &*self.remote;
        let page_size = self.page_size;
        PagedStream::new(move |page_token| remote.list_page(playlist_id, page_size, page_token))
    }

    /// The first page of a playlist's items.
    pub async fn fetch_page(&self, playlist_id: &str) -> Result<Page<PlaylistItem>, CatalogError> {
        let mut pages = std::pin::pin!(self.pages(playlist_id));
        match pages.next().await {
            Some(page) => page,
            None => Err(CatalogError::EmptyResult {
                kind: EntityKind::PlaylistItemPage,
                id: playlist_id.to_string(),
            }),
        }
    }

    /// The page of a playlist's items that holds the item at `target_index`.
    ///
    /// Pages are requested in order from the first one, and no page past the target is
    /// requested. Fails with [`CatalogError::ExhaustedPagination`] when the playlist ends first.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_page_at(
        &self,
        playlist_id: &str,
        target_index: u64,
    ) -> Result<Page<PlaylistItem>, CatalogError> {
        settle(self.pages(playlist_id), StopAt::Index(target_index), playlist_id).await
    }

    /// The last page of a playlist's items, following continuation tokens to the end.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_final_page(
        &self,
        playlist_id: &str,
    ) -> Result<Page<PlaylistItem>, CatalogError> {
        settle(self.pages(playlist_id), StopAt::Exhausted, playlist_id).await
    }
}
