//! In-memory stand-ins for YouTube and the configuration sheet, plus resource builders.

use crate::catalog::{RemoteCatalog, ResolvedEntity, Resource};
use crate::error::CatalogError;
use crate::sheets::{Category, ConfigRows, ConfigSource};
use crate::youtube_api::channels::{
    Channel, ChannelContentDetails, ChannelSnippet, RelatedPlaylists,
};
use crate::youtube_api::playlist_items::{
    PlaylistItem, PlaylistItemContentDetails, PlaylistItemSnippet,
};
use crate::youtube_api::playlists::{Playlist, PlaylistContentDetails, PlaylistSnippet};
use crate::youtube_api::types::{ListResponse, PageInfo};
use crate::youtube_api::videos::{Video, VideoContentDetails, VideoSnippet};
use async_trait::async_trait;
use jiff::Timestamp;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

fn published_at() -> Timestamp {
    "2020-01-01T00:00:00Z".parse().unwrap()
}

pub(crate) fn playlist(id: &str, item_count: u64) -> Playlist {
    Playlist {
        id: id.to_string(),
        snippet: PlaylistSnippet {
            title: format!("playlist {id}"),
            description: None,
            channel_id: None,
            channel_title: None,
            published_at: published_at(),
        },
        content_details: PlaylistContentDetails {
            item_count: Some(item_count),
        },
    }
}

pub(crate) fn video(id: &str) -> Video {
    Video {
        id: id.to_string(),
        snippet: VideoSnippet {
            title: format!("video {id}"),
            description: None,
            channel_id: None,
            channel_title: None,
            published_at: published_at(),
        },
        content_details: VideoContentDetails {
            duration: "PT1M".to_string(),
        },
    }
}

pub(crate) fn channel(id: &str, uploads: &str) -> Channel {
    Channel {
        id: id.to_string(),
        snippet: ChannelSnippet {
            title: format!("channel {id}"),
            description: None,
            custom_url: None,
            published_at: published_at(),
        },
        content_details: ChannelContentDetails {
            related_playlists: RelatedPlaylists {
                uploads: uploads.to_string(),
                likes: None,
            },
        },
    }
}

pub(crate) fn item(playlist_id: &str, position: u64) -> PlaylistItem {
    PlaylistItem {
        id: format!("{playlist_id}-{position}"),
        snippet: PlaylistItemSnippet {
            title: format!("item {position} of {playlist_id}"),
            published_at: published_at(),
            position,
            playlist_id: playlist_id.to_string(),
            video_owner_channel_title: None,
        },
        content_details: PlaylistItemContentDetails {
            video_id: format!("{playlist_id}v{position}"),
            video_published_at: None,
        },
    }
}

/// A [`RemoteCatalog`] over fixed resources that counts every call made to it.
///
/// Continuation tokens are the decimal offset of the next page.
#[derive(Debug, Default)]
pub(crate) struct FakeCatalog {
    channels: HashMap<String, Channel>,
    usernames: HashMap<String, Channel>,
    playlists: HashMap<String, Playlist>,
    /// How many items each playlist really has, which may differ from its reported count.
    item_counts: HashMap<String, u64>,
    videos: HashMap<String, Video>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl FakeCatalog {
    pub(crate) fn add_channel(&mut self, channel: Channel) {
        self.channels.insert(channel.id.clone(), channel);
    }

    pub(crate) fn add_channel_for_username(&mut self, username: &str, channel: Channel) {
        self.usernames.insert(username.to_string(), channel);
    }

    pub(crate) fn add_playlist(&mut self, playlist: Playlist, actual_items: u64) {
        self.item_counts.insert(playlist.id.clone(), actual_items);
        self.playlists.insert(playlist.id.clone(), playlist);
    }

    pub(crate) fn add_video(&mut self, video: Video) {
        self.videos.insert(video.id.clone(), video);
    }

    /// Every call involving `id` fails as if the API were down.
    pub(crate) fn fail_on(&mut self, id: &str) {
        self.failing.insert(id.to_string());
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn call(&self, id: &str) -> Result<(), CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(id) {
            return Err(CatalogError::remote("fake", format!("{id} is unavailable")));
        }
        Ok(())
    }

    fn page(&self, playlist_id: &str, page_size: u32, offset: u64) -> ListResponse<PlaylistItem> {
        let total = self.item_counts.get(playlist_id).copied().unwrap_or(0);
        let end = (offset + u64::from(page_size)).min(total);
        ListResponse {
            kind: "youtube#playlistItemListResponse".to_string(),
            items: (offset..end).map(|pos| item(playlist_id, pos)).collect(),
            page_info: PageInfo {
                total_results: total as u32,
                results_per_page: page_size,
            },
            next_page_token: (end < total).then(|| end.to_string()),
        }
    }
}

#[async_trait]
impl RemoteCatalog for FakeCatalog {
    async fn list_by_id(
        &self,
        resource: Resource,
        id: &str,
    ) -> Result<Vec<ResolvedEntity>, CatalogError> {
        self.call(id)?;
        let found = match resource {
            Resource::Channel => self.channels.get(id).cloned().map(ResolvedEntity::Channel),
            Resource::Playlist => self.playlists.get(id).cloned().map(ResolvedEntity::Playlist),
            Resource::Video => self.videos.get(id).cloned().map(ResolvedEntity::Video),
        };
        Ok(found.into_iter().collect())
    }

    async fn list_by_username(
        &self,
        username: &str,
    ) -> Result<Vec<ResolvedEntity>, CatalogError> {
        self.call(username)?;
        Ok(self
            .usernames
            .get(username)
            .cloned()
            .map(ResolvedEntity::Channel)
            .into_iter()
            .collect())
    }

    async fn list_page(
        &self,
        playlist_id: &str,
        page_size: u32,
        page_token: Option<String>,
    ) -> Result<ListResponse<PlaylistItem>, CatalogError> {
        self.call(playlist_id)?;
        let offset = page_token.map_or(0, |token| token.parse().unwrap());
        Ok(self.page(playlist_id, page_size, offset))
    }
}

/// A [`ConfigSource`] whose rows tests set directly. Unset categories have no rows.
#[derive(Debug, Default)]
pub(crate) struct FakeSource {
    rows: Mutex<HashMap<Category, Vec<String>>>,
    reads: AtomicUsize,
}

impl FakeSource {
    pub(crate) fn set_rows(&self, category: Category, urls: Vec<String>) {
        self.rows.lock().unwrap().insert(category, urls);
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigSource for FakeSource {
    async fn get_range(&self, category: Category) -> Result<ConfigRows, CatalogError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let urls = self
            .rows
            .lock()
            .unwrap()
            .get(&category)
            .cloned()
            .unwrap_or_default();
        Ok(ConfigRows::new(urls))
    }
}
