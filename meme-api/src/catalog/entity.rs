use crate::youtube_api::channels::Channel;
use crate::youtube_api::playlist_items::PlaylistItem;
use crate::youtube_api::playlists::Playlist;
use crate::youtube_api::types::Page;
use crate::youtube_api::videos::Video;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kinds of entity the catalog caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Channel,
    Playlist,
    PlaylistItemPage,
    Video,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Channel,
        EntityKind::Playlist,
        EntityKind::PlaylistItemPage,
        EntityKind::Video,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Channel => "channel",
            EntityKind::Playlist => "playlist",
            EntityKind::PlaylistItemPage => "playlist_item_page",
            EntityKind::Video => "video",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The first page of a playlist's items, as cached for every known playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPage {
    pub playlist_id: String,
    #[serde(flatten)]
    pub page: Page<PlaylistItem>,
}

/// A fully fetched catalog entity.
///
/// Serializes as the YouTube resource itself with an extra `entity` discriminator, which is
/// also what makes the disk mirror readable back into the right variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum ResolvedEntity {
    Channel(Channel),
    Playlist(Playlist),
    PlaylistItemPage(ItemPage),
    Video(Video),
}

impl ResolvedEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            ResolvedEntity::Channel(_) => EntityKind::Channel,
            ResolvedEntity::Playlist(_) => EntityKind::Playlist,
            ResolvedEntity::PlaylistItemPage(_) => EntityKind::PlaylistItemPage,
            ResolvedEntity::Video(_) => EntityKind::Video,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ResolvedEntity::Channel(channel) => &channel.id,
            ResolvedEntity::Playlist(playlist) => &playlist.id,
            ResolvedEntity::PlaylistItemPage(page) => &page.playlist_id,
            ResolvedEntity::Video(video) => &video.id,
        }
    }

    pub fn as_channel(&self) -> Option<&Channel> {
        match self {
            ResolvedEntity::Channel(channel) => Some(channel),
            _ => None,
        }
    }

    pub fn as_playlist(&self) -> Option<&Playlist> {
        match self {
            ResolvedEntity::Playlist(playlist) => Some(playlist),
            _ => None,
        }
    }

    pub fn as_item_page(&self) -> Option<&ItemPage> {
        match self {
            ResolvedEntity::PlaylistItemPage(page) => Some(page),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn entities_round_trip_through_their_tag() {
        let entities = vec![
            ResolvedEntity::Playlist(testing::playlist("PL1", 3)),
            ResolvedEntity::Video(testing::video("v1")),
            ResolvedEntity::Channel(testing::channel("UC1", "UU1")),
            ResolvedEntity::PlaylistItemPage(ItemPage {
                playlist_id: "PL1".to_string(),
                page: Page {
                    start: 0,
                    total_results: 3,
                    next_page_token: Some("t".to_string()),
                    items: vec![testing::item("PL1", 0)],
                },
            }),
        ];
        let json = serde_json::to_string(&entities).unwrap();
        let back: Vec<ResolvedEntity> = serde_json::from_str(&json).unwrap();
        pretty_assertions::assert_eq!(back, entities);
    }

    #[test]
    fn playlists_serialize_as_youtube_resources() {
        let json = serde_json::to_value(ResolvedEntity::Playlist(testing::playlist("PL1", 3)))
            .unwrap();
        assert_eq!(json["entity"], "playlist");
        assert_eq!(json["id"], "PL1");
        assert_eq!(json["contentDetails"]["itemCount"], 3);
        assert_eq!(json["snippet"]["publishedAt"], "2020-01-01T00:00:00Z");
    }
}
