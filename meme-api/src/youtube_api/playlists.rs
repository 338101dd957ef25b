//! YouTube Playlists API types.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A `playlist` resource represents a YouTube playlist.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlists#resource>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub snippet: PlaylistSnippet,
    #[serde(rename = "contentDetails")]
    pub content_details: PlaylistContentDetails,
}

impl Playlist {
    /// Number of videos the API reports for the playlist, if it reported one.
    ///
    /// This is playlist metadata, not a count of fetched items, and may lag behind the
    /// playlist's live contents.
    pub fn item_count(&self) -> Option<u64> {
        self.content_details.item_count
    }
}

/// See: <https://developers.google.com/youtube/v3/docs/playlists#snippet>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistSnippet {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "channelId", default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(rename = "channelTitle", default, skip_serializing_if = "Option::is_none")]
    pub channel_title: Option<String>,
    /// The date and time that the playlist was created.
    #[serde(rename = "publishedAt")]
    pub published_at: Timestamp,
}

/// See: <https://developers.google.com/youtube/v3/docs/playlists#contentDetails>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistContentDetails {
    /// The number of videos in the playlist.
    #[serde(rename = "itemCount", default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<u64>,
}
