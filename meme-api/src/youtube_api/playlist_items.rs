//! YouTube PlaylistItems API types.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A `playlistItem` resource identifies a video included in a playlist.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlistItems#resource>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub id: String,
    pub snippet: PlaylistItemSnippet,
    #[serde(rename = "contentDetails")]
    pub content_details: PlaylistItemContentDetails,
}

impl PlaylistItem {
    pub fn video_id(&self) -> &str {
        &self.content_details.video_id
    }
}

/// See: <https://developers.google.com/youtube/v3/docs/playlistItems#snippet>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistItemSnippet {
    pub title: String,
    /// When the item was added to the playlist.
    #[serde(rename = "publishedAt")]
    pub published_at: Timestamp,
    /// Zero-based position of the item within the playlist.
    #[serde(default)]
    pub position: u64,
    #[serde(rename = "playlistId")]
    pub playlist_id: String,
    #[serde(
        rename = "videoOwnerChannelTitle",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub video_owner_channel_title: Option<String>,
}

/// See: <https://developers.google.com/youtube/v3/docs/playlistItems#contentDetails>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistItemContentDetails {
    #[serde(rename = "videoId")]
    pub video_id: String,
    /// Absent for private or deleted videos.
    #[serde(
        rename = "videoPublishedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub video_published_at: Option<Timestamp>,
}
