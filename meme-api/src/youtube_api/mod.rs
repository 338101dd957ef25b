//! YouTube Data API v3 client library.
//!
//! Only the read-only list endpoints the catalog needs are covered: videos, playlists, channels
//! and the items of a playlist. Every resource is requested with the `snippet` and
//! `contentDetails` parts.
//!
//! # Pagination
//!
//! `playlistItems.list` returns at most [`types::MAX_PAGE_SIZE`] items per call, plus an opaque
//! continuation token for the next page. [`types::PagedStream`] turns those calls into a lazy
//! stream of positioned [`types::Page`]s, and [`types::settle`] walks such a stream until a
//! [`types::StopAt`] policy is met.

pub mod channels;
pub mod client;
pub mod playlist_items;
pub mod playlists;
pub mod types;
pub mod videos;

pub use channels::Channel;
pub use client::YouTubeClient;
pub use playlist_items::PlaylistItem;
pub use playlists::Playlist;
pub use types::{ListResponse, Page, PagedStream, StopAt};
pub use videos::Video;
