//! Command-line and environment configuration.

use crate::sheets::{DEFAULT_SHEET_ID, SheetRanges};
use clap::Parser;
use eyre::Context;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Serve random YouTube memes from playlists, channels and videos listed in a spreadsheet.
#[derive(Parser, Debug)]
#[command(name = "youtube-meme-api")]
#[command(author, version, about)]
pub struct Args {
    /// Port to listen on, or a full socket address such as 127.0.0.1:8000
    #[arg(long, env = "PORT", default_value = "8000")]
    pub port: String,

    /// API key used for both the YouTube and the Sheets API
    #[arg(
        long,
        env = "YOUTUBE_API_KEY",
        hide_env_values = true,
        conflicts_with = "secret_file",
        required_unless_present = "secret_file"
    )]
    pub key: Option<String>,

    /// Google OAuth client-secret file; the user token is cached in token.json next to it
    #[arg(long, env = "GOOGLE_CLIENT_SECRET_FILE")]
    pub secret_file: Option<PathBuf>,

    /// Id of the spreadsheet listing the catalog
    #[arg(long, env = "SHEET_ID", default_value = DEFAULT_SHEET_ID)]
    pub sheet_id: String,

    /// Range holding video URLs
    #[arg(long, default_value = "Sheet1!A2:A1000")]
    pub video_range: String,

    /// Range holding playlist URLs
    #[arg(long, default_value = "Sheet1!C2:C1000")]
    pub playlist_range: String,

    /// Range holding channel URLs
    #[arg(long, default_value = "Sheet1!E2:E1000")]
    pub channel_range: String,

    /// Directory for the on-disk copy of the catalog
    #[arg(long, env = "CATALOG_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Fetch everything from YouTube at startup even if an on-disk copy exists
    #[arg(long)]
    pub refresh: bool,

    /// Items requested per playlist page (1-50)
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..=50))]
    pub page_size: u32,

    /// Entities fetched concurrently while populating (1-64)
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..=64))]
    pub fetch_concurrency: u16,
}

impl Args {
    /// The address to bind: a bare port listens on every interface.
    pub fn listen_addr(&self) -> eyre::Result<SocketAddr> {
        let addr = if self.port.contains(':') {
            self.port.clone()
        } else {
            format!("0.0.0.0:{}", self.port)
        };
        addr.parse()
            .with_context(|| format!("parse listen address '{addr}'"))
    }

    pub fn ranges(&self) -> SheetRanges {
        SheetRanges {
            video: self.video_range.clone(),
            playlist: self.playlist_range.clone(),
            channel: self.channel_range.clone(),
        }
    }
}
