use crate::auth::Credentials;
use crate::catalog::{CatalogCache, CatalogClient, DiskMirror, RandomSource};
use crate::config::Args;
use crate::server::AppState;
use crate::sheets::SheetsClient;
use crate::youtube_api::YouTubeClient;
use eyre::Context;
use std::sync::Arc;

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
mod oauth;
pub mod server;
pub mod sheets;
pub mod youtube_api;

#[cfg(test)]
mod testing;

pub use error::CatalogError;

/// Wires credentials, the Google API clients and the catalog together as configured by `args`.
///
/// With a secret file this may send the user through the browser consent flow. Nothing is
/// fetched from the catalog yet; see [`catalog::UpdateCoordinator::load_all`].
pub async fn setup(args: &Args) -> eyre::Result<AppState> {
    let credentials = match (&args.key, &args.secret_file) {
        (Some(key), _) => Credentials::api_key(key.clone()),
        (None, Some(secret_file)) => Credentials::from_secret_file(secret_file)
            .await
            .context("set up OAuth credentials")?,
        (None, None) => eyre::bail!("either an API key or a client-secret file is required"),
    };

    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("build HTTP client")?;

    let youtube = YouTubeClient::new(credentials.clone(), http.clone());
    let sheets = SheetsClient::new(credentials, http, &args.sheet_id, args.ranges())
        .context("set up Sheets client")?;

    let mirror = args.cache_dir.as_ref().map(|dir| {
        tracing::info!(dir = %dir.display(), "mirroring catalog to disk");
        DiskMirror::new(dir)
    });
    let cache = Arc::new(CatalogCache::new(
        CatalogClient::new(Arc::new(youtube), args.page_size),
        mirror,
        usize::from(args.fetch_concurrency),
    ));

    Ok(AppState::new(cache, Arc::new(sheets), RandomSource::Clock))
}
