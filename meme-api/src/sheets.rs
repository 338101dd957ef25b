//! The spreadsheet that lists which videos, playlists and channels make up the catalog.

use crate::auth::Credentials;
use crate::catalog::EntityKind;
use crate::error::CatalogError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::instrument;

/// The spreadsheet used when none is configured.
pub const DEFAULT_SHEET_ID: &str = "1MuvC8JpJte1wzAS0m9qR0rr2-gxzL8aaX6lvlKeAqvs";

/// A column of the configuration sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Channel,
    Playlist,
    Video,
}

impl Category {
    /// Refresh order: channels feed playlists, so they go first.
    pub const ALL: [Category; 3] = [Category::Channel, Category::Playlist, Category::Video];

    /// The entity kind that rows of this category resolve to.
    pub fn kind(self) -> EntityKind {
        match self {
            Category::Channel => EntityKind::Channel,
            Category::Playlist => EntityKind::Playlist,
            Category::Video => EntityKind::Video,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Channel => "channel",
            Category::Playlist => "playlist",
            Category::Video => "video",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The non-empty URLs of one category, in sheet order.
///
/// The count and the values always come from the same read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigRows {
    length: usize,
    values: Vec<String>,
}

impl ConfigRows {
    pub fn new(values: Vec<String>) -> Self {
        Self {
            length: values.len(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// Supplies the configured URLs of each category.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn get_range(&self, category: Category) -> Result<ConfigRows, CatalogError>;
}

/// A1-notation ranges holding each category's URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRanges {
    pub video: String,
    pub playlist: String,
    pub channel: String,
}

impl Default for SheetRanges {
    fn default() -> Self {
        Self {
            video: "Sheet1!A2:A1000".to_string(),
            playlist: "Sheet1!C2:C1000".to_string(),
            channel: "Sheet1!E2:E1000".to_string(),
        }
    }
}

impl SheetRanges {
    fn get(&self, category: Category) -> &str {
        match category {
            Category::Channel => &self.channel,
            Category::Playlist => &self.playlist,
            Category::Video => &self.video,
        }
    }
}

/// See: <https://developers.google.com/sheets/api/reference/rest/v4/spreadsheets.values#ValueRange>
#[derive(Debug, Deserialize)]
struct ValueRange {
    /// Absent when the range holds no data at all.
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl ValueRange {
    /// Keeps the first cell of every row, skipping rows where it is empty or missing.
    fn into_rows(self) -> ConfigRows {
        let values = self
            .values
            .into_iter()
            .filter_map(|row| {
                let cell = match row.into_iter().next()? {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => return None,
                    other => other.to_string(),
                };
                let cell = cell.trim();
                (!cell.is_empty()).then(|| cell.to_string())
            })
            .collect();
        ConfigRows::new(values)
    }
}

/// Reads category ranges through the Google Sheets API v4.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    credentials: Credentials,
    client: reqwest::Client,
    base_url: reqwest::Url,
    sheet_id: String,
    ranges: SheetRanges,
}

impl SheetsClient {
    pub fn new(
        credentials: Credentials,
        client: reqwest::Client,
        sheet_id: impl Into<String>,
        ranges: SheetRanges,
    ) -> eyre::Result<Self> {
        Ok(Self {
            credentials,
            client,
            base_url: reqwest::Url::parse("https://sheets.googleapis.com/")?,
            sheet_id: sheet_id.into(),
            ranges,
        })
    }

    /// Points the client at another host, such as a mock server.
    pub fn with_base_url(mut self, base_url: reqwest::Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Fetches the raw values of an A1 range of the configured sheet.
    #[instrument(skip(self), level = "debug")]
    async fn values(&self, range: &str) -> Result<ValueRange, CatalogError> {
        const ENDPOINT: &str = "spreadsheets.values.get";

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| CatalogError::remote(ENDPOINT, "base url cannot hold a path"))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.sheet_id.as_str(), "values", range]);

        let request = self
            .credentials
            .authorize(self.client.get(url), ENDPOINT)
            .await?;
        let response = request
            .send()
            .await
            .map_err(|e| CatalogError::remote(ENDPOINT, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(CatalogError::remote(
                ENDPOINT,
                format!("status {status}: {body}"),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::remote(ENDPOINT, format!("parse response: {e}")))
    }
}

#[async_trait]
impl ConfigSource for SheetsClient {
    async fn get_range(&self, category: Category) -> Result<ConfigRows, CatalogError> {
        let range = self.ranges.get(category);
        let rows = self.values(range).await?.into_rows();
        tracing::info!(%category, range, rows = rows.len(), "read sheet rows");
        Ok(rows)
    }
}
