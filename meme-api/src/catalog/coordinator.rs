use super::cache::CatalogCache;
use crate::error::CatalogError;
use crate::sheets::{Category, ConfigRows, ConfigSource};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::instrument;

/// What a refresh of one category did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshOutcome {
    pub kind: Category,
    /// Whether the cache was repopulated.
    pub changed: bool,
    /// Number of configuration rows the category now has.
    pub count: usize,
}

/// Row counts as of the last successful population of each category.
#[derive(Debug, Default)]
struct Counts {
    channel: Mutex<Option<usize>>,
    playlist: Mutex<Option<usize>>,
    video: Mutex<Option<usize>>,
}

impl Counts {
    fn get(&self, category: Category) -> &Mutex<Option<usize>> {
        match category {
            Category::Channel => &self.channel,
            Category::Playlist => &self.playlist,
            Category::Video => &self.video,
        }
    }
}

/// Keeps the cache in step with the configuration source.
///
/// A category is only repopulated when its row count differs from the one recorded at its last
/// successful population. Edits that keep the count the same are therefore not picked up by
/// [`UpdateCoordinator::refresh`]; [`UpdateCoordinator::reload`] repopulates unconditionally.
pub struct UpdateCoordinator {
    source: Arc<dyn ConfigSource>,
    cache: Arc<CatalogCache>,
    counts: Counts,
}

impl std::fmt::Debug for UpdateCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateCoordinator")
            .field("counts", &self.counts)
            .finish_non_exhaustive()
    }
}

impl UpdateCoordinator {
    pub fn new(source: Arc<dyn ConfigSource>, cache: Arc<CatalogCache>) -> Self {
        Self {
            source,
            cache,
            counts: Counts::default(),
        }
    }

    /// Re-reads the rows of `category` and repopulates it if the row count changed.
    ///
    /// Refreshes of the same category are serialized. The new count is recorded only once the
    /// population succeeded, so a failed refresh is retried in full next time.
    #[instrument(skip(self))]
    pub async fn refresh(&self, category: Category) -> Result<RefreshOutcome, CatalogError> {
        let mut recorded = self.counts.get(category).lock().await;
        let rows = self.source.get_range(category).await?;
        let count = rows.len();

        if *recorded == Some(count) {
            tracing::debug!(%category, count, "row count unchanged, nothing to refresh");
            return Ok(RefreshOutcome {
                kind: category,
                changed: false,
                count,
            });
        }

        let previous = *recorded;
        tracing::info!(%category, ?previous, count, "row count changed, repopulating");
        self.populate(category, &rows, true).await?;
        *recorded = Some(count);
        Ok(RefreshOutcome {
            kind: category,
            changed: true,
            count,
        })
    }

    /// Refreshes every category, channels first, stopping at the first failure.
    pub async fn refresh_all(&self) -> Result<Vec<RefreshOutcome>, CatalogError> {
        let mut outcomes = Vec::with_capacity(Category::ALL.len());
        for category in Category::ALL {
            outcomes.push(self.refresh(category).await?);
        }
        Ok(outcomes)
    }

    /// Re-reads and repopulates `category` whether or not its row count changed.
    #[instrument(skip(self))]
    pub async fn reload(
        &self,
        category: Category,
        force: bool,
    ) -> Result<RefreshOutcome, CatalogError> {
        let mut recorded = self.counts.get(category).lock().await;
        let rows = self.source.get_range(category).await?;
        self.populate(category, &rows, force).await?;
        *recorded = Some(rows.len());
        Ok(RefreshOutcome {
            kind: category,
            changed: true,
            count: rows.len(),
        })
    }

    /// Populates every category at startup, channels first.
    ///
    /// Without `force`, categories whose disk mirror matches the current rows are loaded from
    /// disk.
    pub async fn load_all(&self, force: bool) -> Result<Vec<RefreshOutcome>, CatalogError> {
        let mut outcomes = Vec::with_capacity(Category::ALL.len());
        for category in Category::ALL {
            outcomes.push(self.reload(category, force).await?);
        }
        Ok(outcomes)
    }

    /// Empties the cache and forgets every recorded count, so the next refresh repopulates.
    pub async fn reset(&self) {
        for category in Category::ALL {
            let mut recorded = self.counts.get(category).lock().await;
            *recorded = None;
        }
        self.cache.invalidate_all().await;
    }

    async fn populate(
        &self,
        category: Category,
        rows: &ConfigRows,
        force: bool,
    ) -> Result<(), CatalogError> {
        let source = self.cache.populate(category.kind(), rows, force).await?;
        tracing::info!(%category, rows = rows.len(), ?source, "populated");
        Ok(())
    }
}
