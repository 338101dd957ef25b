use super::cache::CatalogCache;
use super::{EntityKind, ResolvedEntity};
use crate::error::CatalogError;
use crate::youtube_api::playlist_items::PlaylistItem;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Where random draws come from.
///
/// Neither source is cryptographically secure, and draws must never be used for anything
/// security sensitive.
#[derive(Debug)]
pub enum RandomSource {
    /// A generator freshly seeded from the wall clock for every draw.
    Clock,
    /// A deterministic stream of draws.
    Seeded(Mutex<StdRng>),
}

impl RandomSource {
    pub fn seeded(seed: u64) -> Self {
        RandomSource::Seeded(Mutex::new(StdRng::seed_from_u64(seed)))
    }

    /// A uniform draw from `0..bound`. `bound` must be non-zero.
    pub fn below(&self, bound: u64) -> u64 {
        match self {
            RandomSource::Clock => {
                let nanos = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_nanos() as u64)
                    .unwrap_or_default();
                StdRng::seed_from_u64(nanos).random_range(0..bound)
            }
            RandomSource::Seeded(rng) => rng
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .random_range(0..bound),
        }
    }
}

/// Uniform random draws over cached sequences.
#[derive(Debug)]
pub struct Sampler {
    cache: Arc<CatalogCache>,
    random: RandomSource,
}

impl Sampler {
    pub fn new(cache: Arc<CatalogCache>, random: RandomSource) -> Self {
        Self { cache, random }
    }

    /// A uniformly chosen entity of `kind`.
    pub fn random_entity(&self, kind: EntityKind) -> Result<ResolvedEntity, CatalogError> {
        let entities = self.cache.get(kind);
        if entities.is_empty() {
            return Err(CatalogError::EmptyCollection { kind });
        }
        let at = self.random.below(entities.len() as u64) as usize;
        Ok(entities[at].clone())
    }

    /// A uniformly chosen playlist, then a uniformly chosen item of it.
    ///
    /// The item index is drawn against the playlist's cached item count. When that count is
    /// stale and larger than the live playlist, the draw fails with
    /// [`CatalogError::ExhaustedPagination`] rather than silently picking another item. A
    /// playlist cached without a count is paged through to its end to count its items.
    pub async fn random_nested_item(&self) -> Result<PlaylistItem, CatalogError> {
        let (playlists, pages) = self.cache.playlists_and_pages();
        if playlists.is_empty() {
            return Err(CatalogError::EmptyCollection {
                kind: EntityKind::Playlist,
            });
        }
        let picked = &playlists[self.random.below(playlists.len() as u64) as usize];
        let Some(playlist) = picked.as_playlist() else {
            return Err(CatalogError::EmptyCollection {
                kind: EntityKind::Playlist,
            });
        };
        let first_page = pages
            .iter()
            .filter_map(ResolvedEntity::as_item_page)
            .find(|page| page.playlist_id == playlist.id);

        let count = match (playlist.item_count(), first_page) {
            (Some(count), _) => count,
            (None, Some(first)) if first.page.is_last() => first.page.end(),
            (None, _) => {
                let last = self.cache.client().fetch_final_page(&playlist.id).await?;
                tracing::debug!(playlist = %playlist.id, count = last.end(), "counted items");
                last.end()
            }
        };
        if count == 0 {
            return Err(CatalogError::EmptyResult {
                kind: EntityKind::Playlist,
                id: playlist.id.clone(),
            });
        }
        let target = self.random.below(count);
        tracing::debug!(playlist = %playlist.id, target, count, "drawing nested item");

        if let Some(item) = first_page.and_then(|page| page.page.item_at(target)) {
            return Ok(item.clone());
        }

        let page = self
            .cache
            .client()
            .fetch_page_at(&playlist.id, target)
            .await?;
        page.item_at(target)
            .cloned()
            .ok_or_else(|| CatalogError::ExhaustedPagination {
                parent_id: playlist.id.clone(),
                target,
                consumed: page.end(),
            })
    }
}
