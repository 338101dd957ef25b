use super::mirror::{DiskMirror, MirrorFile};
use super::remote::CatalogClient;
use super::resolver::resolve_id;
use super::{EntityKind, ResolvedEntity};
use crate::error::CatalogError;
use crate::sheets::ConfigRows;
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::instrument;

/// Mirror slot for the playlists derived from channels' uploads.
const UPLOADS_SLOT: &str = "channel_uploads";

/// An immutable view of one kind's cached sequence.
pub type Snapshot = Arc<Vec<ResolvedEntity>>;

/// Where a populated sequence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Mirror,
    Network,
}

#[derive(Debug, Default)]
struct Stored {
    entities: Snapshot,
    /// How many trailing entities were derived from another kind rather than from rows.
    derived: usize,
}

/// One kind's storage.
///
/// Readers only ever clone the `Arc` under a short read lock, so they never wait on a fetch.
/// Writers hold `writer` from the start of a population until its swap, which orders
/// concurrent populations of the same kind.
#[derive(Debug, Default)]
struct Shelf {
    stored: RwLock<Stored>,
    writer: Mutex<()>,
}

impl Stored {
    fn new(entities: Vec<ResolvedEntity>, derived: usize) -> Self {
        Self {
            entities: Arc::new(entities),
            derived,
        }
    }
}

impl Shelf {
    fn stored(&self) -> (Snapshot, usize) {
        let stored = self.stored.read().unwrap_or_else(PoisonError::into_inner);
        (stored.entities.clone(), stored.derived)
    }

    fn swap(&self, entities: Vec<ResolvedEntity>, derived: usize) {
        let mut stored = self.stored.write().unwrap_or_else(PoisonError::into_inner);
        *stored = Stored::new(entities, derived);
    }
}

/// The process-wide store of resolved catalog entities, keyed by [`EntityKind`].
///
/// Each kind is either empty or holds the complete result of its last successful population:
/// a population that fails part way leaves the previous sequence in place.
///
/// The playlist sequence is made of two segments: playlists populated from configuration rows,
/// followed by the uploads playlists of cached channels. Populating either playlists or channels
/// replaces only its own segment. Whenever the playlist sequence changes, the item-page kind is
/// rebuilt to hold the first page of items of every cached playlist, in the same order.
///
/// Lock order is channel, playlist, item page; videos are independent.
#[derive(Debug)]
pub struct CatalogCache {
    client: CatalogClient,
    mirror: Option<DiskMirror>,
    concurrency: usize,
    channels: Shelf,
    playlists: Shelf,
    item_pages: Shelf,
    videos: Shelf,
}

impl CatalogCache {
    /// `concurrency` bounds how many entities of one population are fetched at once.
    pub fn new(client: CatalogClient, mirror: Option<DiskMirror>, concurrency: usize) -> Self {
        Self {
            client,
            mirror,
            concurrency: concurrency.max(1),
            channels: Shelf::default(),
            playlists: Shelf::default(),
            item_pages: Shelf::default(),
            videos: Shelf::default(),
        }
    }

    pub fn client(&self) -> &CatalogClient {
        &self.client
    }

    fn shelf(&self, kind: EntityKind) -> &Shelf {
        match kind {
            EntityKind::Channel => &self.channels,
            EntityKind::Playlist => &self.playlists,
            EntityKind::PlaylistItemPage => &self.item_pages,
            EntityKind::Video => &self.videos,
        }
    }

    /// The current sequence for `kind`; empty if it was never populated.
    pub fn get(&self, kind: EntityKind) -> Snapshot {
        self.shelf(kind).stored().0
    }

    /// The playlist and item-page sequences as committed together by one population.
    pub fn playlists_and_pages(&self) -> (Snapshot, Snapshot) {
        let playlists = self
            .playlists
            .stored
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let pages = self
            .item_pages
            .stored
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        (playlists.entities.clone(), pages.entities.clone())
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        self.get(kind).len()
    }

    /// Clears the sequence of `kind` only.
    ///
    /// Waits for any population of `kind` in flight to finish first.
    pub async fn invalidate(&self, kind: EntityKind) {
        let shelf = self.shelf(kind);
        let _writer = shelf.writer.lock().await;
        shelf.swap(Vec::new(), 0);
        tracing::info!(%kind, "invalidated cached entities");
    }

    pub async fn invalidate_all(&self) {
        for kind in EntityKind::ALL {
            self.invalidate(kind).await;
        }
    }

    /// Resolves and fetches one entity per row, then replaces the sequence of `kind`.
    ///
    /// Rows are resolved before anything is fetched, so a malformed URL costs no network call.
    /// Unless `force` is set, a disk mirror written for exactly these ids is used instead of
    /// the network. Nothing is replaced unless every row succeeds.
    ///
    /// Populating channels also replaces the channel-derived playlists (and therefore the
    /// item pages); populating playlists also replaces the item pages. Those follow-up
    /// replacements happen after the primary kind is committed, and are all-or-nothing too.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn populate(
        &self,
        kind: EntityKind,
        rows: &ConfigRows,
        force: bool,
    ) -> Result<Source, CatalogError> {
        let ids = rows
            .values()
            .iter()
            .map(|url| resolve_id(kind, url))
            .collect::<Result<Vec<_>, _>>()?;

        match kind {
            EntityKind::Video => {
                let _writer = self.videos.writer.lock().await;
                let (videos, source) = self
                    .load_or_fetch(kind, kind.as_str(), ids, force)
                    .await?;
                self.videos.swap(videos, 0);
                Ok(source)
            }
            EntityKind::PlaylistItemPage => {
                let _writer = self.item_pages.writer.lock().await;
                let (pages, source) = self.load_or_fetch_item_pages(&ids, force).await?;
                self.item_pages.swap(pages, 0);
                Ok(source)
            }
            EntityKind::Playlist => {
                let _writer = self.playlists.writer.lock().await;
                let (sheet, source) = self
                    .load_or_fetch(kind, kind.as_str(), ids, force)
                    .await?;
                self.commit_playlists(Some(sheet), None, force).await?;
                Ok(source)
            }
            EntityKind::Channel => {
                let _writer = self.channels.writer.lock().await;
                let (channels, source) = self
                    .load_or_fetch(kind, kind.as_str(), ids, force)
                    .await?;
                let uploads: Vec<String> = channels
                    .iter()
                    .filter_map(ResolvedEntity::as_channel)
                    .map(|channel| channel.uploads_playlist_id().to_string())
                    .collect();
                self.channels.swap(channels, 0);

                let _playlists_writer = self.playlists.writer.lock().await;
                let (uploads, _) = self
                    .load_or_fetch(EntityKind::Playlist, UPLOADS_SLOT, uploads, force)
                    .await?;
                self.commit_playlists(None, Some(uploads), force).await?;
                Ok(source)
            }
        }
    }

    /// Replaces one or both segments of the playlist sequence, along with the item pages.
    ///
    /// The caller must hold the playlist writer lock.
    async fn commit_playlists(
        &self,
        from_rows: Option<Vec<ResolvedEntity>>,
        derived: Option<Vec<ResolvedEntity>>,
        force: bool,
    ) -> Result<(), CatalogError> {
        let (current, current_derived) = self.playlists.stored();
        let split = current.len() - current_derived;
        let mut playlists = from_rows.unwrap_or_else(|| current[..split].to_vec());
        let derived = derived.unwrap_or_else(|| current[split..].to_vec());
        let derived_len = derived.len();
        playlists.extend(derived);

        let _writer = self.item_pages.writer.lock().await;
        let ids: Vec<String> = playlists.iter().map(|p| p.id().to_string()).collect();
        let (pages, _) = self.load_or_fetch_item_pages(&ids, force).await?;

        tracing::info!(
            playlists = playlists.len(),
            derived = derived_len,
            "committing playlists and item pages"
        );
        // swapped under both guards, so readers never see new playlists with old item pages
        let mut stored_playlists = self
            .playlists
            .stored
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut stored_pages = self
            .item_pages
            .stored
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *stored_playlists = Stored::new(playlists, derived_len);
        *stored_pages = Stored::new(pages, 0);
        Ok(())
    }

    /// The first page of items of each playlist in `ids`, in order.
    ///
    /// The item-page mirror is keyed by playlist rather than by the whole sequence, since the
    /// sequence is assembled from two independently populated segments. Unless `force` is set,
    /// only playlists missing from the mirror are fetched. Fetched pages are merged into the
    /// mirror, keeping the entries of playlists not in `ids`.
    async fn load_or_fetch_item_pages(
        &self,
        ids: &[String],
        force: bool,
    ) -> Result<(Vec<ResolvedEntity>, Source), CatalogError> {
        let kind = EntityKind::PlaylistItemPage;
        let mut mirrored: Vec<(String, ResolvedEntity)> =
            match self.read_mirror_file(kind.as_str()).await {
                Some(file) if file.ids.len() == file.entities.len() => {
                    file.ids.into_iter().zip(file.entities).collect()
                }
                Some(_) => {
                    tracing::warn!(slot = kind.as_str(), "ignoring inconsistent disk mirror");
                    Vec::new()
                }
                None => Vec::new(),
            };

        let missing: Vec<String> = ids
            .iter()
            .filter(|id| force || find_page(&mirrored, id.as_str()).is_none())
            .cloned()
            .collect();
        if missing.is_empty() {
            if !ids.is_empty() {
                tracing::info!(%kind, count = ids.len(), "loaded from disk mirror");
            }
            let pages = ids
                .iter()
                .filter_map(|id| find_page(&mirrored, id))
                .collect();
            return Ok((pages, Source::Mirror));
        }

        let fetched = self.fetch_each(kind, &missing).await?;
        tracing::info!(%kind, count = fetched.len(), "fetched from remote catalog");
        for (id, page) in missing.into_iter().zip(fetched) {
            match mirrored.iter_mut().find(|(mirrored_id, _)| *mirrored_id == id) {
                Some(entry) => entry.1 = page,
                None => mirrored.push((id, page)),
            }
        }
        let pages = ids
            .iter()
            .filter_map(|id| find_page(&mirrored, id))
            .collect();

        if let Some(mirror) = &self.mirror {
            let (ids, entities) = mirrored.into_iter().unzip();
            if let Err(e) = mirror
                .write_kind(kind.as_str(), &MirrorFile { ids, entities })
                .await
            {
                tracing::warn!(error = %e, slot = kind.as_str(), "disk mirror not updated");
            }
        }
        Ok((pages, Source::Network))
    }

    async fn load_or_fetch(
        &self,
        kind: EntityKind,
        slot: &str,
        ids: Vec<String>,
        force: bool,
    ) -> Result<(Vec<ResolvedEntity>, Source), CatalogError> {
        if !force {
            if let Some(entities) = self.read_mirror(slot, &ids).await {
                tracing::info!(%kind, slot, count = entities.len(), "loaded from disk mirror");
                return Ok((entities, Source::Mirror));
            }
        }

        let entities = self.fetch_each(kind, &ids).await?;
        tracing::info!(%kind, count = entities.len(), "fetched from remote catalog");

        let file = MirrorFile { ids, entities };
        if let Some(mirror) = &self.mirror {
            if let Err(e) = mirror.write_kind(slot, &file).await {
                tracing::warn!(error = %e, slot, "disk mirror not updated");
            }
        }
        Ok((file.entities, Source::Network))
    }

    /// Fetches one entity per id, at most `concurrency` at a time, keeping the order of `ids`.
    async fn fetch_each(
        &self,
        kind: EntityKind,
        ids: &[String],
    ) -> Result<Vec<ResolvedEntity>, CatalogError> {
        futures::stream::iter(ids.to_vec())
            .map(|id| async move { self.client.fetch_entity(kind, &id).await })
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    async fn read_mirror(&self, slot: &str, ids: &[String]) -> Option<Vec<ResolvedEntity>> {
        let file = self.read_mirror_file(slot).await?;
        if file.ids == ids && file.entities.len() == ids.len() {
            Some(file.entities)
        } else {
            tracing::debug!(slot, "disk mirror was written for other rows");
            None
        }
    }

    async fn read_mirror_file(&self, slot: &str) -> Option<MirrorFile> {
        let mirror = self.mirror.as_ref()?;
        match mirror.read_kind(slot).await {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(error = %e, slot, "ignoring unreadable disk mirror");
                None
            }
        }
    }
}

fn find_page(mirrored: &[(String, ResolvedEntity)], playlist_id: &str) -> Option<ResolvedEntity> {
    mirrored
        .iter()
        .find(|(id, _)| id == playlist_id)
        .map(|(_, page)| page.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, FakeCatalog};

    fn ids(snapshot: &Snapshot) -> Vec<&str> {
        snapshot.iter().map(|e| e.id()).collect()
    }

    fn playlist_rows(ids: &[&str]) -> ConfigRows {
        ConfigRows::new(
            ids.iter()
                .map(|id| format!("https://www.youtube.com/playlist?list={id}"))
                .collect(),
        )
    }

    fn catalog() -> FakeCatalog {
        let mut fake = FakeCatalog::default();
        for (id, count) in [("PL1", 3), ("PL2", 60), ("PL3", 1), ("PL4", 7), ("UU1", 12)] {
            fake.add_playlist(testing::playlist(id, count), count);
        }
        fake.add_video(testing::video("v1"));
        fake.add_video(testing::video("v2"));
        fake.add_channel(testing::channel("UC1", "UU1"));
        fake
    }

    fn cache(fake: FakeCatalog, mirror: Option<DiskMirror>) -> (Arc<FakeCatalog>, CatalogCache) {
        let fake = Arc::new(fake);
        let client = CatalogClient::new(fake.clone(), 50);
        (fake.clone(), CatalogCache::new(client, mirror, 4))
    }

    #[tokio::test]
    async fn unpopulated_kinds_are_empty() {
        let (_, cache) = cache(catalog(), None);
        for kind in EntityKind::ALL {
            assert!(cache.get(kind).is_empty(), "{kind}");
        }
    }

    #[tokio::test]
    async fn playlists_keep_row_order_and_build_item_pages() {
        let (_, cache) = cache(catalog(), None);
        let source = cache
            .populate(EntityKind::Playlist, &playlist_rows(&["PL3", "PL1", "PL2"]), false)
            .await
            .unwrap();

        assert_eq!(source, Source::Network);
        assert_eq!(ids(&cache.get(EntityKind::Playlist)), ["PL3", "PL1", "PL2"]);
        let pages = cache.get(EntityKind::PlaylistItemPage);
        assert_eq!(ids(&pages), ["PL3", "PL1", "PL2"]);
        let big = pages[2].as_item_page().unwrap();
        assert_eq!(big.page.items.len(), 50);
        assert_eq!(big.page.total_results, 60);
    }

    #[tokio::test]
    async fn failed_populate_keeps_the_previous_sequence() {
        let mut fake = catalog();
        fake.fail_on("PL4");
        let (_, cache) = cache(fake, None);
        cache
            .populate(EntityKind::Playlist, &playlist_rows(&["PL1", "PL2"]), false)
            .await
            .unwrap();
        let before = cache.get(EntityKind::Playlist);
        let pages_before = cache.get(EntityKind::PlaylistItemPage);

        let err = cache
            .populate(EntityKind::Playlist, &playlist_rows(&["PL1", "PL4", "PL3"]), true)
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::RemoteUnavailable { .. }), "{err:?}");
        assert_eq!(cache.get(EntityKind::Playlist), before);
        assert_eq!(cache.get(EntityKind::PlaylistItemPage), pages_before);
    }

    #[tokio::test]
    async fn failed_first_populate_stays_empty() {
        let (_, cache) = cache(catalog(), None);
        let err = cache
            .populate(EntityKind::Playlist, &playlist_rows(&["PL1", "PLmissing"]), false)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::EmptyResult { .. }), "{err:?}");
        assert!(cache.get(EntityKind::Playlist).is_empty());
    }

    #[tokio::test]
    async fn malformed_row_aborts_before_any_fetch() {
        let (fake, cache) = cache(catalog(), None);
        let rows = ConfigRows::new(vec![
            "https://www.youtube.com/watch?v=v1".to_string(),
            "https://example.com/nothing".to_string(),
        ]);

        let err = cache
            .populate(EntityKind::Video, &rows, false)
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::MalformedReference { .. }), "{err:?}");
        assert_eq!(fake.calls(), 0);
        assert!(cache.get(EntityKind::Video).is_empty());
    }

    #[tokio::test]
    async fn channels_derive_uploads_playlists() {
        let (_, cache) = cache(catalog(), None);
        cache
            .populate(EntityKind::Playlist, &playlist_rows(&["PL1"]), false)
            .await
            .unwrap();
        let rows = ConfigRows::new(vec!["https://www.youtube.com/channel/UC1".to_string()]);
        cache
            .populate(EntityKind::Channel, &rows, false)
            .await
            .unwrap();

        assert_eq!(ids(&cache.get(EntityKind::Channel)), ["UC1"]);
        assert_eq!(ids(&cache.get(EntityKind::Playlist)), ["PL1", "UU1"]);
        assert_eq!(ids(&cache.get(EntityKind::PlaylistItemPage)), ["PL1", "UU1"]);

        // repopulating playlists from rows keeps the derived segment
        cache
            .populate(EntityKind::Playlist, &playlist_rows(&["PL2", "PL3"]), true)
            .await
            .unwrap();
        assert_eq!(ids(&cache.get(EntityKind::Playlist)), ["PL2", "PL3", "UU1"]);
        assert_eq!(
            ids(&cache.get(EntityKind::PlaylistItemPage)),
            ["PL2", "PL3", "UU1"]
        );
    }

    #[tokio::test]
    async fn failed_derivation_keeps_committed_channels() {
        let mut fake = catalog();
        fake.fail_on("UU1");
        let (_, cache) = cache(fake, None);
        let rows = ConfigRows::new(vec!["https://www.youtube.com/channel/UC1".to_string()]);

        let err = cache
            .populate(EntityKind::Channel, &rows, false)
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::RemoteUnavailable { .. }), "{err:?}");
        assert_eq!(ids(&cache.get(EntityKind::Channel)), ["UC1"]);
        assert!(cache.get(EntityKind::Playlist).is_empty());
    }

    #[tokio::test]
    async fn videos_populate_independently() {
        let (_, cache) = cache(catalog(), None);
        let rows = ConfigRows::new(vec![
            "https://www.youtube.com/watch?v=v2".to_string(),
            "https://youtu.be/?v=v1".to_string(),
        ]);
        cache.populate(EntityKind::Video, &rows, false).await.unwrap();
        assert_eq!(ids(&cache.get(EntityKind::Video)), ["v2", "v1"]);
        assert!(cache.get(EntityKind::Playlist).is_empty());
    }

    #[tokio::test]
    async fn mirror_hit_skips_the_network() {
        let dir = tempfile::tempdir().unwrap();
        let rows = playlist_rows(&["PL1", "PL2"]);

        let (fake, first) = cache(catalog(), Some(DiskMirror::new(dir.path())));
        first.populate(EntityKind::Playlist, &rows, false).await.unwrap();
        assert!(fake.calls() > 0);

        let (fake, second) = cache(catalog(), Some(DiskMirror::new(dir.path())));
        let source = second
            .populate(EntityKind::Playlist, &rows, false)
            .await
            .unwrap();
        assert_eq!(source, Source::Mirror);
        assert_eq!(fake.calls(), 0);
        assert_eq!(second.get(EntityKind::Playlist), first.get(EntityKind::Playlist));
        assert_eq!(
            second.get(EntityKind::PlaylistItemPage),
            first.get(EntityKind::PlaylistItemPage)
        );

        // forcing goes to the network even though the mirror matches
        let source = second
            .populate(EntityKind::Playlist, &rows, true)
            .await
            .unwrap();
        assert_eq!(source, Source::Network);
        assert!(fake.calls() > 0);
    }

    #[tokio::test]
    async fn mirror_for_other_rows_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let (_, first) = cache(catalog(), Some(DiskMirror::new(dir.path())));
        first
            .populate(EntityKind::Playlist, &playlist_rows(&["PL1"]), false)
            .await
            .unwrap();

        let (_, second) = cache(catalog(), Some(DiskMirror::new(dir.path())));
        let source = second
            .populate(EntityKind::Playlist, &playlist_rows(&["PL1", "PL2"]), false)
            .await
            .unwrap();
        assert_eq!(source, Source::Network);
        assert_eq!(second.len(EntityKind::Playlist), 2);
    }

    #[tokio::test]
    async fn corrupt_mirror_falls_back_to_the_network() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("video.json"), b"[[[").unwrap();
        let (fake, cache) = cache(catalog(), Some(DiskMirror::new(dir.path())));
        let rows = ConfigRows::new(vec!["https://www.youtube.com/watch?v=v1".to_string()]);

        let source = cache.populate(EntityKind::Video, &rows, false).await.unwrap();
        assert_eq!(source, Source::Network);
        assert_eq!(fake.calls(), 1);
        assert_eq!(cache.len(EntityKind::Video), 1);
    }

    #[tokio::test]
    async fn mirror_write_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, b"").unwrap();
        let (_, cache) = cache(catalog(), Some(DiskMirror::new(&blocker)));
        let rows = ConfigRows::new(vec!["https://www.youtube.com/watch?v=v1".to_string()]);

        cache.populate(EntityKind::Video, &rows, false).await.unwrap();
        assert_eq!(ids(&cache.get(EntityKind::Video)), ["v1"]);
    }

    #[tokio::test]
    async fn invalidation_is_scoped() {
        let (_, cache) = cache(catalog(), None);
        cache
            .populate(EntityKind::Playlist, &playlist_rows(&["PL1"]), false)
            .await
            .unwrap();
        let rows = ConfigRows::new(vec!["https://www.youtube.com/watch?v=v1".to_string()]);
        cache.populate(EntityKind::Video, &rows, false).await.unwrap();

        cache.invalidate(EntityKind::Video).await;
        assert!(cache.get(EntityKind::Video).is_empty());
        assert_eq!(cache.len(EntityKind::Playlist), 1);

        cache.invalidate_all().await;
        for kind in EntityKind::ALL {
            assert!(cache.get(kind).is_empty(), "{kind}");
        }
    }

    #[tokio::test]
    async fn snapshots_are_unaffected_by_later_swaps() {
        let (_, cache) = cache(catalog(), None);
        cache
            .populate(EntityKind::Playlist, &playlist_rows(&["PL1"]), false)
            .await
            .unwrap();
        let held = cache.get(EntityKind::Playlist);
        cache
            .populate(EntityKind::Playlist, &playlist_rows(&["PL2", "PL3"]), true)
            .await
            .unwrap();
        assert_eq!(ids(&held), ["PL1"]);
        assert_eq!(cache.len(EntityKind::Playlist), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_see_playlists_and_pages_from_the_same_population() {
        let (_, cache) = cache(catalog(), None);
        let cache = Arc::new(cache);
        let done = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let reader = {
            let cache = cache.clone();
            let done = done.clone();
            tokio::spawn(async move {
                let mut reads = 0;
                while !done.load(std::sync::atomic::Ordering::SeqCst) {
                    let (playlists, pages) = cache.playlists_and_pages();
                    assert_eq!(ids(&playlists), ids(&pages));
                    reads += 1;
                    tokio::task::yield_now().await;
                }
                reads
            })
        };

        let rows = [playlist_rows(&["PL1", "PL2"]), playlist_rows(&["PL3", "PL4", "PL1"])];
        for i in 0..40 {
            cache
                .populate(EntityKind::Playlist, &rows[i % 2], true)
                .await
                .unwrap();
        }
        done.store(true, std::sync::atomic::Ordering::SeqCst);
        assert!(reader.await.unwrap() > 0);
    }

    #[tokio::test]
    async fn item_page_mirror_survives_a_channel_first_startup() {
        let dir = tempfile::tempdir().unwrap();
        let rows = playlist_rows(&["PL1", "PL2", "PL3"]);
        let no_channels = ConfigRows::new(Vec::new());

        for run in 0..2 {
            let (fake, cache) = cache(catalog(), Some(DiskMirror::new(dir.path())));
            cache
                .populate(EntityKind::Channel, &no_channels, false)
                .await
                .unwrap();
            let source = cache
                .populate(EntityKind::Playlist, &rows, false)
                .await
                .unwrap();
            assert_eq!(ids(&cache.get(EntityKind::PlaylistItemPage)), ["PL1", "PL2", "PL3"]);
            if run == 1 {
                assert_eq!(source, Source::Mirror);
                assert_eq!(fake.calls(), 0);
            }
        }
    }

    #[tokio::test]
    async fn item_page_mirror_keeps_pages_of_both_segments() {
        let dir = tempfile::tempdir().unwrap();
        let channels = ConfigRows::new(vec!["https://www.youtube.com/channel/UC1".to_string()]);
        let rows = playlist_rows(&["PL1"]);

        let (_, first) = cache(catalog(), Some(DiskMirror::new(dir.path())));
        first.populate(EntityKind::Playlist, &rows, false).await.unwrap();
        first.populate(EntityKind::Channel, &channels, false).await.unwrap();

        // the other order on the next start still finds every page
        let (fake, second) = cache(catalog(), Some(DiskMirror::new(dir.path())));
        second.populate(EntityKind::Channel, &channels, false).await.unwrap();
        second.populate(EntityKind::Playlist, &rows, false).await.unwrap();
        assert_eq!(fake.calls(), 0);
        assert_eq!(
            ids(&second.get(EntityKind::PlaylistItemPage)),
            ["PL1", "UU1"]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_populates_end_in_one_complete_run() {
        let (_, cache) = cache(catalog(), None);
        let cache = Arc::new(cache);
        let a = playlist_rows(&["PL1", "PL2"]);
        let b = playlist_rows(&["PL3", "PL4", "PL1"]);

        for _ in 0..20 {
            let (ra, rb) = tokio::join!(
                cache.populate(EntityKind::Playlist, &a, true),
                cache.populate(EntityKind::Playlist, &b, true),
            );
            ra.unwrap();
            rb.unwrap();
            let playlists = cache.get(EntityKind::Playlist);
            let got = ids(&playlists);
            assert!(
                got == ["PL1", "PL2"] || got == ["PL3", "PL4", "PL1"],
                "{got:?}"
            );
            assert_eq!(ids(&cache.get(EntityKind::PlaylistItemPage)), got);
        }
    }
}
