use super::ResolvedEntity;
use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a mirror file holds: the ids a sequence was fetched for, and the sequence itself.
///
/// The ids are what a later population compares against, so a mirror written for a different
/// set of configuration rows is never mistaken for a hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorFile {
    pub ids: Vec<String>,
    pub entities: Vec<ResolvedEntity>,
}

/// Best-effort on-disk copy of cached sequences, one JSON file per slot.
#[derive(Debug, Clone)]
pub struct DiskMirror {
    dir: PathBuf,
}

impl DiskMirror {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, slot: &str) -> PathBuf {
        self.dir.join(format!("{slot}.json"))
    }

    /// Reads the mirror for `slot`; `Ok(None)` when it was never written.
    pub async fn read_kind(&self, slot: &str) -> Result<Option<MirrorFile>, CatalogError> {
        let path = self.path(slot);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CatalogError::PersistenceRead {
                    path,
                    reason: e.to_string(),
                });
            }
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| CatalogError::PersistenceRead {
                path,
                reason: e.to_string(),
            })
    }

    /// Replaces the mirror for `slot`.
    ///
    /// The file is written beside its final name and renamed into place, so readers never see
    /// a truncated file.
    pub async fn write_kind(&self, slot: &str, file: &MirrorFile) -> Result<(), CatalogError> {
        let path = self.path(slot);
        let json = serde_json::to_vec_pretty(file).map_err(|e| CatalogError::PersistenceWrite {
            path: path.clone(),
            source: std::io::Error::other(e),
        })?;
        let staging = self.dir.join(format!(".{slot}.json.tmp"));
        let write = async {
            tokio::fs::create_dir_all(&self.dir).await?;
            tokio::fs::write(&staging, &json).await?;
            tokio::fs::rename(&staging, &path).await
        };
        write
            .await
            .map_err(|source| CatalogError::PersistenceWrite { path, source })
    }
}
