use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use lyncup_ann::AnnIndex;
use tokio::sync::RwLock;

/// Caches a loaded [`AnnIndex`] behind an mtime check, reloading only when
/// the on-disk artifact has actually changed since the last tick.
pub struct IndexCache {
    ann_path: PathBuf,
    map_path: PathBuf,
    loaded: RwLock<Option<(SystemTime, Arc<AnnIndex>)>>,
}

impl IndexCache {
    pub fn new(ann_path: PathBuf, map_path: PathBuf) -> Self {
        Self {
            ann_path,
            map_path,
            loaded: RwLock::new(None),
        }
    }

    /// Whether both artifact files exist on disk — the dispatcher's gate,
    /// checked before a tick is even attempted.
    pub fn artifact_exists(&self) -> bool {
        self.ann_path.exists() && self.map_path.exists()
    }

    /// Current index, reloading from disk if the file's mtime changed. On
    /// a reload failure (corrupt file mid-write race, truncated read), the
    /// previous successfully loaded index is kept and served — stale but
    /// valid beats none, and the Matcher treats a fresh `None` as "skip
    /// non-leftover matching" anyway.
    pub async fn current(&self) -> Option<Arc<AnnIndex>> {
        if !self.artifact_exists() {
            return None;
        }
        let mtime = std::fs::metadata(&self.ann_path).and_then(|m| m.modified()).ok();

        {
            let guard = self.loaded.read().await;
            if let Some((cached_mtime, index)) = guard.as_ref() {
                if mtime.is_some() && Some(*cached_mtime) == mtime {
                    return Some(index.clone());
                }
            }
        }

        match AnnIndex::load(&self.ann_path) {
            Ok(index) => {
                let index = Arc::new(index);
                let mut guard = self.loaded.write().await;
                *guard = Some((mtime.unwrap_or(SystemTime::UNIX_EPOCH), index.clone()));
                Some(index)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to (re)load ann artifact, keeping previous index if any");
                self.loaded.read().await.as_ref().map(|(_, idx)| idx.clone())
            }
        }
    }
}
