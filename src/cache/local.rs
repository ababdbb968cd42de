//! File-backed local cache tier.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::error::{CacheError, CacheResult};
use crate::constants::CACHE_MAX_DIRTY;

/// Outcome of merging one cache into another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Keys present in both caches with different values.
    pub conflicts: BTreeSet<String>,
    /// Keys copied that the target did not have.
    pub added: usize,
    /// Conflicting keys overwritten (only with `force`).
    pub overwritten: usize,
    /// Whether the target was modified.
    pub applied: bool,
}

impl MergeReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

#[derive(Debug, Default)]
struct LocalState {
    entries: BTreeMap<String, String>,
    dirty: usize,
    /// Bumped for every snapshot taken for writing.
    generation: u64,
}

/// Copy of the map taken under the state lock and written without it.
#[derive(Debug)]
struct Snapshot {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    generation: u64,
    flushed: usize,
    /// Generation currently on disk; held for the whole write.
    written: Arc<Mutex<u64>>,
}

impl Snapshot {
    fn take(path: &Path, written: &Arc<Mutex<u64>>, state: &mut LocalState) -> Self {
        state.generation += 1;
        Self {
            path: path.to_path_buf(),
            entries: state.entries.clone(),
            generation: state.generation,
            flushed: std::mem::take(&mut state.dirty),
            written: Arc::clone(written),
        }
    }

    /// Writes the snapshot unless a newer one already reached the disk.
    /// Returns whether the file was written.
    fn write(self) -> CacheResult<bool> {
        let mut written = self.written.lock();
        if *written >= self.generation {
            debug!(
                path = %self.path.display(),
                generation = self.generation,
                on_disk = *written,
                "Skipping stale snapshot"
            );
            return Ok(false);
        }

        write_file(&self.path, &self.entries)?;
        *written = self.generation;
        debug!(
            path = %self.path.display(),
            entries = self.entries.len(),
            flushed = self.flushed,
            "Local cache written"
        );
        Ok(true)
    }
}

/// Temporary file in the same directory, then an atomic rename over `path`.
fn write_file(path: &Path, entries: &BTreeMap<String, String>) -> CacheResult<()> {
    let io_err = |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(io_err)?;

    let bytes = serde_json::to_vec(entries).map_err(CacheError::Encode)?;

    let mut temp = NamedTempFile::new_in(&dir).map_err(io_err)?;
    temp.write_all(&bytes).map_err(io_err)?;
    temp.as_file().sync_all().map_err(io_err)?;
    temp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// String map persisted as one JSON object per file.
///
/// Writes go to memory first. Once more than `max_dirty` unsaved changes pile up
/// the whole map is rewritten through a temporary file and an atomic rename, so a
/// crash never leaves a half-written file behind. The rewrite works on a snapshot
/// and runs on tokio's blocking pool; readers and writers of the map never wait
/// for the disk. Dropping the cache flushes whatever is still pending.
#[derive(Debug)]
pub struct LocalCache {
    path: PathBuf,
    state: Mutex<LocalState>,
    written: Arc<Mutex<u64>>,
    max_dirty: usize,
}

impl LocalCache {
    /// Opens `path`, loading its contents when the file exists.
    pub fn open(path: impl Into<PathBuf>) -> CacheResult<Self> {
        let path = path.into();
        let entries = if path.is_file() {
            let raw = fs::read(&path).map_err(|source| CacheError::Io {
                path: path.clone(),
                source,
            })?;
            if raw.iter().all(u8::is_ascii_whitespace) {
                BTreeMap::new()
            } else {
                serde_json::from_slice(&raw).map_err(|source| CacheError::Corrupted {
                    path: path.clone(),
                    source,
                })?
            }
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), entries = entries.len(), "Local cache opened");

        Ok(Self {
            path,
            state: Mutex::new(LocalState {
                entries,
                ..LocalState::default()
            }),
            written: Arc::new(Mutex::new(0)),
            max_dirty: CACHE_MAX_DIRTY,
        })
    }

    /// Overrides the unsaved-change threshold.
    pub fn with_max_dirty(mut self, max_dirty: usize) -> Self {
        self.max_dirty = max_dirty;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.state.lock().entries.get(key).cloned()
    }

    /// Stores `value`. Returns `false` when the key already held that exact value.
    pub async fn put(&self, key: &str, value: &str) -> CacheResult<bool> {
        let snapshot = {
            let mut state = self.state.lock();
            if state.entries.get(key).map(String::as_str) == Some(value) {
                return Ok(false);
            }
            state.entries.insert(key.to_string(), value.to_string());
            state.dirty += 1;
            (state.dirty > self.max_dirty)
                .then(|| Snapshot::take(&self.path, &self.written, &mut state))
        };

        if let Some(snapshot) = snapshot {
            self.persist(snapshot).await?;
        }
        Ok(true)
    }

    /// Number of changes not yet on disk.
    pub fn dirty(&self) -> usize {
        self.state.lock().dirty
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Copy of all entries.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.state.lock().entries.clone()
    }

    /// Writes the whole map to disk.
    pub async fn flush(&self) -> CacheResult<()> {
        let snapshot = Snapshot::take(&self.path, &self.written, &mut self.state.lock());
        self.persist(snapshot).await
    }

    /// Copies every entry of `other` into this cache.
    ///
    /// Keys with differing values are conflicts. Without `force` any conflict
    /// leaves this cache untouched; with `force` the values of `other` win. An
    /// applied merge is persisted before returning.
    pub async fn merge_from(&self, other: &LocalCache, force: bool) -> CacheResult<MergeReport> {
        if std::ptr::eq(self, other) || self.path == other.path {
            return Ok(MergeReport {
                applied: true,
                ..MergeReport::default()
            });
        }

        let incoming = other.snapshot();
        let (report, snapshot) = {
            let mut state = self.state.lock();

            let conflicts: BTreeSet<String> = incoming
                .iter()
                .filter(|(key, value)| {
                    state
                        .entries
                        .get(key.as_str())
                        .is_some_and(|existing| existing != *value)
                })
                .map(|(key, _)| key.clone())
                .collect();

            if !conflicts.is_empty() && !force {
                warn!(
                    into = %self.path.display(),
                    from = %other.path.display(),
                    conflicts = conflicts.len(),
                    "Merge refused, caches disagree"
                );
                return Ok(MergeReport {
                    conflicts,
                    ..MergeReport::default()
                });
            }

            let mut added = 0;
            let mut overwritten = 0;
            for (key, value) in incoming {
                match state.entries.insert(key, value.clone()) {
                    None => added += 1,
                    Some(previous) if previous != value => overwritten += 1,
                    Some(_) => {}
                }
            }
            state.dirty += added + overwritten;

            let report = MergeReport {
                conflicts,
                added,
                overwritten,
                applied: true,
            };
            (report, Snapshot::take(&self.path, &self.written, &mut state))
        };

        self.persist(snapshot).await?;
        info!(
            into = %self.path.display(),
            from = %other.path.display(),
            added = report.added,
            overwritten = report.overwritten,
            "Caches merged"
        );
        Ok(report)
    }

    /// Runs the write on the blocking pool. A failed write puts its changes
    /// back on the dirty counter so a later flush retries them.
    async fn persist(&self, snapshot: Snapshot) -> CacheResult<()> {
        let flushed = snapshot.flushed;
        let outcome = match tokio::task::spawn_blocking(move || snapshot.write()).await {
            Ok(outcome) => outcome,
            Err(e) => Err(CacheError::WriteTask(e)),
        };
        if outcome.is_err() {
            self.state.lock().dirty += flushed;
        }
        outcome.map(|_| ())
    }
}

impl Drop for LocalCache {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if state.dirty == 0 {
            return;
        }
        // no runtime to hand off to here; write in place
        let snapshot = Snapshot::take(&self.path, &self.written, state);
        if let Err(e) = snapshot.write() {
            warn!(path = %self.path.display(), error = %e, "Failed to flush cache on drop");
        }
    }
}
