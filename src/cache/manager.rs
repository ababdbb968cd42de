//! One cache file per (kind, model, seed), shared within a process.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::error::{CacheError, CacheResult};
use super::local::LocalCache;
use super::remote::{RedisStore, RemoteStore};
use super::tiered::Cache;
use crate::constants::CACHE_FILE_EXTENSION;

/// Hands out memoized [`Cache`] instances rooted in one directory.
///
/// Asking twice for the same name returns the same `Arc`, so every component
/// of a run shares one in-memory map per file.
#[derive(Debug)]
pub struct CacheManager {
    dir: PathBuf,
    remote: Option<Arc<dyn RemoteStore>>,
    caches: Mutex<HashMap<String, Arc<Cache>>>,
}

impl CacheManager {
    /// Local-only manager. Creates `dir` when missing.
    pub fn new(dir: impl Into<PathBuf>) -> CacheResult<Self> {
        Self::build(dir.into(), None)
    }

    /// Manager whose caches also use `remote`.
    pub fn with_remote(dir: impl Into<PathBuf>, remote: Arc<dyn RemoteStore>) -> CacheResult<Self> {
        Self::build(dir.into(), Some(remote))
    }

    /// Manager backed by Redis at `url`. An unreachable server degrades to
    /// local-only with a warning.
    pub async fn with_redis(dir: impl Into<PathBuf>, url: &str) -> CacheResult<Self> {
        let remote: Option<Arc<dyn RemoteStore>> = match RedisStore::connect(url).await {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                warn!(url = %url, error = %e, "Remote cache disabled");
                None
            }
        };
        Self::build(dir.into(), remote)
    }

    fn build(dir: PathBuf, remote: Option<Arc<dyn RemoteStore>>) -> CacheResult<Self> {
        if dir.exists() && !dir.is_dir() {
            return Err(CacheError::NotADirectory { path: dir });
        }
        fs::create_dir_all(&dir).map_err(|source| CacheError::Io {
            path: dir.clone(),
            source,
        })?;

        debug!(dir = %dir.display(), remote = remote.is_some(), "Cache manager ready");
        Ok(Self {
            dir,
            remote,
            caches: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache for one kind of request against one model and seed.
    pub fn cache(&self, kind: &str, model: &str, seed: u32) -> CacheResult<Arc<Cache>> {
        self.cache_named(&format!("{kind}_{model}_{seed}"))
    }

    /// Cache stored in `<dir>/<name>.json`; `:` and path separators in `name`
    /// become `__`.
    pub fn cache_named(&self, name: &str) -> CacheResult<Arc<Cache>> {
        let file_name = format!("{}.{}", sanitize_file_name(name), CACHE_FILE_EXTENSION);
        self.get_or_open(file_name)
    }

    /// Cache backed by the file named like `path` inside this manager's
    /// directory. Without `create` the file must already exist there.
    pub fn open_file(&self, path: &Path, create: bool) -> CacheResult<Arc<Cache>> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| CacheError::FileUnavailable {
                path: path.to_path_buf(),
            })?;

        let resolved = self.dir.join(&file_name);
        if resolved.is_dir() || (!create && !resolved.is_file()) {
            return Err(CacheError::FileUnavailable { path: resolved });
        }
        self.get_or_open(file_name)
    }

    fn get_or_open(&self, file_name: String) -> CacheResult<Arc<Cache>> {
        let mut caches = self.caches.lock();
        if let Some(cache) = caches.get(&file_name) {
            return Ok(Arc::clone(cache));
        }

        let local = LocalCache::open(self.dir.join(&file_name))?;
        let cache = Arc::new(Cache::new(file_name.clone(), local, self.remote.clone()));
        caches.insert(file_name, Arc::clone(&cache));
        Ok(cache)
    }

    /// Cache files currently present in the directory, sorted by name.
    pub fn cache_files(&self) -> CacheResult<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir).map_err(|source| CacheError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path.extension().and_then(|ext| ext.to_str()) == Some(CACHE_FILE_EXTENSION)
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// Flushes every cache handed out so far.
    pub async fn flush_all(&self) -> CacheResult<()> {
        let caches: Vec<Arc<Cache>> = self.caches.lock().values().cloned().collect();
        for cache in &caches {
            cache.flush().await?;
        }
        info!(caches = caches.len(), "Caches flushed");
        Ok(())
    }
}

/// Replaces characters that are unsafe in file names.
pub fn sanitize_file_name(name: &str) -> String {
    name.replace([':', '/', '\\'], "__")
}
