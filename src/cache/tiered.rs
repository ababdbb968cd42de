//! Remote-over-local cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::error::{CacheError, CacheResult};
use super::key::CacheKey;
use super::local::{LocalCache, MergeReport};
use super::remote::RemoteStore;

/// Content-addressed cache for oracle answers.
///
/// The local file tier is always present. When a remote tier is attached it is
/// consulted first and kept in sync; the first remote failure is logged and the
/// remote is switched off for the rest of the process, so a flaky server costs
/// at most one warning and never fails a lookup.
#[derive(Debug)]
pub struct Cache {
    name: String,
    local: LocalCache,
    remote: Option<Arc<dyn RemoteStore>>,
    remote_active: AtomicBool,
}

impl Cache {
    pub fn new(name: impl Into<String>, local: LocalCache, remote: Option<Arc<dyn RemoteStore>>) -> Self {
        let remote_active = AtomicBool::new(remote.is_some());
        Self {
            name: name.into(),
            local,
            remote,
            remote_active,
        }
    }

    /// Cache backed only by a local file.
    pub fn local_only(name: impl Into<String>, local: LocalCache) -> Self {
        Self::new(name, local, None)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local(&self) -> &LocalCache {
        &self.local
    }

    /// Whether lookups still go to the remote tier.
    pub fn is_remote_active(&self) -> bool {
        self.remote_active.load(Ordering::Acquire)
    }

    /// Unsaved local changes.
    pub fn dirty(&self) -> usize {
        self.local.dirty()
    }

    fn active_remote(&self) -> Option<&Arc<dyn RemoteStore>> {
        self.remote.as_ref().filter(|_| self.is_remote_active())
    }

    fn disable_remote(&self, error: &CacheError) {
        if self.remote_active.swap(false, Ordering::AcqRel) {
            warn!(cache = %self.name, error = %error, "Remote cache unavailable, continuing with local file only");
        }
    }

    /// Looks up a raw value.
    #[instrument(skip(self, key), fields(cache = %self.name, key = %key.local_key()))]
    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        let remote_key = key.remote_key();

        if let Some(remote) = self.active_remote() {
            match remote.get(&remote_key).await {
                Ok(Some(value)) => {
                    debug!("Remote hit");
                    return Some(value);
                }
                Ok(None) => {}
                Err(e) => self.disable_remote(&e),
            }
        }

        let value = self.local.get(key.local_key())?;
        debug!("Local hit");

        if let Some(remote) = self.active_remote()
            && let Err(e) = remote.set(&remote_key, &value).await
        {
            self.disable_remote(&e);
        }
        Some(value)
    }

    /// Stores a raw value in every active tier.
    #[instrument(skip(self, key, value), fields(cache = %self.name, key = %key.local_key()))]
    pub async fn put(&self, key: &CacheKey, value: &str) -> CacheResult<()> {
        if let Some(remote) = self.active_remote()
            && let Err(e) = remote.set(&key.remote_key(), value).await
        {
            self.disable_remote(&e);
        }
        self.local.put(key.local_key(), value).await?;
        Ok(())
    }

    /// Looks up a structured value stored as JSON.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &CacheKey) -> CacheResult<Option<T>> {
        match self.get(key).await {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| CacheError::Decode {
                    key: key.local_key().to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Stores a structured value as JSON.
    pub async fn put_as<T: Serialize + ?Sized>(&self, key: &CacheKey, value: &T) -> CacheResult<()> {
        let raw = serde_json::to_string(value).map_err(CacheError::Encode)?;
        self.put(key, &raw).await
    }

    /// Persists the local tier.
    pub async fn flush(&self) -> CacheResult<()> {
        self.local.flush().await
    }

    /// Merges the local tier of `other` into this cache.
    pub async fn merge(&self, other: &Cache, force: bool) -> CacheResult<MergeReport> {
        if std::ptr::eq(self, other) {
            return Ok(MergeReport {
                applied: true,
                ..MergeReport::default()
            });
        }
        self.local.merge_from(&other.local, force).await
    }
}
