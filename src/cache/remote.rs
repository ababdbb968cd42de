//! Optional shared key/value tier (Redis).

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::info;

use super::error::{CacheError, CacheResult};

/// Hash field holding the cached value.
pub const FIELD_DATA: &str = "data";
/// Hash field holding the write time (RFC 3339).
pub const FIELD_TIMESTAMP: &str = "timestamp";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A shared store consulted before the local file.
///
/// Failures are reported as [`CacheError::Remote`]; the caller decides whether
/// to keep using the store.
#[async_trait]
pub trait RemoteStore: Send + Sync + fmt::Debug {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> CacheResult<()>;
}

/// Redis-backed remote tier. Each key is a hash with `data` and `timestamp`.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    url: String,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("url", &self.url)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

fn remote_err(context: &str, e: impl fmt::Display) -> CacheError {
    CacheError::Remote {
        message: format!("{context}: {e}"),
    }
}

impl RedisStore {
    /// Connects and verifies the server answers `PING`.
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = Client::open(url).map_err(|e| remote_err("invalid Redis URL", e))?;

        let connection = tokio::time::timeout(CONNECT_TIMEOUT, ConnectionManager::new(client))
            .await
            .map_err(|_| remote_err("Redis connect", "timed out"))?
            .map_err(|e| remote_err("Redis connect", e))?;

        let mut conn = connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| remote_err("Redis ping", e))?;

        info!(url = %url, "Connected to remote cache");
        Ok(Self {
            connection,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl RemoteStore for RedisStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection.clone();
        conn.hget(key, FIELD_DATA)
            .await
            .map_err(|e| remote_err("Redis HGET", e))
    }

    async fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let timestamp = chrono::Utc::now().to_rfc3339();
        let _: () = conn
            .hset_multiple(key, &[(FIELD_DATA, value), (FIELD_TIMESTAMP, timestamp.as_str())])
            .await
            .map_err(|e| remote_err("Redis HSET", e))?;
        Ok(())
    }
}

#[cfg(any(test, feature = "mock"))]
pub use mock::MemoryRemoteStore;

#[cfg(any(test, feature = "mock"))]
mod mock {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::RwLock;

    use super::RemoteStore;
    use crate::cache::error::{CacheError, CacheResult};

    /// In-memory remote tier with failure injection.
    #[derive(Debug)]
    pub struct MemoryRemoteStore {
        entries: RwLock<HashMap<String, String>>,
        available: AtomicBool,
        gets: AtomicUsize,
        sets: AtomicUsize,
    }

    impl Default for MemoryRemoteStore {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MemoryRemoteStore {
        pub fn new() -> Self {
            Self {
                entries: RwLock::new(HashMap::new()),
                available: AtomicBool::new(true),
                gets: AtomicUsize::new(0),
                sets: AtomicUsize::new(0),
            }
        }

        /// When `false`, every call fails as if the server were unreachable.
        pub fn set_available(&self, available: bool) {
            self.available.store(available, Ordering::Release);
        }

        pub fn insert(&self, key: &str, value: &str) {
            self.entries
                .write()
                .insert(key.to_string(), value.to_string());
        }

        pub fn value(&self, key: &str) -> Option<String> {
            self.entries.read().get(key).cloned()
        }

        pub fn len(&self) -> usize {
            self.entries.read().len()
        }

        pub fn is_empty(&self) -> bool {
            self.entries.read().is_empty()
        }

        pub fn get_calls(&self) -> usize {
            self.gets.load(Ordering::Acquire)
        }

        pub fn set_calls(&self) -> usize {
            self.sets.load(Ordering::Acquire)
        }

        fn check(&self) -> CacheResult<()> {
            if self.available.load(Ordering::Acquire) {
                Ok(())
            } else {
                Err(CacheError::Remote {
                    message: "connection refused".to_string(),
                })
            }
        }
    }

    #[async_trait]
    impl RemoteStore for MemoryRemoteStore {
        async fn get(&self, key: &str) -> CacheResult<Option<String>> {
            self.gets.fetch_add(1, Ordering::AcqRel);
            self.check()?;
            Ok(self.value(key))
        }

        async fn set(&self, key: &str, value: &str) -> CacheResult<()> {
            self.sets.fetch_add(1, Ordering::AcqRel);
            self.check()?;
            self.insert(key, value);
            Ok(())
        }
    }
}
