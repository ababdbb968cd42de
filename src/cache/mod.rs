//! Content-addressed cache for oracle answers.
//!
//! Each [`Cache`] is a local JSON file, optionally fronted by a shared Redis
//! tier. [`CacheManager`] maps `(kind, model, seed)` to one file per process.

pub mod error;
pub mod key;
pub mod local;
pub mod manager;
pub mod remote;
pub mod tiered;


pub use error::{CacheError, CacheResult};
pub use key::{CacheKey, CacheMode};
pub use local::{LocalCache, MergeReport};
pub use manager::{CacheManager, sanitize_file_name};
#[cfg(any(test, feature = "mock"))]
pub use remote::MemoryRemoteStore;
pub use remote::{RedisStore, RemoteStore};
pub use tiered::Cache;
