// ABOUTME: Persisted food detail cache abstraction with insert-or-replace semantics
// ABOUTME: No eviction or TTL; a cached detail is a permanent, immutable snapshot
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

//! Detail cache
//!
//! Maps a canonical food id to its full [`FoodDetail`]. A `put` for an id that
//! is already present replaces the stored record wholesale; fields are never
//! merged. Entries never expire.
//!
//! Two backends implement [`DetailCache`]:
//! - [`sqlite::SqliteDetailCache`]: durable, one row per id
//! - [`memory::InMemoryDetailCache`]: process-local, for tests and ephemeral runs

/// In-memory detail cache
pub mod memory;

/// `SQLite`-backed detail cache
pub mod sqlite;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::errors::AppResult;
use crate::models::{FoodDetail, FoodId};

pub use memory::InMemoryDetailCache;
pub use sqlite::SqliteDetailCache;

/// Insert-or-replace store of food detail snapshots
#[async_trait]
pub trait DetailCache: Send + Sync {
    /// Fetch the stored detail for `id`, if any
    async fn get(&self, id: FoodId) -> AppResult<Option<FoodDetail>>;

    /// Store `detail` under `id`, replacing any previous record
    async fn put(&self, id: FoodId, detail: &FoodDetail) -> AppResult<()>;

    /// Number of cached records
    async fn len(&self) -> AppResult<usize>;

    /// Whether the cache holds no records
    async fn is_empty(&self) -> AppResult<bool> {
        Ok(self.len().await? == 0)
    }
}

/// Open the cache backend named by `url`
///
/// `memory://` selects the in-memory backend; anything else is handed to
/// `SQLite` (including `sqlite::memory:`).
///
/// # Errors
///
/// Returns a database error if the `SQLite` backend cannot be opened
pub async fn open_detail_cache(url: &str) -> AppResult<Arc<dyn DetailCache>> {
    if url == "memory://" {
        info!("Using in-memory detail cache");
        return Ok(Arc::new(InMemoryDetailCache::new()));
    }
    let cache = SqliteDetailCache::connect(url).await?;
    info!(url, "Using SQLite detail cache");
    Ok(Arc::new(cache))
}
