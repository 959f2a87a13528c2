// ABOUTME: In-memory detail cache backed by a concurrent hash map
// ABOUTME: Same insert-or-replace contract as the SQLite backend, without persistence
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

use async_trait::async_trait;
use dashmap::DashMap;

use super::DetailCache;
use crate::errors::AppResult;
use crate::models::{FoodDetail, FoodId};

/// Process-local detail cache
///
/// Writers racing on one id resolve as last-writer-wins; each write replaces
/// the whole record.
#[derive(Debug, Default)]
pub struct InMemoryDetailCache {
    store: DashMap<FoodId, FoodDetail>,
}

impl InMemoryDetailCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DetailCache for InMemoryDetailCache {
    async fn get(&self, id: FoodId) -> AppResult<Option<FoodDetail>> {
        Ok(self.store.get(&id).map(|entry| entry.value().clone()))
    }

    async fn put(&self, id: FoodId, detail: &FoodDetail) -> AppResult<()> {
        self.store.insert(id, detail.clone());
        Ok(())
    }

    async fn len(&self) -> AppResult<usize> {
        Ok(self.store.len())
    }
}
