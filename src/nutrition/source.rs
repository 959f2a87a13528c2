// ABOUTME: Nutrition source combining the FoodData API, detail cache, and retries
// ABOUTME: Detail fetches are read-through/write-through; a cache hit never hits the network
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::cache::DetailCache;
use crate::errors::AppResult;
use crate::external::FoodDataApi;
use crate::models::{DataType, FoodDetail, FoodId, FoodSearchHit, FoodSearchRequest};
use crate::resilience::Resilience;

/// Searches and detail fetches against the nutrition database
pub struct NutritionSource {
    api: Arc<dyn FoodDataApi>,
    cache: Arc<dyn DetailCache>,
    resilience: Resilience,
}

impl NutritionSource {
    /// Create a nutrition source
    #[must_use]
    pub fn new(
        api: Arc<dyn FoodDataApi>,
        cache: Arc<dyn DetailCache>,
        resilience: Resilience,
    ) -> Self {
        Self {
            api,
            cache,
            resilience,
        }
    }

    /// The detail cache this source reads through
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn DetailCache> {
        &self.cache
    }

    /// Search the nutrition database
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty query or a limit outside `1..=200`,
    /// and `UpstreamError` (after retries) if the API answers with a non-success status
    pub async fn search(
        &self,
        query: &str,
        limit: u32,
        data_type: Option<DataType>,
    ) -> AppResult<Vec<FoodSearchHit>> {
        let request = FoodSearchRequest::new(query, limit, data_type)?;

        self.resilience
            .run("food_search", || self.api.search_foods(&request))
            .await
            .inspect_err(|e| {
                error!(
                    query = %request.query,
                    status = e.upstream_status(),
                    code = ?e.code,
                    "Food search failed: {e}"
                );
            })
    }

    /// Fetch the full detail record for `id`
    ///
    /// Served from the cache when present. On a miss the record is fetched,
    /// stored, and returned. Cache read or write failures are logged and do
    /// not fail the lookup.
    ///
    /// # Errors
    ///
    /// Returns the upstream error (after retries) if the record has to be
    /// fetched and the fetch fails
    pub async fn get_detail(&self, id: FoodId) -> AppResult<FoodDetail> {
        match self.cache.get(id).await {
            Ok(Some(detail)) => {
                debug!(fdc_id = id, "Serving food detail from cache");
                return Ok(detail);
            }
            Ok(None) => {}
            Err(e) => warn!(fdc_id = id, "Detail cache read failed, fetching: {e}"),
        }

        let detail = self
            .resilience
            .run("food_detail", || self.api.fetch_food(id))
            .await
            .inspect_err(|e| {
                error!(
                    fdc_id = id,
                    status = e.upstream_status(),
                    "Food detail fetch failed: {e}"
                );
            })?;

        if let Err(e) = self.cache.put(id, &detail).await {
            warn!(fdc_id = id, "Failed to cache food detail: {e}");
        }
        Ok(detail)
    }
}
