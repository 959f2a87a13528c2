// ABOUTME: Concurrent multi-query food search with first-seen deduplication by id
// ABOUTME: All-or-nothing: one failed query fails the whole aggregate call
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::debug;

use super::NutritionSource;
use crate::errors::AppResult;
use crate::models::{DataType, FoodSearchHit};

/// Fans a set of query variants out to the nutrition source
///
/// Unlike [`super::CalorieResolver::resolve_batch`], which isolates failures
/// per ingredient, this join is all-or-nothing.
pub struct SearchAggregator {
    source: Arc<NutritionSource>,
}

impl SearchAggregator {
    /// Create an aggregator over `source`
    #[must_use]
    pub const fn new(source: Arc<NutritionSource>) -> Self {
        Self { source }
    }

    /// Run one search per query concurrently and merge the results
    ///
    /// Every query runs to completion before the result is decided. Hits are
    /// deduplicated by id, keeping the first occurrence when walking the
    /// queries in submission order.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failed query in submission order
    pub async fn multi_search<S: AsRef<str> + Sync>(
        &self,
        queries: &[S],
        limit: u32,
        data_type: Option<DataType>,
    ) -> AppResult<Vec<FoodSearchHit>> {
        let results = join_all(
            queries
                .iter()
                .map(|q| self.source.search(q.as_ref(), limit, data_type)),
        )
        .await;

        let hit_lists = results.into_iter().collect::<AppResult<Vec<_>>>()?;
        let merged = dedupe_hits(hit_lists);
        debug!(
            queries = queries.len(),
            hits = merged.len(),
            "Multi-query search completed"
        );
        Ok(merged)
    }
}

/// Flatten hit lists, keeping the first hit for each id
#[must_use]
pub fn dedupe_hits<I>(hit_lists: I) -> Vec<FoodSearchHit>
where
    I: IntoIterator<Item = Vec<FoodSearchHit>>,
{
    let mut seen = HashSet::new();
    hit_lists
        .into_iter()
        .flatten()
        .filter(|hit| seen.insert(hit.id))
        .collect()
}

/// Singular form of the last word, for the common English plural endings
fn singularize(term: &str) -> String {
    let lower = term.to_lowercase();
    if let Some(stem) = lower.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{stem}y");
        }
    }
    for suffix in ["ches", "shes", "xes", "sses", "oes"] {
        if lower.ends_with(suffix) {
            return lower[..lower.len() - 2].to_owned();
        }
    }
    match lower.strip_suffix('s') {
        Some(stem) if !stem.is_empty() && !stem.ends_with(['s', 'u']) => stem.to_owned(),
        _ => lower,
    }
}

/// Query variants for one free-text term
///
/// The term itself, its singular form, and the singular with ", raw"
/// appended, deduplicated case-insensitively in that order. An empty term
/// yields no variants.
#[must_use]
pub fn search_variants(query: &str) -> Vec<String> {
    let term = query.trim();
    if term.is_empty() {
        return Vec::new();
    }
    let singular = singularize(term);
    let raw = format!("{singular}, raw");

    let mut seen = HashSet::new();
    [term.to_owned(), singular, raw]
        .into_iter()
        .filter(|v| seen.insert(v.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: u64, description: &str) -> FoodSearchHit {
        FoodSearchHit {
            id,
            description: description.to_owned(),
            data_type: "Foundation".to_owned(),
            food_category: None,
            brand_owner: None,
            publication_date: None,
        }
    }

    #[test]
    fn test_dedupe_keeps_first_seen() {
        let merged = dedupe_hits(vec![
            vec![hit(7, "first"), hit(3, "three")],
            vec![hit(9, "nine"), hit(7, "second")],
        ]);
        let ids: Vec<u64> = merged.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![7, 3, 9]);
        assert_eq!(merged[0].description, "first");
    }

    #[test]
    fn test_search_variants() {
        assert_eq!(
            search_variants("Apples"),
            vec!["Apples", "apple", "apple, raw"]
        );
        assert_eq!(search_variants("berries"), vec!["berries", "berry", "berry, raw"]);
        assert_eq!(search_variants("rice"), vec!["rice", "rice, raw"]);
        assert_eq!(search_variants("tomatoes")[1], "tomato");
        assert_eq!(search_variants("hummus"), vec!["hummus", "hummus, raw"]);
        assert!(search_variants("   ").is_empty());
    }
}
