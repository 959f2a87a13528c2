// ABOUTME: Nutrition lookup pipeline: unit conversion, cached source, search fan-out, calorie resolution
// ABOUTME: Components take explicit dependencies; nothing here holds global state
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

//! Nutrition lookup
//!
//! Layers, leaves first:
//! - [`conversion`]: (quantity, unit) to grams, never fails
//! - [`source`]: searches and read-through detail fetches, wrapped in retries
//! - [`search`]: concurrent multi-query search, all-or-nothing
//! - [`resolver`]: ingredient to kilocalories, with a continue-on-error batch mode

/// Quantity-to-mass conversion
pub mod conversion;
/// Calorie resolution for single ingredients and batches
pub mod resolver;
/// Multi-query search aggregation
pub mod search;
/// Cached, retried access to the nutrition database
pub mod source;

pub use conversion::{grams_for, normalize_unit, GramEstimate};
pub use resolver::CalorieResolver;
pub use search::{dedupe_hits, search_variants, SearchAggregator};
pub use source::NutritionSource;
