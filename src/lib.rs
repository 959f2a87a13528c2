// ABOUTME: Main library entry point for the calorie tuner
// ABOUTME: Resolves ingredients against FoodData Central and tunes recipes toward a calorie target
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

#![deny(unsafe_code)]

//! # Calorie Tuner
//!
//! Resolves free-text ingredients against the USDA `FoodData` Central
//! database, converts quantities into kilocalories, and runs a bounded
//! feedback loop that edits a recipe until its total lands near a target.
//!
//! ## Architecture
//!
//! Leaves first:
//! - **`nutrition::conversion`**: (quantity, unit) to grams, tiered, never fails
//! - **`cache`**: permanent insert-or-replace store of food detail records
//! - **`nutrition::source`**: search and read-through detail fetches
//! - **`nutrition::search`**: concurrent multi-query search, all-or-nothing
//! - **`nutrition::resolver`**: ingredient to kilocalories, batch continue-on-error
//! - **`optimizer`**: extraction, adjustment, and the convergence loop
//! - **`resilience`**: retries with exponential backoff and event emission
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use calorie_tuner::config::TunerConfig;
//! use calorie_tuner::errors::AppResult;
//! use calorie_tuner::service::CalorieService;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = TunerConfig::from_env()?;
//!     let service = CalorieService::from_config(&config).await?;
//!     let outcome = service
//!         .optimize("2 slices white bread, 30 g butter, 1 medium apple", 400.0)
//!         .await?;
//!     println!("{:?}: {:.0} kcal", outcome.state, outcome.total_calories);
//!     Ok(())
//! }
//! ```

/// Food detail cache backends
pub mod cache;

/// Environment configuration
pub mod config;

/// Constants shared across the workspace
pub mod constants;

/// Error types
pub mod errors;

/// Structured event channel
pub mod events;

/// External API clients
pub mod external;

/// Completion service abstraction
pub mod llm;

/// Logging setup
pub mod logging;

/// Domain models
pub mod models;

/// Nutrition lookup pipeline
pub mod nutrition;

/// Recipe optimization
pub mod optimizer;

/// Retry and backoff
pub mod resilience;

/// Public operation surface
pub mod service;
