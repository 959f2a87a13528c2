// ABOUTME: Public operation surface: search, calories, and optimize
// ABOUTME: Wires explicit dependency objects once; outer layers (RPC, CLI) call through here
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

//! Calorie service
//!
//! ```rust,no_run
//! use calorie_tuner::config::TunerConfig;
//! use calorie_tuner::models::FoodRef;
//! use calorie_tuner::service::CalorieService;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TunerConfig::from_env()?;
//! let service = CalorieService::from_config(&config).await?;
//! let result = service
//!     .calories(200.0, "g", &FoodRef::Name("apple".to_owned()))
//!     .await?;
//! println!("{:.0} kcal", result.calories);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::info;

use crate::cache::{open_detail_cache, DetailCache};
use crate::config::TunerConfig;
use crate::errors::{AppError, AppResult};
use crate::events::EventBus;
use crate::external::{FoodDataApi, UsdaClient};
use crate::llm::{LlmProvider, OpenAiCompatibleProvider};
use crate::models::{CalorieResult, DataType, FoodRef, FoodSearchHit, OptimizationOutcome};
use crate::nutrition::{search_variants, CalorieResolver, NutritionSource, SearchAggregator};
use crate::optimizer::{
    ConvergenceLoop, ConvergenceSettings, LlmRecipeAdjuster, LlmRecipeExtractor,
};
use crate::resilience::{Resilience, RetryPolicy};

/// Everything the service is built from
pub struct ServiceComponents {
    /// Nutrition database transport
    pub food_data: Arc<dyn FoodDataApi>,
    /// Detail cache
    pub cache: Arc<dyn DetailCache>,
    /// Completion service
    pub completion: Arc<dyn LlmProvider>,
    /// Retry policy shared by nutrition and completion calls
    pub retry_policy: RetryPolicy,
    /// Convergence loop settings
    pub convergence: ConvergenceSettings,
    /// Event channel
    pub events: Arc<EventBus>,
}

/// Search, calorie lookup, and recipe optimization
pub struct CalorieService {
    events: Arc<EventBus>,
    source: Arc<NutritionSource>,
    aggregator: SearchAggregator,
    resolver: Arc<CalorieResolver>,
    optimizer: ConvergenceLoop,
}

impl CalorieService {
    /// Build the live service: FoodData Central, the configured cache, and an
    /// `OpenAI`-compatible completion endpoint
    ///
    /// Events are forwarded to `tracing` by an observer task for the life of
    /// the service.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client or the detail cache cannot be created
    pub async fn from_config(config: &TunerConfig) -> AppResult<Self> {
        let food_data: Arc<dyn FoodDataApi> = Arc::new(UsdaClient::new(config.food_data.clone())?);
        let cache = open_detail_cache(&config.detail_cache_url).await?;
        let completion: Arc<dyn LlmProvider> = Arc::new(OpenAiCompatibleProvider::new(
            config.completion_client_config(),
        )?);

        let events = Arc::new(EventBus::new(config.event_channel_capacity));
        // detached; exits once the service and its bus are dropped
        drop(events.spawn_log_observer());

        info!(
            cache = %config.detail_cache_url,
            model = completion.default_model(),
            "Calorie service ready"
        );

        Ok(Self::new(ServiceComponents {
            food_data,
            cache,
            completion,
            retry_policy: config.retry_policy(),
            convergence: config.convergence_settings(),
            events,
        }))
    }

    /// Build the service from explicit components
    #[must_use]
    pub fn new(components: ServiceComponents) -> Self {
        let ServiceComponents {
            food_data,
            cache,
            completion,
            retry_policy,
            convergence,
            events,
        } = components;

        let resilience = Resilience::new(retry_policy, Arc::clone(&events));
        let source = Arc::new(NutritionSource::new(food_data, cache, resilience.clone()));
        let resolver = Arc::new(CalorieResolver::new(Arc::clone(&source)));
        let optimizer = ConvergenceLoop::new(
            Arc::clone(&resolver),
            Arc::new(LlmRecipeExtractor::new(
                Arc::clone(&completion),
                resilience.clone(),
            )),
            Arc::new(LlmRecipeAdjuster::new(completion, resilience)),
            Arc::clone(&events),
        )
        .with_settings(convergence);

        Self {
            events,
            aggregator: SearchAggregator::new(Arc::clone(&source)),
            source,
            resolver,
            optimizer,
        }
    }

    /// Event channel for observers
    #[must_use]
    pub const fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Cached, retried nutrition source
    #[must_use]
    pub const fn source(&self) -> &Arc<NutritionSource> {
        &self.source
    }

    /// Search the nutrition database for `query` and its variants
    ///
    /// Each variant is searched with `limit`; the merged, deduplicated hits
    /// are cut back to `limit`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty query or bad limit, or the first
    /// failing variant's error
    pub async fn search(
        &self,
        query: &str,
        limit: u32,
        data_type: Option<DataType>,
    ) -> AppResult<Vec<FoodSearchHit>> {
        let variants = search_variants(query);
        if variants.is_empty() {
            return Err(AppError::invalid_input("Search query cannot be empty"));
        }
        let mut hits = self
            .aggregator
            .multi_search(&variants, limit, data_type)
            .await?;
        hits.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(hits)
    }

    /// Calories for `quantity` `unit` of a food given by id or name
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when a name has no match, `InvalidInput` for
    /// a bad quantity, or the upstream failure
    pub async fn calories(
        &self,
        quantity: f64,
        unit: &str,
        food: &FoodRef,
    ) -> AppResult<CalorieResult> {
        self.resolver.resolve_ref(quantity, unit, food).await
    }

    /// Tune `recipe_text` toward `target_calories`
    ///
    /// # Errors
    ///
    /// See [`ConvergenceLoop::optimize`]
    pub async fn optimize(
        &self,
        recipe_text: &str,
        target_calories: f64,
    ) -> AppResult<OptimizationOutcome> {
        self.optimizer.optimize(recipe_text, target_calories).await
    }
}
