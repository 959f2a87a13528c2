// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Builds nutrition sources over the mock FoodData client and drains event channels
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors
#![allow(
    dead_code,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used
)]
//! Shared test utilities for `calorie_tuner`

use std::sync::{Arc, Once};

use calorie_tuner::cache::{DetailCache, InMemoryDetailCache};
use calorie_tuner::events::{EventBus, EventKind, TunerEvent};
use calorie_tuner::external::{FoodDataApi, MockUsdaClient};
use calorie_tuner::nutrition::{CalorieResolver, NutritionSource};
use calorie_tuner::resilience::{Resilience, RetryPolicy};
use tokio::sync::broadcast::Receiver;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        let _ = tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .try_init();
    });
}

/// Everything a nutrition test needs, with handles kept for assertions
pub struct NutritionFixture {
    pub api: Arc<MockUsdaClient>,
    pub cache: Arc<InMemoryDetailCache>,
    pub events: Arc<EventBus>,
    pub source: Arc<NutritionSource>,
}

impl NutritionFixture {
    pub fn resolver(&self) -> CalorieResolver {
        CalorieResolver::new(Arc::clone(&self.source))
    }
}

/// Retry policy without delays so tests stay fast
pub fn fast_resilience(events: &Arc<EventBus>, max_attempts: u32) -> Resilience {
    Resilience::new(RetryPolicy::immediate(max_attempts), Arc::clone(events))
}

/// Nutrition source over `api` with an in-memory cache and three immediate attempts
pub fn nutrition_fixture(api: MockUsdaClient) -> NutritionFixture {
    init_test_logging();
    let api = Arc::new(api);
    let cache = Arc::new(InMemoryDetailCache::new());
    let events = Arc::new(EventBus::default());
    let source = Arc::new(NutritionSource::new(
        Arc::clone(&api) as Arc<dyn FoodDataApi>,
        Arc::clone(&cache) as Arc<dyn DetailCache>,
        fast_resilience(&events, 3),
    ));
    NutritionFixture {
        api,
        cache,
        events,
        source,
    }
}

/// Everything currently buffered on `receiver`
pub fn drain_events(receiver: &mut Receiver<TunerEvent>) -> Vec<TunerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

/// Event kinds only, for compact assertions
pub fn kinds(events: &[TunerEvent]) -> Vec<EventKind> {
    events.iter().map(|e| e.kind.clone()).collect()
}
