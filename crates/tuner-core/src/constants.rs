// ABOUTME: Workspace-wide constants for nutrition lookups, retries, and tuning
// ABOUTME: Groups defaults by domain so configuration and tests share one source
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

/// Nutrition database constants
pub mod nutrition {
    /// Canonical `FoodData` Central nutrient id for energy in kcal
    pub const ENERGY_NUTRIENT_ID: u32 = 1008;
    /// Unit name an energy nutrient must carry to be used as a fallback
    pub const ENERGY_UNIT: &str = "kcal";
    /// Name prefix an energy nutrient must carry to be used as a fallback
    pub const ENERGY_NAME_PREFIX: &str = "Energy";
    /// Default `FoodData` Central REST endpoint
    pub const DEFAULT_FDC_BASE_URL: &str = "https://api.nal.usda.gov/fdc/v1";
    /// Largest page size the search endpoint accepts
    pub const MAX_SEARCH_PAGE_SIZE: u32 = 200;
    /// Page size used when resolving an ingredient by name
    pub const RESOLVE_SEARCH_LIMIT: u32 = 1;
}

/// Completion service defaults
pub mod completion {
    /// Default `OpenAI`-compatible endpoint
    pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
    /// Default model
    pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
    /// Whole-request timeout
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
}

/// Unit conversion constants
pub mod units {
    /// Grams per gram
    pub const GRAMS_PER_GRAM: f64 = 1.0;
    /// Grams per kilogram
    pub const GRAMS_PER_KG: f64 = 1000.0;
    /// Grams per avoirdupois ounce
    pub const GRAMS_PER_OZ: f64 = 28.3495;
    /// Grams per avoirdupois pound
    pub const GRAMS_PER_LB: f64 = 453.592;
    /// Mass assumed per unit when nothing else resolves the quantity
    pub const FALLBACK_GRAMS_PER_UNIT: f64 = 100.0;
}

/// Retry and backoff defaults
pub mod retry {
    /// Maximum attempts per call, including the first
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    /// Delay before the second attempt
    pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
    /// Upper bound for any single backoff delay
    pub const DEFAULT_MAX_DELAY_MS: u64 = 60_000;
}

/// Convergence loop defaults
pub mod optimizer {
    /// Adjustment rounds allowed before the loop gives up
    pub const MAX_ITERATIONS: u32 = 8;
    /// Allowed relative deviation from the target
    pub const CALORIE_TOLERANCE_RATIO: f64 = 0.05;
}

/// Event channel defaults
pub mod events {
    /// Buffered events per subscriber before the oldest are dropped
    pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
}

/// Service names used in logs and error messages
pub mod service_names {
    /// The nutrition database
    pub const FOOD_DATA_CENTRAL: &str = "FoodData Central";
    /// The completion service
    pub const COMPLETION_SERVICE: &str = "completion service";
    /// Service name for structured logging
    pub const CALORIE_TUNER: &str = "calorie-tuner";
}
