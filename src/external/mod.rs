// ABOUTME: External API client modules (USDA FoodData Central)
// ABOUTME: Raw transport used by the cached, retried nutrition source
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

//! External API Clients

pub mod usda_client;

// Re-export commonly used types
pub use usda_client::{sample_food, FoodDataApi, MockUsdaClient, UsdaClient, UsdaClientConfig};
