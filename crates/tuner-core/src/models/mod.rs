// ABOUTME: Domain models for food records, ingredient lines, and tuning results
// ABOUTME: Shared by the nutrition client, calorie resolver, and convergence loop
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

//! Core data models
//!
//! - [`food`]: search hits and detail records as returned by the nutrition database
//! - [`recipe`]: ingredient lines and recipes exchanged with the extraction capabilities
//! - [`calories`]: per-ingredient energy results and optimization outcomes

/// Food search hits, detail records, nutrients, and portions
pub mod food;

/// Ingredient lines and recipes
pub mod recipe;

/// Calorie results and optimization outcomes
pub mod calories;

pub use calories::{
    CalorieMeta, CalorieResult, FoodRef, GramSource, IngredientOutcome, IngredientResolution,
    OptimizationOutcome, RecipeEvaluation, TerminalState,
};
pub use food::{
    DataType, FoodDetail, FoodId, FoodNutrient, FoodPortion, FoodSearchHit, FoodSearchRequest,
};
pub use recipe::{normalize_lines, IngredientLine, Recipe, RecipeAdjustment};
