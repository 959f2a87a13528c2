// ABOUTME: Recipe optimization: extraction, adjustment, and the convergence loop
// ABOUTME: Extraction and adjustment are traits so the loop runs against fakes in tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

/// Recipe adjustment capability
pub mod adjustment;
/// The convergence loop
pub mod convergence;
/// Recipe extraction capability
pub mod extraction;
mod payload;

pub use adjustment::{validate_adjustment, LlmRecipeAdjuster, RecipeAdjuster};
pub use convergence::{ConvergenceLoop, ConvergenceSettings};
pub use extraction::{ExtractedRecipe, LlmRecipeExtractor, RecipeExtractor};
pub use payload::parse_json_reply;
