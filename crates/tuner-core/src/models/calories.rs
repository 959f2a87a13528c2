// ABOUTME: Calorie result, batch resolution, and optimization outcome types
// ABOUTME: Records which conversion tier produced each mass for explainability
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::food::FoodId;
use super::recipe::{IngredientLine, Recipe};
use crate::errors::{AppError, ErrorCode};

/// Conversion tier that produced a gram estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GramSource {
    /// Fixed weight table (g, kg, oz, lb)
    #[serde(rename = "weight")]
    Weight,
    /// Food-specific portion weight
    #[serde(rename = "portion")]
    Portion,
    /// Empty unit; the quantity was taken as grams
    #[serde(rename = "assumed_grams")]
    AssumedGrams,
    /// Unrecognized unit; each unit was taken as 100 g
    #[serde(rename = "fallback_100g")]
    Fallback100g,
    /// No mass could be derived (non-finite or negative quantity)
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl GramSource {
    /// Tag as rendered in results
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weight => "weight",
            Self::Portion => "portion",
            Self::AssumedGrams => "assumed_grams",
            Self::Fallback100g => "fallback_100g",
            Self::Unknown => "unknown",
        }
    }
}

/// How a calorie figure was derived
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalorieMeta {
    /// Food the ingredient resolved to
    pub id: FoodId,
    /// Description of that food
    pub description: String,
    /// Energy density used; 0 when unknown
    pub kcal_per_100g: f64,
    /// Mass the quantity converted to
    pub grams: f64,
    /// Tier that produced `grams`
    pub gram_source: GramSource,
    /// False when the record had no energy nutrient and `kcal_per_100g` defaulted to 0
    pub energy_known: bool,
}

/// Energy contribution of one ingredient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalorieResult {
    /// Kilocalories contributed
    pub calories: f64,
    /// Derivation details
    pub meta: CalorieMeta,
}

/// How the caller identifies the food to resolve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodRef {
    /// Canonical food id
    Id(FoodId),
    /// Free-text name, searched in Foundation data
    Name(String),
}

/// Outcome of one ingredient inside a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngredientOutcome {
    /// The ingredient resolved
    Resolved(CalorieResult),
    /// The ingredient failed; the batch continued
    Failed {
        /// Error class
        code: ErrorCode,
        /// Error message
        message: String,
    },
}

impl IngredientOutcome {
    /// Record a failure
    #[must_use]
    pub fn failed(error: &AppError) -> Self {
        Self::Failed {
            code: error.code,
            message: error.message.clone(),
        }
    }

    /// Calories contributed; failures contribute nothing
    #[must_use]
    pub fn calories(&self) -> f64 {
        match self {
            Self::Resolved(result) => result.calories,
            Self::Failed { .. } => 0.0,
        }
    }
}

/// One line of a batch and what became of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientResolution {
    /// The input line
    pub line: IngredientLine,
    /// Its outcome
    pub outcome: IngredientOutcome,
}

/// Totals for one evaluation of a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeEvaluation {
    /// Sum of all resolved contributions
    pub total_calories: f64,
    /// Per-line results in recipe order
    pub resolutions: Vec<IngredientResolution>,
}

impl RecipeEvaluation {
    /// Build an evaluation, summing contributions
    #[must_use]
    pub fn from_resolutions(resolutions: Vec<IngredientResolution>) -> Self {
        let total_calories = resolutions.iter().map(|r| r.outcome.calories()).sum();
        Self {
            total_calories,
            resolutions,
        }
    }

    /// Lines that failed to resolve
    #[must_use]
    pub fn unresolved(&self) -> Vec<&IngredientLine> {
        self.resolutions
            .iter()
            .filter(|r| matches!(r.outcome, IngredientOutcome::Failed { .. }))
            .map(|r| &r.line)
            .collect()
    }
}

/// Terminal state of a convergence run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    /// Total landed within tolerance of the target
    Converged,
    /// Total is below the target; the loop never adds energy
    BelowTarget,
    /// The iteration budget ran out
    Exhausted,
}

/// Result of a convergence run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    /// Identifier carried on this run's events
    pub run_id: Uuid,
    /// Last evaluated recipe
    pub recipe: Recipe,
    /// Its total calories
    pub total_calories: f64,
    /// Caller's target
    pub target_calories: f64,
    /// Adjustment rounds performed
    pub iterations: u32,
    /// Every change the adjustment capability reported, in order
    pub change_log: Vec<String>,
    /// How the run ended
    pub state: TerminalState,
    /// Set when the run ended without converging or some ingredients had no food match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Per-ingredient results of the last evaluation
    pub breakdown: Vec<IngredientResolution>,
}
