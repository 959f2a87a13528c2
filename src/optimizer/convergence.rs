// ABOUTME: Bounded feedback loop driving a recipe's total calories toward a target
// ABOUTME: Extract once, then evaluate and adjust until converged, below target, or out of budget
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

//! Convergence loop
//!
//! ```text
//! Extracting -> Evaluating -> Converged | BelowTarget | Adjusting
//! Adjusting  -> Evaluating | Exhausted
//! ```
//!
//! Each adjustment is driven only by the signed delta of the latest
//! evaluation and the textual change log. The loop only ever cuts energy:
//! a total under the target ends the run even outside tolerance.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::adjustment::{validate_adjustment, RecipeAdjuster};
use super::extraction::RecipeExtractor;
use crate::constants::optimizer::{CALORIE_TOLERANCE_RATIO, MAX_ITERATIONS};
use crate::errors::{AppError, AppResult};
use crate::events::{EventBus, EventKind};
use crate::models::{
    normalize_lines, OptimizationOutcome, Recipe, RecipeEvaluation, TerminalState,
};
use crate::nutrition::CalorieResolver;

/// Title used when extraction finds none
const UNTITLED_RECIPE: &str = "Untitled recipe";

/// Iteration budget and tolerance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceSettings {
    /// Adjustment rounds allowed
    pub max_iterations: u32,
    /// Allowed relative deviation from the target
    pub tolerance_ratio: f64,
}

impl Default for ConvergenceSettings {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            tolerance_ratio: CALORIE_TOLERANCE_RATIO,
        }
    }
}

/// Where an evaluated total sits relative to the target
fn classify(total: f64, target: f64, tolerance_ratio: f64) -> Option<TerminalState> {
    if (total - target).abs() <= target * tolerance_ratio {
        Some(TerminalState::Converged)
    } else if total < target {
        Some(TerminalState::BelowTarget)
    } else {
        None
    }
}

/// Drives recipes toward a calorie target
pub struct ConvergenceLoop {
    resolver: Arc<CalorieResolver>,
    extractor: Arc<dyn RecipeExtractor>,
    adjuster: Arc<dyn RecipeAdjuster>,
    events: Arc<EventBus>,
    settings: ConvergenceSettings,
}

impl ConvergenceLoop {
    /// Create a loop with default settings
    #[must_use]
    pub fn new(
        resolver: Arc<CalorieResolver>,
        extractor: Arc<dyn RecipeExtractor>,
        adjuster: Arc<dyn RecipeAdjuster>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            resolver,
            extractor,
            adjuster,
            events,
            settings: ConvergenceSettings::default(),
        }
    }

    /// Override the iteration budget and tolerance
    #[must_use]
    pub const fn with_settings(mut self, settings: ConvergenceSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Active settings
    #[must_use]
    pub const fn settings(&self) -> ConvergenceSettings {
        self.settings
    }

    /// Optimize `recipe_text` toward `target_calories`
    ///
    /// Not converging is not an error: an exhausted run returns the last
    /// recipe with `warning` set. Ingredients with no matching food count
    /// 0 kcal and are also named in `warning`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for empty text or a non-positive target,
    /// `NoUsableIngredients` when extraction yields nothing usable,
    /// `MalformedOutput` when an adjustment has no usable lines, any
    /// nutrition lookup failure other than a missing food, and any
    /// unrecoverable extraction or adjustment failure
    pub async fn optimize(
        &self,
        recipe_text: &str,
        target_calories: f64,
    ) -> AppResult<OptimizationOutcome> {
        if recipe_text.trim().is_empty() {
            return Err(AppError::invalid_input("Recipe text cannot be empty"));
        }
        if !target_calories.is_finite() || target_calories <= 0.0 {
            return Err(AppError::invalid_input(format!(
                "Target calories must be a positive number, got {target_calories}"
            )));
        }

        let run_id = Uuid::new_v4();
        let mut recipe = self.extract(run_id, recipe_text).await?;
        let mut change_log: Vec<String> = Vec::new();
        let mut iteration = 0;

        loop {
            let evaluation = self
                .resolver
                .evaluate_recipe(&recipe.ingredients)
                .await
                .inspect_err(|e| {
                    warn!(%run_id, iteration, code = ?e.code, "Evaluation aborted: {e}");
                })?;
            let total = evaluation.total_calories;
            info!(
                %run_id,
                iteration,
                total,
                target = target_calories,
                unresolved = evaluation.unresolved().len(),
                "Evaluated recipe"
            );
            self.events.emit(EventKind::IterationEvaluated {
                run_id,
                iteration,
                total_calories: total,
                target_calories,
            });

            if let Some(state) = classify(total, target_calories, self.settings.tolerance_ratio) {
                return Ok(self.finish(
                    run_id,
                    recipe,
                    evaluation,
                    target_calories,
                    iteration,
                    change_log,
                    state,
                ));
            }

            if iteration >= self.settings.max_iterations {
                warn!(%run_id, iteration, total, "Iteration budget exhausted");
                return Ok(self.finish(
                    run_id,
                    recipe,
                    evaluation,
                    target_calories,
                    iteration,
                    change_log,
                    TerminalState::Exhausted,
                ));
            }

            let delta = total - target_calories;
            self.events.emit(EventKind::ToolInvoked {
                tool: "adjust_recipe".to_owned(),
                summary: format!("cut {delta:.0} kcal from '{}'", recipe.title),
            });
            let adjustment =
                validate_adjustment(self.adjuster.adjust(&recipe, delta, &change_log).await?)?;

            change_log.extend(adjustment.changes);
            recipe = Recipe {
                title: adjustment.title.unwrap_or(recipe.title),
                ingredients: adjustment.ingredients,
            };
            iteration += 1;
        }
    }

    async fn extract(&self, run_id: Uuid, recipe_text: &str) -> AppResult<Recipe> {
        self.events.emit(EventKind::ToolInvoked {
            tool: "extract_recipe".to_owned(),
            summary: format!("{} characters of recipe text", recipe_text.chars().count()),
        });
        let extracted = self.extractor.extract(recipe_text).await?;

        let ingredients = normalize_lines(extracted.ingredients);
        if ingredients.is_empty() {
            warn!(%run_id, "Extraction produced no usable ingredients");
            return Err(AppError::no_usable_ingredients());
        }
        let title = extracted
            .title
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED_RECIPE.to_owned());

        info!(%run_id, title = %title, ingredients = ingredients.len(), "Extracted recipe");
        Ok(Recipe { title, ingredients })
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        run_id: Uuid,
        recipe: Recipe,
        evaluation: RecipeEvaluation,
        target_calories: f64,
        iterations: u32,
        change_log: Vec<String>,
        state: TerminalState,
    ) -> OptimizationOutcome {
        let mut notes = Vec::new();
        if state == TerminalState::Exhausted {
            notes.push(format!(
                "Did not converge within {iterations} adjustments; total is {:.0} kcal against a target of {target_calories:.0} kcal",
                evaluation.total_calories
            ));
        }
        let unresolved = evaluation.unresolved();
        if !unresolved.is_empty() {
            let lines: Vec<String> = unresolved.iter().map(ToString::to_string).collect();
            notes.push(format!(
                "No food found for {}, counted as 0 kcal",
                lines.join(", ")
            ));
        }
        let warning = (!notes.is_empty()).then(|| notes.join("; "));
        self.events.emit(EventKind::OptimizationFinished {
            run_id,
            state,
            iterations,
            total_calories: evaluation.total_calories,
        });
        info!(%run_id, ?state, iterations, "Optimization finished");

        OptimizationOutcome {
            run_id,
            recipe,
            total_calories: evaluation.total_calories,
            target_calories,
            iterations,
            change_log,
            state,
            warning,
            breakdown: evaluation.resolutions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_states() {
        assert_eq!(classify(1_040.0, 1_000.0, 0.05), Some(TerminalState::Converged));
        assert_eq!(classify(950.0, 1_000.0, 0.05), Some(TerminalState::Converged));
        assert_eq!(classify(600.0, 1_000.0, 0.05), Some(TerminalState::BelowTarget));
        assert_eq!(classify(1_051.0, 1_000.0, 0.05), None);
    }
}
