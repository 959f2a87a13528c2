// ABOUTME: Resolves ingredient lines to calorie contributions via search, detail, and unit conversion
// ABOUTME: Single lookups fail fast; batch resolution isolates failures per ingredient
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, warn};

use super::conversion::grams_for;
use super::NutritionSource;
use crate::constants::nutrition::RESOLVE_SEARCH_LIMIT;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::{
    CalorieMeta, CalorieResult, DataType, FoodId, FoodRef, IngredientLine, IngredientOutcome,
    IngredientResolution, RecipeEvaluation,
};

/// Turns (quantity, unit, food) into kilocalories
pub struct CalorieResolver {
    source: Arc<NutritionSource>,
}

impl CalorieResolver {
    /// Create a resolver over `source`
    #[must_use]
    pub const fn new(source: Arc<NutritionSource>) -> Self {
        Self { source }
    }

    fn check_quantity(quantity: f64) -> AppResult<()> {
        if quantity.is_finite() && quantity >= 0.0 {
            Ok(())
        } else {
            Err(AppError::invalid_input(format!(
                "Quantity must be a non-negative number, got {quantity}"
            )))
        }
    }

    /// Resolve a food by name
    ///
    /// Takes the top Foundation hit for `name`.
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when the search has no hit, `InvalidInput`
    /// for a bad quantity or empty name, and any upstream failure
    pub async fn resolve(&self, quantity: f64, unit: &str, name: &str) -> AppResult<CalorieResult> {
        Self::check_quantity(quantity)?;

        let hits = self
            .source
            .search(name, RESOLVE_SEARCH_LIMIT, Some(DataType::Foundation))
            .await?;
        let hit = hits
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found(format!("Food '{}'", name.trim())))?;

        debug!(name, fdc_id = hit.id, description = %hit.description, "Matched ingredient");
        self.resolve_by_id(quantity, unit, hit.id).await
    }

    /// Resolve a food by its canonical id
    ///
    /// A record without an energy nutrient yields 0 kcal with
    /// `energy_known` cleared.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a bad quantity and any detail fetch failure
    pub async fn resolve_by_id(
        &self,
        quantity: f64,
        unit: &str,
        id: FoodId,
    ) -> AppResult<CalorieResult> {
        Self::check_quantity(quantity)?;

        let detail = self.source.get_detail(id).await?;
        let energy = detail.energy_kcal_per_100g();
        if energy.is_none() {
            warn!(fdc_id = id, "No energy nutrient on food record, counting 0 kcal");
        }
        let kcal_per_100g = energy.unwrap_or(0.0);
        let estimate = grams_for(quantity, unit, Some(&detail));

        Ok(CalorieResult {
            calories: kcal_per_100g / 100.0 * estimate.grams,
            meta: CalorieMeta {
                id: detail.id,
                description: detail.description,
                kcal_per_100g,
                grams: estimate.grams,
                gram_source: estimate.source,
                energy_known: energy.is_some(),
            },
        })
    }

    /// Resolve either form of [`FoodRef`]
    ///
    /// # Errors
    ///
    /// See [`Self::resolve`] and [`Self::resolve_by_id`]
    pub async fn resolve_ref(
        &self,
        quantity: f64,
        unit: &str,
        food: &FoodRef,
    ) -> AppResult<CalorieResult> {
        match food {
            FoodRef::Id(id) => self.resolve_by_id(quantity, unit, *id).await,
            FoodRef::Name(name) => self.resolve(quantity, unit, name).await,
        }
    }

    /// Resolve every line, recording failures instead of aborting
    ///
    /// Lines resolve concurrently; results keep the input order. A failed
    /// line contributes 0 kcal and appears in [`RecipeEvaluation::unresolved`].
    pub async fn resolve_batch(&self, lines: &[IngredientLine]) -> RecipeEvaluation {
        let outcomes = self.resolve_lines(lines).await;

        let resolutions = lines
            .iter()
            .zip(outcomes)
            .map(|(line, result)| {
                let outcome = match result {
                    Ok(resolved) => IngredientOutcome::Resolved(resolved),
                    Err(e) => {
                        warn!(ingredient = %line, code = ?e.code, "Ingredient not resolved: {e}");
                        IngredientOutcome::failed(&e)
                    }
                };
                IngredientResolution {
                    line: line.clone(),
                    outcome,
                }
            })
            .collect();

        RecipeEvaluation::from_resolutions(resolutions)
    }

    /// Evaluate a recipe, tolerating only foods that have no match
    ///
    /// A line whose food is not found contributes 0 kcal and appears in
    /// [`RecipeEvaluation::unresolved`]. Any other failure means the total
    /// cannot be trusted and is returned instead.
    ///
    /// # Errors
    ///
    /// Returns the first non-`ResourceNotFound` failure in recipe order
    pub async fn evaluate_recipe(&self, lines: &[IngredientLine]) -> AppResult<RecipeEvaluation> {
        let outcomes = self.resolve_lines(lines).await;

        let mut resolutions = Vec::with_capacity(lines.len());
        for (line, result) in lines.iter().zip(outcomes) {
            let outcome = match result {
                Ok(resolved) => IngredientOutcome::Resolved(resolved),
                Err(e) if e.code == ErrorCode::ResourceNotFound => {
                    warn!(ingredient = %line, "Ingredient not found, counting 0 kcal");
                    IngredientOutcome::failed(&e)
                }
                Err(e) => {
                    warn!(ingredient = %line, code = ?e.code, "Recipe evaluation failed: {e}");
                    return Err(e);
                }
            };
            resolutions.push(IngredientResolution {
                line: line.clone(),
                outcome,
            });
        }

        Ok(RecipeEvaluation::from_resolutions(resolutions))
    }

    async fn resolve_lines(&self, lines: &[IngredientLine]) -> Vec<AppResult<CalorieResult>> {
        join_all(
            lines
                .iter()
                .map(|line| self.resolve(line.quantity, &line.unit, &line.name)),
        )
        .await
    }
}
