// ABOUTME: Recipe adjustment capability: revise a recipe to cut a given number of kcal
// ABOUTME: LLM-backed implementation rejects replies without usable ingredient lines
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::payload::parse_json_reply;
use crate::errors::{AppError, AppResult};
use crate::llm::prompts::{adjustment_schema, RECIPE_ADJUSTMENT_PROMPT};
use crate::llm::{ChatMessage, ChatRequest, LlmProvider, ResponseFormat};
use crate::models::{normalize_lines, Recipe, RecipeAdjustment};
use crate::resilience::Resilience;

/// Proposes a revised recipe with less energy
#[async_trait]
pub trait RecipeAdjuster: Send + Sync {
    /// Revise `recipe` to remove about `calories_to_cut` kcal
    ///
    /// `prior_changes` lists what earlier rounds already changed.
    async fn adjust(
        &self,
        recipe: &Recipe,
        calories_to_cut: f64,
        prior_changes: &[String],
    ) -> AppResult<RecipeAdjustment>;
}

/// Reject adjustments the loop could not continue from
///
/// # Errors
///
/// Returns `MalformedOutput` when no ingredient line survives normalization
pub fn validate_adjustment(adjustment: RecipeAdjustment) -> AppResult<RecipeAdjustment> {
    let ingredients = normalize_lines(adjustment.ingredients);
    if ingredients.is_empty() {
        return Err(AppError::malformed_output(
            "Adjusted recipe has no usable ingredient lines",
        ));
    }
    Ok(RecipeAdjustment {
        title: adjustment
            .title
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty()),
        ingredients,
        changes: adjustment
            .changes
            .into_iter()
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty())
            .collect(),
    })
}

/// Adjustment through the completion service
pub struct LlmRecipeAdjuster {
    provider: Arc<dyn LlmProvider>,
    resilience: Resilience,
    model: Option<String>,
}

impl LlmRecipeAdjuster {
    /// Create an adjuster
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, resilience: Resilience) -> Self {
        Self {
            provider,
            resilience,
            model: None,
        }
    }

    /// Use a specific model instead of the provider default
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    fn build_request(
        &self,
        recipe: &Recipe,
        calories_to_cut: f64,
        prior_changes: &[String],
    ) -> ChatRequest {
        let input = json!({
            "recipe": recipe,
            "calories_to_cut": calories_to_cut.round(),
            "prior_changes": prior_changes,
        });
        let request = ChatRequest::new(vec![
            ChatMessage::system(RECIPE_ADJUSTMENT_PROMPT),
            ChatMessage::user(input.to_string()),
        ])
        .with_temperature(0.2)
        .with_response_format(ResponseFormat::json_schema(
            "recipe_adjustment",
            adjustment_schema(),
        ));
        match &self.model {
            Some(model) => request.with_model(model),
            None => request,
        }
    }
}

#[async_trait]
impl RecipeAdjuster for LlmRecipeAdjuster {
    async fn adjust(
        &self,
        recipe: &Recipe,
        calories_to_cut: f64,
        prior_changes: &[String],
    ) -> AppResult<RecipeAdjustment> {
        let request = self.build_request(recipe, calories_to_cut, prior_changes);
        let request = &request;
        let provider = &self.provider;

        self.resilience
            .run("recipe_adjustment", || async move {
                let response = provider.complete(request).await?;
                validate_adjustment(parse_json_reply(&response.content)?)
            })
            .await
    }
}
