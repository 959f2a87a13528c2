// ABOUTME: Recipe extraction capability: free text to a title and ingredient lines
// ABOUTME: LLM-backed implementation validates the reply shape and retries malformed output
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::payload::parse_json_reply;
use crate::errors::AppResult;
use crate::llm::prompts::{extraction_schema, RECIPE_EXTRACTION_PROMPT};
use crate::llm::{ChatMessage, ChatRequest, LlmProvider, ResponseFormat};
use crate::models::IngredientLine;
use crate::resilience::Resilience;

/// Extraction result before normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecipe {
    /// Title, if one was found
    #[serde(default)]
    pub title: Option<String>,
    /// Ingredient lines as extracted, possibly including unusable ones
    pub ingredients: Vec<IngredientLine>,
}

/// Turns recipe text into ingredient lines
#[async_trait]
pub trait RecipeExtractor: Send + Sync {
    /// Extract a recipe from free text
    ///
    /// Implementations that cannot make sense of the text report
    /// `ExtractionFailed`.
    async fn extract(&self, recipe_text: &str) -> AppResult<ExtractedRecipe>;
}

/// Extraction through the completion service
pub struct LlmRecipeExtractor {
    provider: Arc<dyn LlmProvider>,
    resilience: Resilience,
    model: Option<String>,
}

impl LlmRecipeExtractor {
    /// Create an extractor
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

    fn build_request(&self, recipe_text: &str) -> ChatRequest {
        let request = ChatRequest::new(vec![
            ChatMessage::system(RECIPE_EXTRACTION_PROMPT),
            ChatMessage::user(recipe_text),
        ])
        .with_temperature(0.0)
        .with_response_format(ResponseFormat::json_schema(
            "extracted_recipe",
            extraction_schema(),
        ));
        match &self.model {
            Some(model) => request.with_model(model),
            None => request,
        }
    }
}

#[async_trait]
impl RecipeExtractor for LlmRecipeExtractor {
    async fn extract(&self, recipe_text: &str) -> AppResult<ExtractedRecipe> {
        let request = self.build_request(recipe_text);
        let request = &request;
        let provider = &self.provider;

        self.resilience
            .run("recipe_extraction", || async move {
                let response = provider.complete(request).await?;
                parse_json_reply::<ExtractedRecipe>(&response.content)
            })
            .await
    }
}
