// ABOUTME: Integration tests for the completion-backed extraction and adjustment capabilities
// ABOUTME: Uses the scripted provider to check request shapes, reply validation, and retries
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

mod common;

use std::sync::Arc;

use anyhow::Result;
use calorie_tuner::errors::{AppError, ErrorCode};
use calorie_tuner::events::EventBus;
use calorie_tuner::llm::{LlmProvider, MessageRole, ScriptedProvider};
use calorie_tuner::models::{IngredientLine, Recipe};
use calorie_tuner::optimizer::{
    LlmRecipeAdjuster, LlmRecipeExtractor, RecipeAdjuster, RecipeExtractor,
};
use serde_json::Value;

use common::{fast_resilience, init_test_logging};

const EXTRACTED: &str = r#"{
    "title": "Buttered toast",
    "ingredients": [
        {"quantity": 2, "unit": "slices", "name": "white bread"},
        {"quantity": 10, "unit": "g", "name": "butter"}
    ]
}"#;

fn extractor(provider: &Arc<ScriptedProvider>) -> LlmRecipeExtractor {
    init_test_logging();
    let events = Arc::new(EventBus::default());
    LlmRecipeExtractor::new(
        Arc::clone(provider) as Arc<dyn LlmProvider>,
        fast_resilience(&events, 3),
    )
}

fn adjuster(provider: &Arc<ScriptedProvider>) -> LlmRecipeAdjuster {
    init_test_logging();
    let events = Arc::new(EventBus::default());
    LlmRecipeAdjuster::new(
        Arc::clone(provider) as Arc<dyn LlmProvider>,
        fast_resilience(&events, 3),
    )
}

fn toast() -> Recipe {
    Recipe::new(
        "Buttered toast",
        vec![
            IngredientLine::new(2.0, "slices", "white bread"),
            IngredientLine::new(10.0, "g", "butter"),
        ],
    )
}

// ============================================================================
// Extraction
// ============================================================================

#[tokio::test]
async fn test_extraction_request_and_reply() -> Result<()> {
    let provider = Arc::new(ScriptedProvider::new().with_reply(EXTRACTED));

    let recipe = extractor(&provider).extract("Two slices of toast with butter").await?;
    assert_eq!(recipe.title.as_deref(), Some("Buttered toast"));
    assert_eq!(
        recipe.ingredients,
        vec![
            IngredientLine::new(2.0, "slices", "white bread"),
            IngredientLine::new(10.0, "g", "butter"),
        ]
    );

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.messages[0].role, MessageRole::System);
    assert_eq!(request.messages[1].role, MessageRole::User);
    assert_eq!(request.messages[1].content, "Two slices of toast with butter");
    assert_eq!(request.temperature, Some(0.0));
    let format = request.response_format.as_ref().unwrap();
    assert_eq!(format.name, "extracted_recipe");
    assert_eq!(format.schema["required"][1], "ingredients");
    Ok(())
}

#[tokio::test]
async fn test_extraction_retries_malformed_reply() -> Result<()> {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_reply("Sure! Here is the recipe you asked for.")
            .with_reply(format!("```json\n{EXTRACTED}\n```")),
    );

    let recipe = extractor(&provider).extract("toast").await?;
    assert_eq!(recipe.ingredients.len(), 2);
    assert_eq!(provider.requests().len(), 2);
    assert_eq!(provider.remaining(), 0);
    Ok(())
}

#[tokio::test]
async fn test_extraction_gives_up_after_budget() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_reply("nope")
            .with_reply("{}")
            .with_reply(r#"{"title": 3}"#)
            .with_reply(EXTRACTED),
    );

    let err = extractor(&provider).extract("toast").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::MalformedOutput);
    assert_eq!(provider.remaining(), 1);
}

#[tokio::test]
async fn test_extraction_config_error_is_not_retried() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_failure(AppError::config("Completion service rejected the API key"))
            .with_reply(EXTRACTED),
    );

    let err = extractor(&provider).extract("toast").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigError);
    assert_eq!(provider.requests().len(), 1);
}

// ============================================================================
// Adjustment
// ============================================================================

#[tokio::test]
async fn test_adjustment_request_carries_delta_and_history() -> Result<()> {
    let provider = Arc::new(ScriptedProvider::new().with_reply(
        r#"{
            "title": "Light toast",
            "ingredients": [
                {"quantity": 2, "unit": "slices", "name": "white bread"},
                {"quantity": 5, "unit": " g ", "name": "butter"}
            ],
            "changes": ["Halved the butter", ""]
        }"#,
    ));
    let prior = vec!["Swapped to thin-sliced bread".to_owned()];

    let adjustment = adjuster(&provider).adjust(&toast(), 36.4, &prior).await?;
    assert_eq!(adjustment.title.as_deref(), Some("Light toast"));
    assert_eq!(adjustment.ingredients[1], IngredientLine::new(5.0, "g", "butter"));
    assert_eq!(adjustment.changes, vec!["Halved the butter"]);

    let request = &provider.requests()[0];
    let input: Value = serde_json::from_str(&request.messages[1].content)?;
    assert_eq!(input["calories_to_cut"], 36.0);
    assert_eq!(input["prior_changes"][0], "Swapped to thin-sliced bread");
    assert_eq!(input["recipe"]["title"], "Buttered toast");
    assert_eq!(
        request.response_format.as_ref().unwrap().name,
        "recipe_adjustment"
    );
    Ok(())
}

#[tokio::test]
async fn test_adjustment_without_usable_lines_is_retried() -> Result<()> {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_reply(r#"{"title": "", "ingredients": [{"quantity": 0, "unit": "g", "name": "butter"}], "changes": []}"#)
            .with_reply(r#"{"title": "", "ingredients": [{"quantity": 1, "unit": "slice", "name": "white bread"}], "changes": ["One slice"]}"#),
    );

    let adjustment = adjuster(&provider).adjust(&toast(), 100.0, &[]).await?;
    assert_eq!(adjustment.title, None);
    assert_eq!(adjustment.ingredients.len(), 1);
    assert_eq!(provider.requests().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_adjustment_upstream_timeout_exhausts_retries() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_failure(AppError::timeout("completion service"))
            .with_failure(AppError::timeout("completion service"))
            .with_failure(AppError::timeout("completion service")),
    );

    let err = adjuster(&provider)
        .adjust(&toast(), 50.0, &[])
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ExternalTimeout);
    assert_eq!(provider.remaining(), 0);
}
