// ABOUTME: Integration tests for the calorie convergence loop
// ABOUTME: Drives the loop with scripted extraction and adjustment capabilities over mock food data
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

mod common;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use calorie_tuner::errors::{AppError, AppResult, ErrorCode};
use calorie_tuner::events::EventKind;
use calorie_tuner::external::MockUsdaClient;
use calorie_tuner::models::{IngredientLine, Recipe, RecipeAdjustment, TerminalState};
use calorie_tuner::optimizer::{
    ConvergenceLoop, ConvergenceSettings, ExtractedRecipe, RecipeAdjuster, RecipeExtractor,
};

use common::{drain_events, nutrition_fixture, NutritionFixture};

// ============================================================================
// Fake Capabilities
// ============================================================================

struct FixedExtractor {
    recipe: AppResult<ExtractedRecipe>,
    calls: Mutex<u32>,
}

impl FixedExtractor {
    fn new(title: Option<&str>, ingredients: Vec<IngredientLine>) -> Self {
        Self {
            recipe: Ok(ExtractedRecipe {
                title: title.map(str::to_owned),
                ingredients,
            }),
            calls: Mutex::new(0),
        }
    }

    fn failing(error: AppError) -> Self {
        Self {
            recipe: Err(error),
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl RecipeExtractor for FixedExtractor {
    async fn extract(&self, _recipe_text: &str) -> AppResult<ExtractedRecipe> {
        *self.calls.lock().unwrap() += 1;
        self.recipe.as_ref().cloned().map_err(AppError::detached)
    }
}

/// What the adjuster saw on one call
#[derive(Debug, Clone)]
struct AdjustCall {
    recipe: Recipe,
    calories_to_cut: f64,
    prior_changes: Vec<String>,
}

/// Replays queued adjustments; once they run out it echoes the recipe back
#[derive(Default)]
struct QueuedAdjuster {
    queue: Mutex<VecDeque<RecipeAdjustment>>,
    calls: Mutex<Vec<AdjustCall>>,
}

impl QueuedAdjuster {
    fn with(adjustments: Vec<RecipeAdjustment>) -> Self {
        Self {
            queue: Mutex::new(adjustments.into()),
            calls: Mutex::default(),
        }
    }

    fn calls(&self) -> Vec<AdjustCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecipeAdjuster for QueuedAdjuster {
    async fn adjust(
        &self,
        recipe: &Recipe,
        calories_to_cut: f64,
        prior_changes: &[String],
    ) -> AppResult<RecipeAdjustment> {
        self.calls.lock().unwrap().push(AdjustCall {
            recipe: recipe.clone(),
            calories_to_cut,
            prior_changes: prior_changes.to_vec(),
        });
        let next = self.queue.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| RecipeAdjustment {
            title: None,
            ingredients: recipe.ingredients.clone(),
            changes: vec!["Tried again".to_owned()],
        }))
    }
}

fn adjustment(title: Option<&str>, ingredients: Vec<IngredientLine>, change: &str) -> RecipeAdjustment {
    RecipeAdjustment {
        title: title.map(str::to_owned),
        ingredients,
        changes: vec![change.to_owned()],
    }
}

/// 4 slices of bread (266 kcal) and 200 g chicken (330 kcal): 596 kcal
fn sandwich() -> Vec<IngredientLine> {
    vec![
        IngredientLine::new(4.0, "slices", "bread"),
        IngredientLine::new(200.0, "g", "chicken"),
    ]
}

fn build_loop(
    fixture: &NutritionFixture,
    extractor: &Arc<FixedExtractor>,
    adjuster: &Arc<QueuedAdjuster>,
) -> ConvergenceLoop {
    ConvergenceLoop::new(
        Arc::new(fixture.resolver()),
        Arc::clone(extractor) as Arc<dyn RecipeExtractor>,
        Arc::clone(adjuster) as Arc<dyn RecipeAdjuster>,
        Arc::clone(&fixture.events),
    )
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

// ============================================================================
// Terminal States
// ============================================================================

#[tokio::test]
async fn test_within_tolerance_converges_without_adjusting() -> Result<()> {
    let fixture = nutrition_fixture(MockUsdaClient::with_sample_foods());
    let extractor = Arc::new(FixedExtractor::new(Some("Chicken sandwich"), sandwich()));
    let adjuster = Arc::new(QueuedAdjuster::default());
    let optimizer = build_loop(&fixture, &extractor, &adjuster);

    // 596 is within 5% of 580
    let outcome = optimizer.optimize("chicken sandwich", 580.0).await?;

    assert_eq!(outcome.state, TerminalState::Converged);
    assert_eq!(outcome.iterations, 0);
    assert!(outcome.change_log.is_empty());
    assert!(outcome.warning.is_none());
    assert_close(outcome.total_calories, 596.0);
    assert_eq!(outcome.recipe.title, "Chicken sandwich");
    assert_eq!(outcome.breakdown.len(), 2);
    assert!(adjuster.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_below_target_stops_without_adding_energy() -> Result<()> {
    let fixture = nutrition_fixture(MockUsdaClient::with_sample_foods());
    let extractor = Arc::new(FixedExtractor::new(None, sandwich()));
    let adjuster = Arc::new(QueuedAdjuster::default());
    let optimizer = build_loop(&fixture, &extractor, &adjuster);

    let outcome = optimizer.optimize("chicken sandwich", 1_000.0).await?;

    assert_eq!(outcome.state, TerminalState::BelowTarget);
    assert_eq!(outcome.iterations, 0);
    assert!(outcome.warning.is_none());
    assert_eq!(outcome.recipe.title, "Untitled recipe");
    assert!(adjuster.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_adjustments_converge_and_accumulate_change_log() -> Result<()> {
    let fixture = nutrition_fixture(MockUsdaClient::with_sample_foods());
    let extractor = Arc::new(FixedExtractor::new(Some("Chicken sandwich"), sandwich()));
    let adjuster = Arc::new(QueuedAdjuster::with(vec![
        // 266 + 165 = 431: still 31 over
        adjustment(
            None,
            vec![
                IngredientLine::new(4.0, "slices", "bread"),
                IngredientLine::new(100.0, "g", "chicken"),
            ],
            "Halved the chicken",
        ),
        // 266 + 132 = 398
        adjustment(
            Some("Lighter chicken sandwich"),
            vec![
                IngredientLine::new(4.0, "slices", "bread"),
                IngredientLine::new(80.0, "g", "chicken"),
            ],
            "Trimmed 20 g more chicken",
        ),
    ]));
    let optimizer = build_loop(&fixture, &extractor, &adjuster);

    let outcome = optimizer.optimize("chicken sandwich", 400.0).await?;

    assert_eq!(outcome.state, TerminalState::Converged);
    assert_eq!(outcome.iterations, 2);
    assert_close(outcome.total_calories, 398.0);
    assert_eq!(outcome.recipe.title, "Lighter chicken sandwich");
    assert_eq!(
        outcome.change_log,
        vec!["Halved the chicken", "Trimmed 20 g more chicken"]
    );

    // each round sees only the signed delta and the prior changes
    let calls = adjuster.calls();
    assert_eq!(calls.len(), 2);
    assert_close(calls[0].calories_to_cut, 196.0);
    assert!(calls[0].prior_changes.is_empty());
    assert_eq!(calls[0].recipe.title, "Chicken sandwich");
    assert_close(calls[1].calories_to_cut, 31.0);
    assert_eq!(calls[1].prior_changes, vec!["Halved the chicken"]);
    // a missing title keeps the previous one
    assert_eq!(calls[1].recipe.title, "Chicken sandwich");
    Ok(())
}

#[tokio::test]
async fn test_unreachable_target_exhausts_budget() -> Result<()> {
    let fixture = nutrition_fixture(MockUsdaClient::with_sample_foods());
    let extractor = Arc::new(FixedExtractor::new(Some("Chicken sandwich"), sandwich()));
    let adjuster = Arc::new(QueuedAdjuster::default());
    let optimizer = build_loop(&fixture, &extractor, &adjuster);

    let outcome = optimizer.optimize("chicken sandwich", 100.0).await?;

    assert_eq!(outcome.state, TerminalState::Exhausted);
    assert_eq!(outcome.iterations, 8);
    assert_eq!(outcome.change_log.len(), 8);
    assert_close(outcome.total_calories, 596.0);
    assert!(outcome.warning.as_deref().unwrap().contains("596"));
    assert_eq!(adjuster.calls().len(), 8);
    Ok(())
}

#[tokio::test]
async fn test_custom_budget_is_respected() -> Result<()> {
    let fixture = nutrition_fixture(MockUsdaClient::with_sample_foods());
    let extractor = Arc::new(FixedExtractor::new(None, sandwich()));
    let adjuster = Arc::new(QueuedAdjuster::default());
    let optimizer = build_loop(&fixture, &extractor, &adjuster).with_settings(ConvergenceSettings {
        max_iterations: 2,
        tolerance_ratio: 0.05,
    });

    let outcome = optimizer.optimize("chicken sandwich", 100.0).await?;
    assert_eq!(outcome.state, TerminalState::Exhausted);
    assert_eq!(outcome.iterations, 2);
    assert_eq!(adjuster.calls().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_unresolved_ingredients_count_zero() -> Result<()> {
    let fixture = nutrition_fixture(MockUsdaClient::with_sample_foods());
    let mut lines = sandwich();
    lines.push(IngredientLine::new(3.0, "tbsp", "dragon fruit glaze"));
    let extractor = Arc::new(FixedExtractor::new(None, lines));
    let adjuster = Arc::new(QueuedAdjuster::default());
    let optimizer = build_loop(&fixture, &extractor, &adjuster);

    let outcome = optimizer.optimize("sandwich with glaze", 600.0).await?;
    assert_eq!(outcome.state, TerminalState::Converged);
    assert_close(outcome.total_calories, 596.0);
    assert_eq!(outcome.breakdown.len(), 3);
    // converged, but the missing food is still reported
    let warning = outcome.warning.as_deref().unwrap();
    assert!(warning.contains("dragon fruit glaze"), "{warning}");
    assert!(!warning.contains("converge"), "{warning}");
    Ok(())
}

#[tokio::test]
async fn test_fully_resolved_run_has_no_warning() -> Result<()> {
    let fixture = nutrition_fixture(MockUsdaClient::with_sample_foods());
    let extractor = Arc::new(FixedExtractor::new(None, sandwich()));
    let adjuster = Arc::new(QueuedAdjuster::default());
    let optimizer = build_loop(&fixture, &extractor, &adjuster);

    let outcome = optimizer.optimize("chicken sandwich", 600.0).await?;
    assert_eq!(outcome.state, TerminalState::Converged);
    assert!(outcome.warning.is_none());
    Ok(())
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_invalid_arguments_are_rejected_before_extraction() {
    let fixture = nutrition_fixture(MockUsdaClient::with_sample_foods());
    let extractor = Arc::new(FixedExtractor::new(None, sandwich()));
    let adjuster = Arc::new(QueuedAdjuster::default());
    let optimizer = build_loop(&fixture, &extractor, &adjuster);

    for (text, target) in [("  ", 500.0), ("toast", 0.0), ("toast", -10.0), ("toast", f64::NAN)] {
        let err = optimizer.optimize(text, target).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }
    assert_eq!(extractor.calls(), 0);
}

#[tokio::test]
async fn test_no_usable_ingredients() {
    let fixture = nutrition_fixture(MockUsdaClient::with_sample_foods());
    let extractor = Arc::new(FixedExtractor::new(
        Some("Nothing"),
        vec![
            IngredientLine::new(0.0, "g", "butter"),
            IngredientLine::new(2.0, "cups", "  "),
        ],
    ));
    let adjuster = Arc::new(QueuedAdjuster::default());
    let optimizer = build_loop(&fixture, &extractor, &adjuster);

    let err = optimizer.optimize("some text", 500.0).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NoUsableIngredients);
    assert_eq!(fixture.api.search_calls(), 0);
}

#[tokio::test]
async fn test_extraction_failure_propagates() {
    let fixture = nutrition_fixture(MockUsdaClient::with_sample_foods());
    let extractor = Arc::new(FixedExtractor::failing(AppError::extraction(
        "Text does not describe a recipe",
    )));
    let adjuster = Arc::new(QueuedAdjuster::default());
    let optimizer = build_loop(&fixture, &extractor, &adjuster);

    let err = optimizer.optimize("hello", 500.0).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ExtractionFailed);
}

#[tokio::test]
async fn test_nutrition_outage_fails_the_run() {
    let fixture = nutrition_fixture(
        MockUsdaClient::with_sample_foods()
            .with_failing_query("bread", 503)
            .with_failing_query("chicken", 503),
    );
    let extractor = Arc::new(FixedExtractor::new(None, sandwich()));
    let adjuster = Arc::new(QueuedAdjuster::default());
    let optimizer = build_loop(&fixture, &extractor, &adjuster);

    let err = optimizer.optimize("chicken sandwich", 400.0).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::UpstreamError);
    assert_eq!(err.upstream_status(), Some(503));
    // both lines spent their three attempts before the run gave up
    assert_eq!(fixture.api.search_calls(), 6);
    assert!(adjuster.calls().is_empty());
}

#[tokio::test]
async fn test_partial_outage_is_not_reported_as_converged() {
    // bread alone is 266 kcal, which would sit within tolerance of 270
    let fixture =
        nutrition_fixture(MockUsdaClient::with_sample_foods().with_failing_query("chicken", 500));
    let mut receiver = fixture.events.subscribe();
    let extractor = Arc::new(FixedExtractor::new(None, sandwich()));
    let adjuster = Arc::new(QueuedAdjuster::default());
    let optimizer = build_loop(&fixture, &extractor, &adjuster);

    let err = optimizer.optimize("chicken sandwich", 270.0).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::UpstreamError);
    assert_eq!(err.upstream_status(), Some(500));

    let events = drain_events(&mut receiver);
    assert!(!events
        .iter()
        .any(|e| matches!(e.kind, EventKind::OptimizationFinished { .. })));
}

#[tokio::test]
async fn test_empty_adjustment_is_malformed_output() {
    let fixture = nutrition_fixture(MockUsdaClient::with_sample_foods());
    let extractor = Arc::new(FixedExtractor::new(None, sandwich()));
    let adjuster = Arc::new(QueuedAdjuster::with(vec![adjustment(
        None,
        vec![IngredientLine::new(-1.0, "g", "chicken")],
        "Removed everything",
    )]));
    let optimizer = build_loop(&fixture, &extractor, &adjuster);

    let err = optimizer.optimize("chicken sandwich", 100.0).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::MalformedOutput);
}

// ============================================================================
// Events
// ============================================================================

#[tokio::test]
async fn test_run_emits_iteration_and_finish_events() -> Result<()> {
    let fixture = nutrition_fixture(MockUsdaClient::with_sample_foods());
    let mut receiver = fixture.events.subscribe();
    let extractor = Arc::new(FixedExtractor::new(None, sandwich()));
    let adjuster = Arc::new(QueuedAdjuster::with(vec![adjustment(
        None,
        vec![IngredientLine::new(4.0, "slices", "bread")],
        "Dropped the chicken",
    )]));
    let optimizer = build_loop(&fixture, &extractor, &adjuster);

    let outcome = optimizer.optimize("chicken sandwich", 270.0).await?;
    assert_eq!(outcome.state, TerminalState::Converged);

    let events = drain_events(&mut receiver);
    let iterations: Vec<u32> = events
        .iter()
        .filter_map(|e| match &e.kind {
            EventKind::IterationEvaluated {
                run_id, iteration, ..
            } => {
                assert_eq!(*run_id, outcome.run_id);
                Some(*iteration)
            }
            _ => None,
        })
        .collect();
    assert_eq!(iterations, vec![0, 1]);

    let tools: Vec<&str> = events
        .iter()
        .filter_map(|e| match &e.kind {
            EventKind::ToolInvoked { tool, .. } => Some(tool.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(tools, vec!["extract_recipe", "adjust_recipe"]);

    assert!(matches!(
        events.last().map(|e| &e.kind),
        Some(EventKind::OptimizationFinished {
            state: TerminalState::Converged,
            iterations: 1,
            ..
        })
    ));
    Ok(())
}
