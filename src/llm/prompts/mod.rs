// ABOUTME: Prompts and output schemas for recipe extraction and adjustment
// ABOUTME: Prompt text is loaded at compile time from markdown files
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

//! # Prompts
//!
//! Prompts live in markdown files next to this module for easy editing.

use serde_json::{json, Value};

/// Instructions for turning recipe text into ingredient lines
pub const RECIPE_EXTRACTION_PROMPT: &str = include_str!("recipe_extraction.md");

/// Instructions for cutting energy from a recipe
pub const RECIPE_ADJUSTMENT_PROMPT: &str = include_str!("recipe_adjustment.md");

fn ingredient_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "quantity": { "type": "number" },
            "unit": { "type": "string" },
            "name": { "type": "string" }
        },
        "required": ["quantity", "unit", "name"],
        "additionalProperties": false
    })
}

/// Output shape for extraction
#[must_use]
pub fn extraction_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "ingredients": { "type": "array", "items": ingredient_schema() }
        },
        "required": ["title", "ingredients"],
        "additionalProperties": false
    })
}

/// Output shape for adjustment
#[must_use]
pub fn adjustment_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "ingredients": { "type": "array", "items": ingredient_schema() },
            "changes": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["title", "ingredients", "changes"],
        "additionalProperties": false
    })
}
