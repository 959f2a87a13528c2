// ABOUTME: Ingredient line and recipe types exchanged with extraction and adjustment
// ABOUTME: Normalization drops lines with non-positive quantities or empty names
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// One `(quantity, unit, name)` triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientLine {
    /// Amount in `unit`
    pub quantity: f64,
    /// Unit token, possibly empty
    #[serde(default)]
    pub unit: String,
    /// Ingredient name
    pub name: String,
}

impl IngredientLine {
    /// Create a new ingredient line
    #[must_use]
    pub fn new(quantity: f64, unit: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            quantity,
            unit: unit.into(),
            name: name.into(),
        }
    }

    /// A line is usable when its quantity is a positive finite number and it has a name
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.quantity.is_finite() && self.quantity > 0.0 && !self.name.trim().is_empty()
    }
}

impl Display for IngredientLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.unit.trim().is_empty() {
            write!(f, "{} {}", self.quantity, self.name)
        } else {
            write!(f, "{} {} {}", self.quantity, self.unit, self.name)
        }
    }
}

/// Drop unusable lines and trim the survivors' text fields
#[must_use]
pub fn normalize_lines(lines: Vec<IngredientLine>) -> Vec<IngredientLine> {
    lines
        .into_iter()
        .filter(IngredientLine::is_valid)
        .map(|line| IngredientLine {
            quantity: line.quantity,
            unit: line.unit.trim().to_owned(),
            name: line.name.trim().to_owned(),
        })
        .collect()
}

/// A titled, ordered ingredient list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Recipe title
    pub title: String,
    /// Ingredient lines in recipe order
    pub ingredients: Vec<IngredientLine>,
}

impl Recipe {
    /// Create a recipe, normalizing its ingredient lines
    #[must_use]
    pub fn new(title: impl Into<String>, ingredients: Vec<IngredientLine>) -> Self {
        Self {
            title: title.into(),
            ingredients: normalize_lines(ingredients),
        }
    }
}

/// Output of the adjustment capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeAdjustment {
    /// Revised title, if the capability renamed the recipe
    #[serde(default)]
    pub title: Option<String>,
    /// Revised ingredient list
    pub ingredients: Vec<IngredientLine>,
    /// Human-readable description of each change made
    #[serde(default)]
    pub changes: Vec<String>,
}
