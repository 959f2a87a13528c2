// ABOUTME: Unit conversion for ingredient quantities into grams
// ABOUTME: Tiered: weight table, food portions, bare grams, then a 100 g-per-unit fallback
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

//! Quantity-to-mass conversion.
//!
//! Tiers are tried in order and the first one that applies wins:
//!
//! 1. the fixed weight table (g, kg, oz, lb)
//! 2. a portion on the food's detail record whose measure name or modifier
//!    matches the unit
//! 3. an empty unit, taken to mean the quantity is already grams
//! 4. anything else, taken as servings of 100 g
//!
//! Conversion never fails. A quantity that cannot be turned into a mass at all
//! (negative or not finite) yields 0 g tagged [`GramSource::Unknown`].

use crate::constants::units::{
    FALLBACK_GRAMS_PER_UNIT, GRAMS_PER_GRAM, GRAMS_PER_KG, GRAMS_PER_LB, GRAMS_PER_OZ,
};
use crate::models::{FoodDetail, GramSource};

/// A converted mass and the tier that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GramEstimate {
    /// Mass in grams
    pub grams: f64,
    /// Tier that produced it
    pub source: GramSource,
}

impl GramEstimate {
    const fn new(grams: f64, source: GramSource) -> Self {
        Self { grams, source }
    }
}

/// Trim, lowercase, and strip one trailing plural "s"
///
/// The bare unit "s" is left alone so it does not collapse to empty.
#[must_use]
pub fn normalize_unit(unit: &str) -> String {
    let lowered = unit.trim().to_lowercase();
    match lowered.strip_suffix('s') {
        Some(stem) if !stem.is_empty() => stem.to_owned(),
        _ => lowered,
    }
}

/// Grams per unit for the fixed weight table
fn weight_factor(normalized_unit: &str) -> Option<f64> {
    match normalized_unit {
        "g" | "gram" => Some(GRAMS_PER_GRAM),
        "kg" | "kilogram" => Some(GRAMS_PER_KG),
        "oz" | "ounce" => Some(GRAMS_PER_OZ),
        "lb" | "pound" => Some(GRAMS_PER_LB),
        _ => None,
    }
}

/// Gram weight of the first portion matching the unit by measure name or modifier
fn portion_weight(detail: &FoodDetail, normalized_unit: &str) -> Option<f64> {
    detail
        .portions
        .iter()
        .filter(|p| p.gram_weight > 0.0)
        .find(|p| {
            normalize_unit(&p.measure_unit_name) == normalized_unit
                || normalize_unit(&p.modifier) == normalized_unit
        })
        .map(|p| p.gram_weight)
}

/// Convert a quantity in `unit` to grams
///
/// `detail` enables the portion tier; without it a non-weight, non-empty unit
/// falls through to the 100 g fallback.
///
/// # Examples
///
/// ```rust
/// use calorie_tuner::nutrition::conversion::grams_for;
/// use calorie_tuner::models::GramSource;
///
/// let estimate = grams_for(3.0, "oz", None);
/// assert!((estimate.grams - 85.0485).abs() < 1e-9);
/// assert_eq!(estimate.source, GramSource::Weight);
/// ```
#[must_use]
pub fn grams_for(quantity: f64, unit: &str, detail: Option<&FoodDetail>) -> GramEstimate {
    if !quantity.is_finite() || quantity < 0.0 {
        return GramEstimate::new(0.0, GramSource::Unknown);
    }

    let normalized = normalize_unit(unit);

    if let Some(factor) = weight_factor(&normalized) {
        return GramEstimate::new(quantity * factor, GramSource::Weight);
    }

    // an empty unit never matches a portion with a blank measure or modifier
    if !normalized.is_empty() {
        if let Some(gram_weight) = detail.and_then(|d| portion_weight(d, &normalized)) {
            return GramEstimate::new(quantity * gram_weight, GramSource::Portion);
        }
    }

    if normalized.is_empty() {
        return GramEstimate::new(quantity, GramSource::AssumedGrams);
    }

    GramEstimate::new(quantity * FALLBACK_GRAMS_PER_UNIT, GramSource::Fallback100g)
}

/// Whether `unit` is handled by the fixed weight table
#[must_use]
pub fn is_weight_unit(unit: &str) -> bool {
    weight_factor(&normalize_unit(unit)).is_some()
}
