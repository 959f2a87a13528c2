// ABOUTME: Food search hit and detail record types from the nutrition database
// ABOUTME: Includes data-type categories, nutrients, portions, and energy extraction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::nutrition::{
    ENERGY_NAME_PREFIX, ENERGY_NUTRIENT_ID, ENERGY_UNIT, MAX_SEARCH_PAGE_SIZE,
};
use crate::errors::{AppError, AppResult};

/// Canonical food identity in the nutrition database
pub type FoodId = u64;

/// Provenance category of a food record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Analytically derived reference data
    #[serde(rename = "Foundation")]
    Foundation,
    /// Legacy standard reference data
    #[serde(rename = "SR Legacy")]
    SrLegacy,
    /// Retail products with label data
    #[serde(rename = "Branded")]
    Branded,
    /// Survey-derived data (FNDDS)
    #[serde(rename = "Survey (FNDDS)")]
    SurveyFndds,
    /// Experimental data
    #[serde(rename = "Experimental")]
    Experimental,
}

impl DataType {
    /// Label the nutrition API uses for this category
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Foundation => "Foundation",
            Self::SrLegacy => "SR Legacy",
            Self::Branded => "Branded",
            Self::SurveyFndds => "Survey (FNDDS)",
            Self::Experimental => "Experimental",
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "foundation" => Ok(Self::Foundation),
            "sr legacy" | "sr_legacy" | "srlegacy" => Ok(Self::SrLegacy),
            "branded" => Ok(Self::Branded),
            "survey (fndds)" | "survey" | "fndds" => Ok(Self::SurveyFndds),
            "experimental" => Ok(Self::Experimental),
            other => Err(AppError::invalid_input(format!(
                "unknown data type filter: {other}"
            ))),
        }
    }
}

/// A validated search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoodSearchRequest {
    /// Free-text query
    pub query: String,
    /// Maximum hits to return
    pub limit: u32,
    /// Restrict hits to one category; `None` searches all
    pub data_type: Option<DataType>,
}

impl FoodSearchRequest {
    /// Build a search request, rejecting empty queries and out-of-range limits
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the trimmed query is empty or `limit` is not in `1..=200`
    pub fn new(query: &str, limit: u32, data_type: Option<DataType>) -> AppResult<Self> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::invalid_input("Search query cannot be empty"));
        }
        if limit == 0 || limit > MAX_SEARCH_PAGE_SIZE {
            return Err(AppError::invalid_input(format!(
                "Search limit must be between 1 and {MAX_SEARCH_PAGE_SIZE}"
            )));
        }
        Ok(Self {
            query: query.to_owned(),
            limit,
            data_type,
        })
    }
}

/// A single search hit; never mutated after it is returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodSearchHit {
    /// Canonical food id
    pub id: FoodId,
    /// Food description
    pub description: String,
    /// Category label as reported upstream (e.g. "Foundation")
    pub data_type: String,
    /// Food category (e.g. "Fruits and Fruit Juices")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food_category: Option<String>,
    /// Brand owner, present on branded records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_owner: Option<String>,
    /// Publication date of the record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,
}

/// One nutrient amount per 100 g of food
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodNutrient {
    /// Nutrient id (1008 is energy in kcal)
    pub nutrient_id: u32,
    /// Nutrient name (e.g. "Protein", "Energy")
    pub name: String,
    /// Unit name (e.g. "g", "kcal")
    pub unit: String,
    /// Amount per 100 g
    pub value: f64,
}

/// Food-specific serving measure with its gram weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodPortion {
    /// Measure unit name (e.g. "cup", "slice")
    pub measure_unit_name: String,
    /// Free-text modifier (e.g. "large", "tbsp")
    #[serde(default)]
    pub modifier: String,
    /// Grams in one of this portion
    pub gram_weight: f64,
}

/// Complete detail record; cached as an immutable snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodDetail {
    /// Canonical food id
    pub id: FoodId,
    /// Food description
    pub description: String,
    /// Category label as reported upstream
    #[serde(default)]
    pub data_type: String,
    /// Nutrients per 100 g
    #[serde(default)]
    pub nutrients: Vec<FoodNutrient>,
    /// Known portions
    #[serde(default)]
    pub portions: Vec<FoodPortion>,
}

impl FoodDetail {
    /// Energy in kcal per 100 g
    ///
    /// Prefers the canonical energy nutrient id, then any nutrient measured in
    /// kcal whose name starts with "Energy". `None` means the record carries no
    /// usable energy value.
    #[must_use]
    pub fn energy_kcal_per_100g(&self) -> Option<f64> {
        self.nutrients
            .iter()
            .find(|n| n.nutrient_id == ENERGY_NUTRIENT_ID)
            .or_else(|| {
                self.nutrients
                    .iter()
                    .find(|n| n.unit == ENERGY_UNIT && n.name.starts_with(ENERGY_NAME_PREFIX))
            })
            .map(|n| n.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nutrient(nutrient_id: u32, name: &str, unit: &str, value: f64) -> FoodNutrient {
        FoodNutrient {
            nutrient_id,
            name: name.to_owned(),
            unit: unit.to_owned(),
            value,
        }
    }

    fn detail(nutrients: Vec<FoodNutrient>) -> FoodDetail {
        FoodDetail {
            id: 1,
            description: "test".to_owned(),
            data_type: "Foundation".to_owned(),
            nutrients,
            portions: vec![],
        }
    }

    #[test]
    fn test_energy_prefers_canonical_id() {
        let food = detail(vec![
            nutrient(2047, "Energy (Atwater General Factors)", "kcal", 60.0),
            nutrient(1008, "Energy", "kcal", 52.0),
        ]);
        assert_eq!(food.energy_kcal_per_100g(), Some(52.0));
    }

    #[test]
    fn test_energy_falls_back_to_named_kcal_nutrient() {
        let food = detail(vec![
            nutrient(1062, "Energy", "kJ", 218.0),
            nutrient(2048, "Energy (Atwater Specific Factors)", "kcal", 61.0),
        ]);
        assert_eq!(food.energy_kcal_per_100g(), Some(61.0));
    }

    #[test]
    fn test_energy_missing() {
        let food = detail(vec![nutrient(1003, "Protein", "g", 0.3)]);
        assert_eq!(food.energy_kcal_per_100g(), None);
    }

    #[test]
    fn test_data_type_parsing() {
        assert_eq!("sr legacy".parse::<DataType>().unwrap(), DataType::SrLegacy);
        assert_eq!(
            "Survey (FNDDS)".parse::<DataType>().unwrap(),
            DataType::SurveyFndds
        );
        assert!("organic".parse::<DataType>().is_err());
    }

    #[test]
    fn test_search_request_validation() {
        assert!(FoodSearchRequest::new("  ", 5, None).is_err());
        assert!(FoodSearchRequest::new("apple", 0, None).is_err());
        assert!(FoodSearchRequest::new("apple", 201, None).is_err());
        let request = FoodSearchRequest::new(" apple ", 5, Some(DataType::Foundation)).unwrap();
        assert_eq!(request.query, "apple");
    }
}
