// ABOUTME: USDA FoodData Central API client for food search and detail retrieval
// ABOUTME: Maps wire JSON to domain records; includes a scriptable mock for tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

//! USDA `FoodData` Central API Client
//!
//! Raw transport to the nutrition database. It performs exactly one HTTP call
//! per method and does no caching or retrying; those live in
//! [`crate::nutrition::NutritionSource`].
//!
//! # API Reference
//! USDA `FoodData` Central API: <https://fdc.nal.usda.gov/api-guide.html>
//!
//! # Example
//! ```rust,no_run
//! use calorie_tuner::external::{FoodDataApi, UsdaClient, UsdaClientConfig};
//! use calorie_tuner::models::FoodSearchRequest;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = UsdaClient::new(UsdaClientConfig {
//!     api_key: "your_api_key".to_owned(),
//!     ..UsdaClientConfig::default()
//! })?;
//! let hits = client
//!     .search_foods(&FoodSearchRequest::new("apple", 10, None)?)
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::constants::nutrition::{DEFAULT_FDC_BASE_URL, ENERGY_NUTRIENT_ID};
use crate::constants::service_names::FOOD_DATA_CENTRAL;
use crate::errors::{AppError, AppResult};
use crate::models::{
    DataType, FoodDetail, FoodId, FoodNutrient, FoodPortion, FoodSearchHit, FoodSearchRequest,
};

/// Transport to a nutrition database
#[async_trait]
pub trait FoodDataApi: Send + Sync {
    /// Run one search
    async fn search_foods(&self, request: &FoodSearchRequest) -> AppResult<Vec<FoodSearchHit>>;

    /// Fetch one full detail record
    async fn fetch_food(&self, id: FoodId) -> AppResult<FoodDetail>;
}

/// USDA API client configuration
#[derive(Debug, Clone)]
pub struct UsdaClientConfig {
    /// USDA API key (free from <https://fdc.nal.usda.gov/api-key-signup.html>)
    pub api_key: String,
    /// Base URL for USDA API (default: <https://api.nal.usda.gov/fdc/v1>)
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for UsdaClientConfig {
    fn default() -> Self {
        Self {
            api_key: "DEMO_KEY".to_owned(),
            base_url: DEFAULT_FDC_BASE_URL.to_owned(),
            timeout_secs: 30,
        }
    }
}

/// Search request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchBody<'a> {
    query: &'a str,
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_type: Option<[&'static str; 1]>,
}

/// USDA API search response
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    foods: Vec<SearchFood>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchFood {
    fdc_id: Option<u64>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    data_type: String,
    food_category: Option<String>,
    brand_owner: Option<String>,
    publication_date: Option<String>,
}

/// USDA API food details response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FoodDetailsResponse {
    fdc_id: u64,
    #[serde(default)]
    description: String,
    #[serde(default)]
    data_type: String,
    #[serde(default)]
    food_nutrients: Vec<FoodNutrientResponse>,
    #[serde(default)]
    food_portions: Vec<FoodPortionResponse>,
    serving_size: Option<f64>,
    serving_size_unit: Option<String>,
    household_serving_full_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FoodNutrientResponse {
    nutrient: Option<NutrientInfo>,
    amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NutrientInfo {
    id: u32,
    name: String,
    #[serde(default)]
    unit_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FoodPortionResponse {
    measure_unit: Option<MeasureUnit>,
    modifier: Option<String>,
    portion_description: Option<String>,
    gram_weight: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MeasureUnit {
    name: Option<String>,
}

impl SearchFood {
    /// Hits without a positive id are unusable and dropped
    fn into_hit(self) -> Option<FoodSearchHit> {
        Some(FoodSearchHit {
            id: self.fdc_id.filter(|id| *id > 0)?,
            description: self.description,
            data_type: self.data_type,
            food_category: self.food_category,
            brand_owner: self.brand_owner,
            publication_date: self.publication_date,
        })
    }
}

impl From<FoodDetailsResponse> for FoodDetail {
    fn from(response: FoodDetailsResponse) -> Self {
        let nutrients = response
            .food_nutrients
            .into_iter()
            .filter_map(|n| {
                let nutrient = n.nutrient?;
                Some(FoodNutrient {
                    nutrient_id: nutrient.id,
                    name: nutrient.name,
                    unit: nutrient.unit_name,
                    value: n.amount.unwrap_or(0.0),
                })
            })
            .collect();

        let mut portions: Vec<FoodPortion> = response
            .food_portions
            .into_iter()
            .filter_map(|p| {
                Some(FoodPortion {
                    measure_unit_name: p
                        .measure_unit
                        .and_then(|m| m.name)
                        .unwrap_or_default(),
                    modifier: p.modifier.or(p.portion_description).unwrap_or_default(),
                    gram_weight: p.gram_weight?,
                })
            })
            .collect();

        // Branded records carry a label serving instead of portions
        if let (Some(size), Some(unit)) = (response.serving_size, response.serving_size_unit) {
            if matches!(unit.to_lowercase().as_str(), "g" | "grm") {
                portions.push(FoodPortion {
                    measure_unit_name: "serving".to_owned(),
                    modifier: response.household_serving_full_text.unwrap_or_default(),
                    gram_weight: size,
                });
            }
        }

        Self {
            id: response.fdc_id,
            description: response.description,
            data_type: response.data_type,
            nutrients,
            portions,
        }
    }
}

/// USDA `FoodData` Central API Client
#[derive(Debug, Clone)]
pub struct UsdaClient {
    config: UsdaClientConfig,
    http_client: Client,
}

impl UsdaClient {
    /// Create a new USDA API client
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built
    pub fn new(config: UsdaClientConfig) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn transport_error(e: &reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::timeout(FOOD_DATA_CENTRAL)
        } else {
            AppError::external_unavailable(FOOD_DATA_CENTRAL, e.to_string())
        }
    }

    /// Turn a non-success response into an `UpstreamError`
    async fn check_status(response: Response, context: &str) -> AppResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        error!(
            context,
            status = status.as_u16(),
            "{FOOD_DATA_CENTRAL} request failed: {body}"
        );
        Err(AppError::upstream(status.as_u16(), body))
    }
}

#[async_trait]
impl FoodDataApi for UsdaClient {
    async fn search_foods(&self, request: &FoodSearchRequest) -> AppResult<Vec<FoodSearchHit>> {
        let body = SearchBody {
            query: &request.query,
            page_size: request.limit,
            data_type: request.data_type.map(|t| [t.as_str()]),
        };

        let response = self
            .http_client
            .post(self.url("foods/search"))
            .query(&[("api_key", &self.config.api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::transport_error(&e))?;

        let response = Self::check_status(response, &request.query).await?;

        let search: SearchResponse = response.json().await.map_err(|e| {
            AppError::external_unavailable(FOOD_DATA_CENTRAL, format!("JSON parse error: {e}"))
        })?;

        let hits: Vec<FoodSearchHit> = search
            .foods
            .into_iter()
            .filter_map(SearchFood::into_hit)
            .collect();
        debug!(query = %request.query, hits = hits.len(), "Food search completed");
        Ok(hits)
    }

    async fn fetch_food(&self, id: FoodId) -> AppResult<FoodDetail> {
        let response = self
            .http_client
            .get(self.url(&format!("food/{id}")))
            .query(&[("api_key", &self.config.api_key)])
            .send()
            .await
            .map_err(|e| Self::transport_error(&e))?;

        let response = Self::check_status(response, &format!("food/{id}")).await?;

        let details: FoodDetailsResponse = response.json().await.map_err(|e| {
            AppError::external_unavailable(FOOD_DATA_CENTRAL, format!("JSON parse error: {e}"))
        })?;

        Ok(FoodDetail::from(details))
    }
}

/// Mock `FoodData` Central client for testing (no API calls)
///
/// Search matches descriptions by case-insensitive substring unless a query has
/// scripted results. Failures can be scripted per query or queued for the next
/// calls of any kind.
#[derive(Debug, Default)]
pub struct MockUsdaClient {
    foods: HashMap<FoodId, FoodDetail>,
    search_results: HashMap<String, Vec<FoodSearchHit>>,
    failing_queries: HashMap<String, u16>,
    queued_failures: Mutex<VecDeque<AppError>>,
    search_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    seen_requests: Mutex<Vec<FoodSearchRequest>>,
}

impl MockUsdaClient {
    /// Create an empty mock
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock with a few Foundation records
    ///
    /// - 171_688 apple (52 kcal, "medium" portion 182 g)
    /// - 171_477 chicken breast (165 kcal)
    /// - 335_240 white bread (266 kcal, "slice" portion 25 g)
    #[must_use]
    pub fn with_sample_foods() -> Self {
        Self::new()
            .with_food(sample_food(
                171_688,
                "Apples, raw, with skin",
                52.0,
                vec![("", "medium", 182.0), ("cup", "sliced", 109.0)],
            ))
            .with_food(sample_food(
                171_477,
                "Chicken, breast, meat only, cooked, roasted",
                165.0,
                vec![],
            ))
            .with_food(sample_food(
                335_240,
                "Bread, white, commercially prepared",
                266.0,
                vec![("slice", "", 25.0)],
            ))
    }

    /// Add or replace a food record
    #[must_use]
    pub fn with_food(mut self, detail: FoodDetail) -> Self {
        self.foods.insert(detail.id, detail);
        self
    }

    /// Return `hits` for an exact query instead of matching descriptions
    #[must_use]
    pub fn with_search_results(mut self, query: &str, hits: Vec<FoodSearchHit>) -> Self {
        self.search_results.insert(query.to_owned(), hits);
        self
    }

    /// Make every search for `query` fail with `status`
    #[must_use]
    pub fn with_failing_query(mut self, query: &str, status: u16) -> Self {
        self.failing_queries.insert(query.to_owned(), status);
        self
    }

    /// Fail the next call (search or detail) with `error`
    pub fn queue_failure(&self, error: AppError) {
        self.queued_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(error);
    }

    /// Number of search calls received
    #[must_use]
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Number of detail calls received
    #[must_use]
    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    /// Every search request received, in order
    #[must_use]
    pub fn seen_requests(&self) -> Vec<FoodSearchRequest> {
        self.seen_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next_failure(&self) -> Option<AppError> {
        self.queued_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn matches_filter(detail: &FoodDetail, data_type: Option<DataType>) -> bool {
        data_type.map_or(true, |t| detail.data_type == t.as_str())
    }
}

#[async_trait]
impl FoodDataApi for MockUsdaClient {
    async fn search_foods(&self, request: &FoodSearchRequest) -> AppResult<Vec<FoodSearchHit>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if let Some(error) = self.next_failure() {
            return Err(error);
        }
        if let Some(status) = self.failing_queries.get(&request.query) {
            return Err(AppError::upstream(*status, "mock failure"));
        }
        if let Some(hits) = self.search_results.get(&request.query) {
            return Ok(hits.iter().take(request.limit as usize).cloned().collect());
        }

        let query = request.query.to_lowercase();
        let mut matches: Vec<&FoodDetail> = self
            .foods
            .values()
            .filter(|food| food.description.to_lowercase().contains(&query))
            .filter(|food| Self::matches_filter(food, request.data_type))
            .collect();
        matches.sort_by_key(|food| food.id);

        Ok(matches
            .into_iter()
            .take(request.limit as usize)
            .map(|food| FoodSearchHit {
                id: food.id,
                description: food.description.clone(),
                data_type: food.data_type.clone(),
                food_category: None,
                brand_owner: None,
                publication_date: None,
            })
            .collect())
    }

    async fn fetch_food(&self, id: FoodId) -> AppResult<FoodDetail> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.next_failure() {
            return Err(error);
        }
        self.foods
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::upstream(404, format!("Food with FDC ID {id} not found")))
    }
}

/// Foundation record with one energy nutrient and the given `(measure, modifier, grams)` portions
#[must_use]
pub fn sample_food(
    id: FoodId,
    description: &str,
    kcal_per_100g: f64,
    portions: Vec<(&str, &str, f64)>,
) -> FoodDetail {
    FoodDetail {
        id,
        description: description.to_owned(),
        data_type: DataType::Foundation.as_str().to_owned(),
        nutrients: vec![FoodNutrient {
            nutrient_id: ENERGY_NUTRIENT_ID,
            name: "Energy".to_owned(),
            unit: "kcal".to_owned(),
            value: kcal_per_100g,
        }],
        portions: portions
            .into_iter()
            .map(|(measure, modifier, grams)| FoodPortion {
                measure_unit_name: measure.to_owned(),
                modifier: modifier.to_owned(),
                gram_weight: grams,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_response_mapping() {
        let json = r#"{
            "fdcId": 1750340,
            "description": "Apples, fuji, with skin, raw",
            "dataType": "Foundation",
            "foodNutrients": [
                {"nutrient": {"id": 1008, "name": "Energy", "unitName": "kcal"}, "amount": 63.0},
                {"nutrient": {"id": 1003, "name": "Protein", "unitName": "g"}},
                {"amount": 4.0}
            ],
            "foodPortions": [
                {"measureUnit": {"name": "cup"}, "modifier": "sliced", "gramWeight": 109.0},
                {"measureUnit": {"name": "undetermined"}, "portionDescription": "1 medium", "gramWeight": 200.0},
                {"measureUnit": {"name": "cup"}}
            ]
        }"#;
        let response: FoodDetailsResponse = serde_json::from_str(json).unwrap();
        let detail = FoodDetail::from(response);

        assert_eq!(detail.id, 1_750_340);
        assert_eq!(detail.nutrients.len(), 2);
        assert!((detail.nutrients[1].value).abs() < f64::EPSILON);
        assert_eq!(detail.portions.len(), 2);
        assert_eq!(detail.portions[1].modifier, "1 medium");
    }

    #[test]
    fn test_branded_serving_becomes_portion() {
        let json = r#"{
            "fdcId": 2041155,
            "description": "GRANOLA BAR",
            "dataType": "Branded",
            "servingSize": 40.0,
            "servingSizeUnit": "g",
            "householdServingFullText": "1 bar"
        }"#;
        let response: FoodDetailsResponse = serde_json::from_str(json).unwrap();
        let detail = FoodDetail::from(response);
        assert_eq!(detail.portions.len(), 1);
        assert_eq!(detail.portions[0].measure_unit_name, "serving");
        assert!((detail.portions[0].gram_weight - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_search_hits_without_id_are_dropped() {
        let json = r#"{"foods": [
            {"fdcId": 7, "description": "Apple", "dataType": "Foundation"},
            {"description": "Ghost", "dataType": "Foundation"},
            {"fdcId": 0, "description": "Zero", "dataType": "Foundation"}
        ]}"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        let hits: Vec<FoodSearchHit> = response
            .foods
            .into_iter()
            .filter_map(SearchFood::into_hit)
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 7);
    }

    #[test]
    fn test_search_body_serialization() {
        let body = SearchBody {
            query: "apple",
            page_size: 1,
            data_type: Some([DataType::Foundation.as_str()]),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["pageSize"], 1);
        assert_eq!(json["dataType"][0], "Foundation");
    }
}
