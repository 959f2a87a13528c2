// ABOUTME: SQLite detail cache storing one serialized food detail per canonical id
// ABOUTME: Upserts replace the whole row; the schema is created on connect
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::debug;

use super::DetailCache;
use crate::errors::{AppError, AppResult};
use crate::models::{FoodDetail, FoodId};

/// Durable detail cache
#[derive(Debug, Clone)]
pub struct SqliteDetailCache {
    pool: SqlitePool,
}

impl SqliteDetailCache {
    /// Connect to `database_url` and create the cache table if needed
    ///
    /// In-memory URLs are pinned to a single long-lived connection, since every
    /// new `SQLite` memory connection would otherwise see an empty database.
    ///
    /// # Errors
    ///
    /// Returns a database error if the URL is invalid or the connection or
    /// schema creation fails
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::database(format!("Invalid cache database URL: {e}")))?
            .create_if_missing(true);

        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| AppError::database(format!("Failed to open detail cache: {e}")))?;

        let cache = Self { pool };
        cache.migrate().await?;
        Ok(cache)
    }

    /// Create the cache table
    ///
    /// # Errors
    ///
    /// Returns a database error if the statement fails
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS food_detail_cache (
                fdc_id INTEGER PRIMARY KEY,
                detail_json TEXT NOT NULL,
                cached_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create detail cache table: {e}")))?;
        Ok(())
    }
}

impl SqliteDetailCache {
    /// When the record for `id` was last written
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails
    pub async fn cached_at(&self, id: FoodId) -> AppResult<Option<DateTime<Utc>>> {
        sqlx::query_scalar::<_, DateTime<Utc>>(
            r"
            SELECT cached_at
            FROM food_detail_cache
            WHERE fdc_id = ?1
            ",
        )
        .bind(to_row_id(id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to read cache timestamp: {e}")))
    }
}

/// `SQLite` stores integers as signed 64-bit
fn to_row_id(id: FoodId) -> AppResult<i64> {
    i64::try_from(id).map_err(|_| AppError::invalid_input(format!("Food id {id} out of range")))
}

#[async_trait]
impl DetailCache for SqliteDetailCache {
    async fn get(&self, id: FoodId) -> AppResult<Option<FoodDetail>> {
        let row = sqlx::query(
            r"
            SELECT detail_json
            FROM food_detail_cache
            WHERE fdc_id = ?1
            ",
        )
        .bind(to_row_id(id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to read cached detail: {e}")))?;

        row.map_or(Ok(None), |row| {
            let json: String = row.get("detail_json");
            let detail = serde_json::from_str(&json)?;
            debug!(fdc_id = id, "Detail cache hit");
            Ok(Some(detail))
        })
    }

    async fn put(&self, id: FoodId, detail: &FoodDetail) -> AppResult<()> {
        let json = serde_json::to_string(detail)?;
        let now = Utc::now();

        sqlx::query(
            r"
            INSERT INTO food_detail_cache (fdc_id, detail_json, cached_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(fdc_id) DO UPDATE SET
                detail_json = ?2,
                cached_at = ?3
            ",
        )
        .bind(to_row_id(id)?)
        .bind(&json)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to store detail: {e}")))?;

        Ok(())
    }

    async fn len(&self) -> AppResult<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM food_detail_cache")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count cached details: {e}")))?;
        let count: i64 = row.get("n");
        Ok(usize::try_from(count).unwrap_or_default())
    }
}
