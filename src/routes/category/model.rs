use chrono::{DateTime, Utc};
use redis::Client as RedisClient;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use sqlx::types::Json;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::routes::menu::model::invalidate_menu_cache;

pub const MINUTES_PER_DAY: i16 = 1440;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub category_id: String,
    pub restaurant_id: String,
    pub display_name: Json<HashMap<String, String>>,
    pub sort_order: i32,
    pub visible_from: Option<i16>,
    pub visible_until: Option<i16>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub display_name: HashMap<String, String>,
    #[serde(default)]
    pub sort_order: i32,
    pub visible_from: Option<i16>,
    pub visible_until: Option<i16>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub category_id: String,
    pub display_name: HashMap<String, String>,
    #[serde(default)]
    pub sort_order: i32,
    pub visible_from: Option<i16>,
    pub visible_until: Option<i16>,
}

#[derive(Debug, Serialize)]
pub struct CategoryInfo {
    pub category_id: String,
    pub display_name: HashMap<String, String>,
    pub sort_order: i32,
    pub visible_from: Option<i16>,
    pub visible_until: Option<i16>,
}

impl From<Category> for CategoryInfo {
    fn from(category: Category) -> Self {
        Self {
            category_id: category.category_id,
            display_name: category.display_name.0,
            sort_order: category.sort_order,
            visible_from: category.visible_from,
            visible_until: category.visible_until,
        }
    }
}

/// Both bounds set and in range, or neither. Rejecting here keeps the
/// visibility filter free of malformed minute values.
pub fn validate_window(visible_from: Option<i16>, visible_until: Option<i16>) -> Result<(), String> {
    match (visible_from, visible_until) {
        (None, None) => Ok(()),
        (Some(start), Some(end)) => {
            if (0..MINUTES_PER_DAY).contains(&start) && (0..MINUTES_PER_DAY).contains(&end) {
                Ok(())
            } else {
                Err(format!(
                    "visibility window bounds must be minutes in [0, {})",
                    MINUTES_PER_DAY
                ))
            }
        }
        _ => Err("visible_from and visible_until must be set together".to_string()),
    }
}

impl Category {
    /// Daily window in minutes since local midnight, present only when both
    /// bounds are stored. `start > end` means the window wraps past midnight.
    pub fn visibility_window(&self) -> Option<(u16, u16)> {
        match (self.visible_from, self.visible_until) {
            (Some(start), Some(end)) => Some((start as u16, end as u16)),
            _ => None,
        }
    }

    pub async fn create(
        pool: &PgPool,
        redis: &Arc<RedisClient>,
        req: CreateCategoryRequest,
        restaurant_id: String,
    ) -> Result<Self, sqlx::Error> {
        let category_id = Uuid::new_v4().to_string();

        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (
                category_id, restaurant_id, display_name, sort_order,
                visible_from, visible_until, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING
                category_id, restaurant_id, display_name, sort_order,
                visible_from, visible_until, created_at
            "#,
        )
        .bind(&category_id)
        .bind(&restaurant_id)
        .bind(Json(req.display_name))
        .bind(req.sort_order)
        .bind(req.visible_from)
        .bind(req.visible_until)
        .fetch_one(pool)
        .await?;

        invalidate_menu_cache(redis, &restaurant_id).await;

        Ok(category)
    }

    pub async fn update(
        pool: &PgPool,
        redis: &Arc<RedisClient>,
        req: UpdateCategoryRequest,
        restaurant_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET display_name = $3, sort_order = $4, visible_from = $5, visible_until = $6
            WHERE category_id = $1 AND restaurant_id = $2
            RETURNING
                category_id, restaurant_id, display_name, sort_order,
                visible_from, visible_until, created_at
            "#,
        )
        .bind(&req.category_id)
        .bind(restaurant_id)
        .bind(Json(req.display_name))
        .bind(req.sort_order)
        .bind(req.visible_from)
        .bind(req.visible_until)
        .fetch_optional(pool)
        .await?;

        if category.is_some() {
            invalidate_menu_cache(redis, restaurant_id).await;
        }

        Ok(category)
    }

    pub async fn delete(
        pool: &PgPool,
        redis: &Arc<RedisClient>,
        category_id: &str,
        restaurant_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        // items keep living as uncategorized
        sqlx::query(
            r#"
            UPDATE menu_items
            SET category_id = NULL
            WHERE category_id = $1 AND restaurant_id = $2
            "#,
        )
        .bind(category_id)
        .bind(restaurant_id)
        .execute(&mut *tx)
        .await?;

        let deleted = sqlx::query(
            r#"
            DELETE FROM categories
            WHERE category_id = $1 AND restaurant_id = $2
            "#,
        )
        .bind(category_id)
        .bind(restaurant_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let deleted = deleted.rows_affected() > 0;
        if deleted {
            invalidate_menu_cache(redis, restaurant_id).await;
        }

        Ok(deleted)
    }

    pub async fn list(pool: &PgPool, restaurant_id: &str) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            r#"
            SELECT
                category_id, restaurant_id, display_name, sort_order,
                visible_from, visible_until, created_at
            FROM categories
            WHERE restaurant_id = $1
            ORDER BY sort_order, created_at
            "#,
        )
        .bind(restaurant_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_requires_both_bounds() {
        assert!(validate_window(None, None).is_ok());
        assert!(validate_window(Some(540), Some(720)).is_ok());
        assert!(validate_window(Some(540), None).is_err());
        assert!(validate_window(None, Some(720)).is_err());
    }

    #[test]
    fn window_bounds_must_be_minutes_of_day() {
        assert!(validate_window(Some(0), Some(1439)).is_ok());
        assert!(validate_window(Some(1320), Some(120)).is_ok()); // overnight is legal
        assert!(validate_window(Some(1440), Some(120)).is_err());
        assert!(validate_window(Some(-1), Some(120)).is_err());
        assert!(validate_window(Some(0), Some(1440)).is_err());
    }
}
