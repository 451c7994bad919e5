use chrono::{DateTime, Utc};
use redis::Client as RedisClient;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use sqlx::types::Json;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::routes::menu::model::invalidate_menu_cache;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MenuItem {
    pub item_id: String,
    pub restaurant_id: String,
    pub category_id: Option<String>,
    pub display_name: Json<HashMap<String, String>>,
    pub allergens: Vec<String>,
    pub price_cents: i32,
    pub is_available: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub display_name: HashMap<String, String>,
    pub category_id: Option<String>,
    #[serde(default)]
    pub allergens: Vec<String>,
    pub price_cents: i32,
    #[serde(default = "default_available")]
    pub is_available: bool,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub item_id: String,
    pub display_name: HashMap<String, String>,
    pub category_id: Option<String>,
    #[serde(default)]
    pub allergens: Vec<String>,
    pub price_cents: i32,
    pub is_available: bool,
    #[serde(default)]
    pub sort_order: i32,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct MenuItemInfo {
    pub item_id: String,
    pub category_id: Option<String>,
    pub display_name: HashMap<String, String>,
    pub allergens: Vec<String>,
    pub price_cents: i32,
    pub is_available: bool,
    pub sort_order: i32,
}

impl From<MenuItem> for MenuItemInfo {
    fn from(item: MenuItem) -> Self {
        Self {
            item_id: item.item_id,
            category_id: item.category_id,
            display_name: item.display_name.0,
            allergens: item.allergens,
            price_cents: item.price_cents,
            is_available: item.is_available,
            sort_order: item.sort_order,
        }
    }
}

const ITEM_COLUMNS: &str = r#"
    item_id, restaurant_id, category_id, display_name, allergens,
    price_cents, is_available, sort_order, created_at
"#;

impl MenuItem {
    pub async fn create(
        pool: &PgPool,
        redis: &Arc<RedisClient>,
        req: CreateItemRequest,
        restaurant_id: String,
    ) -> Result<Self, sqlx::Error> {
        let item_id = Uuid::new_v4().to_string();

        let item = sqlx::query_as::<_, MenuItem>(&format!(
            r#"
            INSERT INTO menu_items (
                {ITEM_COLUMNS}
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(&item_id)
        .bind(&restaurant_id)
        .bind(&req.category_id)
        .bind(Json(req.display_name))
        .bind(&req.allergens)
        .bind(req.price_cents)
        .bind(req.is_available)
        .bind(req.sort_order)
        .fetch_one(pool)
        .await?;

        invalidate_menu_cache(redis, &restaurant_id).await;

        Ok(item)
    }

    pub async fn update(
        pool: &PgPool,
        redis: &Arc<RedisClient>,
        req: UpdateItemRequest,
        restaurant_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let item = sqlx::query_as::<_, MenuItem>(&format!(
            r#"
            UPDATE menu_items
            SET category_id = $3, display_name = $4, allergens = $5,
                price_cents = $6, is_available = $7, sort_order = $8
            WHERE item_id = $1 AND restaurant_id = $2
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(&req.item_id)
        .bind(restaurant_id)
        .bind(&req.category_id)
        .bind(Json(req.display_name))
        .bind(&req.allergens)
        .bind(req.price_cents)
        .bind(req.is_available)
        .bind(req.sort_order)
        .fetch_optional(pool)
        .await?;

        if item.is_some() {
            invalidate_menu_cache(redis, restaurant_id).await;
        }

        Ok(item)
    }

    pub async fn delete(
        pool: &PgPool,
        redis: &Arc<RedisClient>,
        item_id: &str,
        restaurant_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let deleted = sqlx::query(
            r#"
            DELETE FROM menu_items
            WHERE item_id = $1 AND restaurant_id = $2
            "#,
        )
        .bind(item_id)
        .bind(restaurant_id)
        .execute(pool)
        .await?;

        let deleted = deleted.rows_affected() > 0;
        if deleted {
            invalidate_menu_cache(redis, restaurant_id).await;
        }

        Ok(deleted)
    }

    pub async fn list(pool: &PgPool, restaurant_id: &str) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, MenuItem>(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM menu_items
            WHERE restaurant_id = $1
            ORDER BY sort_order, created_at
            "#
        ))
        .bind(restaurant_id)
        .fetch_all(pool)
        .await
    }

    /// Only items the owner has marked available; the time-window filter
    /// runs downstream of this.
    pub async fn list_available(
        pool: &PgPool,
        restaurant_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, MenuItem>(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM menu_items
            WHERE restaurant_id = $1 AND is_available = TRUE
            ORDER BY sort_order, created_at
            "#
        ))
        .bind(restaurant_id)
        .fetch_all(pool)
        .await
    }
}
