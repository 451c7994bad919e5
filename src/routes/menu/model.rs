use redis::{AsyncCommands, Client as RedisClient};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;

use crate::routes::category::model::{Category, CategoryInfo};
use crate::routes::item::model::{MenuItem, MenuItemInfo};

pub const MENU_CATEGORIES_CACHE_PREFIX: &str = "menu:categories:";
pub const MENU_ITEMS_CACHE_PREFIX: &str = "menu:items:";

#[derive(Debug, Serialize)]
pub struct MenuResponse {
    pub restaurant_id: String,
    pub categories: Vec<CategoryInfo>,
    pub items: Vec<MenuItemInfo>,
}

/// Cache-aside load of the raw category rows. The rows are cached unfiltered;
/// the time-window filter runs on every request since it depends on "now".
pub async fn load_categories(
    pool: &PgPool,
    redis: &Arc<RedisClient>,
    cache_expire_secs: u64,
    restaurant_id: &str,
) -> Result<Vec<Category>, sqlx::Error> {
    let cache_key = format!("{}{}", MENU_CATEGORIES_CACHE_PREFIX, restaurant_id);

    if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
        let cached: redis::RedisResult<String> = conn.get(&cache_key).await;

        if let Ok(json_str) = cached {
            if let Ok(categories) = serde_json::from_str::<Vec<Category>>(&json_str) {
                tracing::debug!("Get menu categories from cache: {}", cache_key);
                return Ok(categories);
            }
        }
    }

    let categories = Category::list(pool, restaurant_id).await?;

    if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
        if let Ok(json_str) = serde_json::to_string(&categories) {
            let _: Result<(), redis::RedisError> =
                conn.set_ex(&cache_key, json_str, cache_expire_secs).await;
            tracing::debug!("Set menu categories to cache: {}", cache_key);
        }
    }

    Ok(categories)
}

pub async fn load_available_items(
    pool: &PgPool,
    redis: &Arc<RedisClient>,
    cache_expire_secs: u64,
    restaurant_id: &str,
) -> Result<Vec<MenuItem>, sqlx::Error> {
    let cache_key = format!("{}{}", MENU_ITEMS_CACHE_PREFIX, restaurant_id);

    if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
        let cached: redis::RedisResult<String> = conn.get(&cache_key).await;

        if let Ok(json_str) = cached {
            if let Ok(items) = serde_json::from_str::<Vec<MenuItem>>(&json_str) {
                tracing::debug!("Get menu items from cache: {}", cache_key);
                return Ok(items);
            }
        }
    }

    let items = MenuItem::list_available(pool, restaurant_id).await?;

    if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
        if let Ok(json_str) = serde_json::to_string(&items) {
            let _: Result<(), redis::RedisError> =
                conn.set_ex(&cache_key, json_str, cache_expire_secs).await;
            tracing::debug!("Set menu items to cache: {}", cache_key);
        }
    }

    Ok(items)
}

/// Drop the cached menu rows after any owner mutation. Best effort, cache
/// misses are always recoverable from the database.
pub async fn invalidate_menu_cache(redis: &Arc<RedisClient>, restaurant_id: &str) {
    if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
        let _: Result<(), redis::RedisError> = conn
            .del(format!("{}{}", MENU_CATEGORIES_CACHE_PREFIX, restaurant_id))
            .await;
        let _: Result<(), redis::RedisError> = conn
            .del(format!("{}{}", MENU_ITEMS_CACHE_PREFIX, restaurant_id))
            .await;
    }
}
