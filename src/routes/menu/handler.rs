use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;

use crate::AppState;
use crate::menu::compute_visibility;
use crate::utils::{error_codes, error_to_api_response, success_to_api_response};

use super::model::{self, MenuResponse};

#[derive(Debug, Deserialize)]
pub struct MenuQuery {
    pub restaurant_id: String,
}

/// Public menu for one restaurant, filtered to the categories and items
/// visible at the current local time.
#[axum::debug_handler]
pub async fn get_menu(
    State(state): State<AppState>,
    Query(query): Query<MenuQuery>,
) -> impl IntoResponse {
    let cache_expire = state.config.menu_cache_expire_secs;

    let categories = match model::load_categories(
        &state.pool,
        &state.redis,
        cache_expire,
        &query.restaurant_id,
    )
    .await
    {
        Ok(categories) => categories,
        Err(e) => {
            tracing::error!("Failed to load menu categories: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
            );
        }
    };

    let items = match model::load_available_items(
        &state.pool,
        &state.redis,
        cache_expire,
        &query.restaurant_id,
    )
    .await
    {
        Ok(items) => items,
        Err(e) => {
            tracing::error!("Failed to load menu items: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
            );
        }
    };

    let (visible_categories, visible_items) =
        compute_visibility(categories, items, Utc::now(), state.config.menu_timezone());

    (
        StatusCode::OK,
        success_to_api_response(MenuResponse {
            restaurant_id: query.restaurant_id,
            categories: visible_categories.into_iter().map(Into::into).collect(),
            items: visible_items.into_iter().map(Into::into).collect(),
        }),
    )
}
