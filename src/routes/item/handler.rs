use axum::{
    Extension,
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::AppState;
use crate::utils::{Claims, error_codes, error_to_api_response, success_to_api_response};

use super::model::{CreateItemRequest, MenuItem, MenuItemInfo, UpdateItemRequest};

#[derive(Debug, Deserialize)]
pub struct DeleteItemRequest {
    pub item_id: String,
}

#[axum::debug_handler]
pub async fn create_item(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateItemRequest>,
) -> impl IntoResponse {
    match MenuItem::create(&state.pool, &state.redis, req, claims.sub).await {
        Ok(item) => (
            StatusCode::CREATED,
            success_to_api_response(MenuItemInfo::from(item)),
        ),
        Err(e) => {
            tracing::error!("Failed to create menu item: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn update_item(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateItemRequest>,
) -> impl IntoResponse {
    match MenuItem::update(&state.pool, &state.redis, req, &claims.sub).await {
        Ok(Some(item)) => (
            StatusCode::OK,
            success_to_api_response(MenuItemInfo::from(item)),
        ),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            error_to_api_response(error_codes::NOT_FOUND, "Menu item not found".to_string()),
        ),
        Err(e) => {
            tracing::error!("Failed to update menu item: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn delete_item(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<DeleteItemRequest>,
) -> impl IntoResponse {
    match MenuItem::delete(&state.pool, &state.redis, &req.item_id, &claims.sub).await {
        Ok(true) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({ "deleted": true })),
        ),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            error_to_api_response(error_codes::NOT_FOUND, "Menu item not found".to_string()),
        ),
        Err(e) => {
            tracing::error!("Failed to delete menu item: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn list_items(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    match MenuItem::list(&state.pool, &claims.sub).await {
        Ok(items) => {
            let infos = items.into_iter().map(MenuItemInfo::from).collect::<Vec<_>>();
            (StatusCode::OK, success_to_api_response(infos))
        }
        Err(e) => {
            tracing::error!("Failed to list menu items: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
            )
        }
    }
}
