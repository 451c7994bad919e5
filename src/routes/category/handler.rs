use axum::{
    Extension,
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::AppState;
use crate::utils::{Claims, error_codes, error_to_api_response, success_to_api_response};

use super::model::{
    Category, CategoryInfo, CreateCategoryRequest, UpdateCategoryRequest, validate_window,
};

#[derive(Debug, Deserialize)]
pub struct DeleteCategoryRequest {
    pub category_id: String,
}

#[axum::debug_handler]
pub async fn create_category(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCategoryRequest>,
) -> impl IntoResponse {
    if let Err(msg) = validate_window(req.visible_from, req.visible_until) {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(error_codes::VALIDATION_ERROR, msg),
        );
    }

    match Category::create(&state.pool, &state.redis, req, claims.sub).await {
        Ok(category) => (
            StatusCode::CREATED,
            success_to_api_response(CategoryInfo::from(category)),
        ),
        Err(e) => {
            tracing::error!("Failed to create category: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn update_category(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateCategoryRequest>,
) -> impl IntoResponse {
    if let Err(msg) = validate_window(req.visible_from, req.visible_until) {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(error_codes::VALIDATION_ERROR, msg),
        );
    }

    match Category::update(&state.pool, &state.redis, req, &claims.sub).await {
        Ok(Some(category)) => (
            StatusCode::OK,
            success_to_api_response(CategoryInfo::from(category)),
        ),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            error_to_api_response(error_codes::NOT_FOUND, "Category not found".to_string()),
        ),
        Err(e) => {
            tracing::error!("Failed to update category: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn delete_category(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<DeleteCategoryRequest>,
) -> impl IntoResponse {
    match Category::delete(&state.pool, &state.redis, &req.category_id, &claims.sub).await {
        Ok(true) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({ "deleted": true })),
        ),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            error_to_api_response(error_codes::NOT_FOUND, "Category not found".to_string()),
        ),
        Err(e) => {
            tracing::error!("Failed to delete category: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn list_categories(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    match Category::list(&state.pool, &claims.sub).await {
        Ok(categories) => {
            let infos = categories
                .into_iter()
                .map(CategoryInfo::from)
                .collect::<Vec<_>>();
            (StatusCode::OK, success_to_api_response(infos))
        }
        Err(e) => {
            tracing::error!("Failed to list categories: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
            )
        }
    }
}
