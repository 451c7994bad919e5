use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    utils::{error_codes, error_to_api_response, verify_token},
};

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let claims = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .and_then(|token| verify_token(token, &state.config).ok());

    match claims {
        Some(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        None => (
            StatusCode::UNAUTHORIZED,
            error_to_api_response::<()>(
                error_codes::AUTH_FAILED,
                "Missing or invalid bearer token".to_string(),
            ),
        )
            .into_response(),
    }
}
