use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;

use crate::db::services::user_service;
use crate::web::middleware::i18n::current_locale;
use crate::web::models::{ApiResponse, UserResponse};
use crate::web::{AppError, AppState};

async fn list_users_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, AppError> {
    let users = user_service::list_users(&app_state.db_pool).await?;
    let users: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(ApiResponse::success(t!("users.listed", locale = &current_locale()), users)))
}

pub fn create_users_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_users_handler))
}
