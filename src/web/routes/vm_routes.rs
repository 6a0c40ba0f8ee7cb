use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::services::association_service;
use crate::db::services::vm_service::{self, VmFilter};
use crate::web::middleware::i18n::current_locale;
use crate::web::models::{ApiResponse, CreateVmRequest, ListVmsQuery, UpdateVmTagsRequest, VmResponse};
use crate::web::{AppError, AppState};

// --- Route Handlers ---

async fn list_vms_handler(
    State(app_state): State<Arc<AppState>>,
    query: Result<Query<ListVmsQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<VmResponse>>>, AppError> {
    let Query(query) = query?;
    let filter = VmFilter {
        tag_name: query.tag_name,
        scope: query.scope,
    };

    let vms = vm_service::find_vms(&app_state.db_pool, &filter).await?;
    let vms: Vec<VmResponse> = vms.into_iter().map(VmResponse::from).collect();
    Ok(Json(ApiResponse::success(t!("vms.listed", locale = &current_locale()), vms)))
}

async fn create_vm_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<CreateVmRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<String>>), AppError> {
    let Json(payload) = payload?;
    let vm_name = payload
        .vm_name
        .ok_or_else(|| AppError::InvalidInput(t!("errors.validation", locale = &current_locale(), detail = "vm_name is required").to_string()))?;

    association_service::create_vm_with_tag(
        &app_state.db_pool,
        &vm_name,
        payload.tag_name.as_deref(),
        payload.scope.as_deref(),
        payload.user_id,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::done(t!("vms.created", locale = &current_locale())))))
}

async fn update_vm_tags_handler(
    State(app_state): State<Arc<AppState>>,
    vm_id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateVmTagsRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    let Path(vm_id) = vm_id?;
    let Json(payload) = payload?;

    vm_service::update_vm_tag_set(&app_state.db_pool, vm_id, &payload.tag_ids).await?;

    Ok(Json(ApiResponse::done(t!("vms.updated", locale = &current_locale()))))
}

async fn delete_vm_handler(
    State(app_state): State<Arc<AppState>>,
    vm_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    let Path(vm_id) = vm_id?;

    vm_service::delete_vm(&app_state.db_pool, vm_id).await?;

    Ok(Json(ApiResponse::done(t!("vms.deleted", locale = &current_locale()))))
}

// --- Router ---

pub fn create_vms_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_vms_handler).post(create_vm_handler))
        .route("/{vm_id}", put(update_vm_tags_handler).delete(delete_vm_handler))
}
