use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use std::sync::Arc;

use crate::db::services::association_service::{self, AssignmentAction};
use crate::db::services::tag_service::{self, TagFilter};
use crate::web::middleware::i18n::current_locale;
use crate::web::models::{
    ApiResponse, AssignmentRequest, CreateTagRequest, DeleteTagQuery, ListTagsQuery, TagResponse,
};
use crate::web::routes::{parse_user_id, parse_uuid, present};
use crate::web::{AppError, AppState};

// --- Route Handlers ---

async fn list_tags_handler(
    State(app_state): State<Arc<AppState>>,
    query: Result<Query<ListTagsQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<TagResponse>>>, AppError> {
    let Query(query) = query?;

    let filter = TagFilter {
        id: query
            .tag_id
            .as_deref()
            .map(|raw| parse_uuid("tag_id", raw))
            .transpose()?,
        name: query.tag_name,
        scope: query.scope,
        owner_id: query.user_id.as_deref().map(parse_user_id).transpose()?,
    };

    let tags = tag_service::find_tags(&app_state.db_pool, &filter).await?;
    let tags: Vec<TagResponse> = tags.into_iter().map(TagResponse::from).collect();
    Ok(Json(ApiResponse::success(t!("tags.listed", locale = &current_locale()), tags)))
}

async fn create_tag_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<CreateTagRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<String>>), AppError> {
    let Json(payload) = payload?;
    let user_id = payload.user_id.ok_or_else(|| {
        AppError::InvalidInput(t!("errors.validation", locale = &current_locale(), detail = "user_id is required").to_string())
    })?;

    tag_service::create_tag(
        &app_state.db_pool,
        payload.tag_name.as_deref(),
        payload.scope.as_deref(),
        user_id,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::done(t!("tags.created", locale = &current_locale())))))
}

async fn delete_tag(
    app_state: &AppState,
    raw_tag_id: Option<String>,
    raw_user_id: Option<String>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    let raw_tag_id =
        present(raw_tag_id).ok_or_else(|| AppError::MissingTagId(t!("tags.id_required", locale = &current_locale()).to_string()))?;
    let raw_user_id =
        present(raw_user_id).ok_or_else(|| AppError::MissingUserId(t!("users.id_required", locale = &current_locale()).to_string()))?;
    let tag_id = parse_uuid("tag_id", &raw_tag_id)?;
    let user_id = parse_user_id(&raw_user_id)?;

    tag_service::delete_tag_as(
        &app_state.db_pool,
        tag_id,
        user_id,
        app_state.config.admin_user_id,
    )
    .await?;

    Ok(Json(ApiResponse::done(t!("tags.deleted", locale = &current_locale()))))
}

async fn delete_tag_by_query_handler(
    State(app_state): State<Arc<AppState>>,
    query: Result<Query<DeleteTagQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    let Query(query) = query?;
    delete_tag(&app_state, query.tag_id, query.user_id).await
}

async fn delete_tag_by_path_handler(
    State(app_state): State<Arc<AppState>>,
    Path(tag_id): Path<String>,
    query: Result<Query<DeleteTagQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    let Query(query) = query?;
    delete_tag(&app_state, Some(tag_id), query.user_id).await
}

async fn assignment_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<AssignmentRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    let Json(payload) = payload?;

    let action: AssignmentAction = payload.action.as_deref().unwrap_or_default().parse()?;
    let tag_name = payload
        .tag_name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::InvalidInput(t!("errors.validation", locale = &current_locale(), detail = "tag_name is required").to_string()))?;

    let message = match action {
        AssignmentAction::Assign => {
            association_service::assign(
                &app_state.db_pool,
                &tag_name,
                payload.scope.as_deref(),
                &payload.vm_ids,
            )
            .await
            .map_err(AppError::from_assignment)?;
            t!("tags.assigned", locale = &current_locale()).to_string()
        }
        AssignmentAction::Unassign => {
            association_service::unassign(
                &app_state.db_pool,
                &tag_name,
                payload.scope.as_deref(),
                &payload.vm_ids,
            )
            .await
            .map_err(AppError::from_assignment)?;
            t!("tags.unassigned", locale = &current_locale()).to_string()
        }
    };

    Ok(Json(ApiResponse::done(message)))
}

// --- Router ---

pub fn create_tags_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(list_tags_handler)
                .post(create_tag_handler)
                .delete(delete_tag_by_query_handler),
        )
        .route("/assignments", post(assignment_handler))
        .route("/{tag_id}", delete(delete_tag_by_path_handler))
}
