//! Handlers for the `/field-groups` resource.

use analog_core::error::CoreError;
use analog_core::types::DbId;
use analog_db::models::field::Field;
use analog_db::models::field_group::{
    BulkFieldGroupRequest, CreateFieldGroup, FieldGroup, FieldGroupListParams, FieldGroupPage,
    UpdateFieldGroup,
};
use analog_db::repositories::{FieldGroupRepo, FieldRepo};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// A field group together with its field definitions, by position.
#[derive(Debug, Serialize)]
pub struct FieldGroupDetail {
    #[serde(flatten)]
    pub group: FieldGroup,
    pub definitions: Vec<Field>,
}

#[derive(Debug, Serialize)]
pub struct BulkResult {
    pub affected: u64,
}

pub(crate) async fn find_group(state: &AppState, id: DbId) -> AppResult<FieldGroup> {
    FieldGroupRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "FieldGroup",
            id,
        }))
}

/// GET /api/v1/field-groups
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<FieldGroupListParams>,
) -> AppResult<Json<DataResponse<FieldGroupPage>>> {
    let page = FieldGroupRepo::list(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: page }))
}

/// POST /api/v1/field-groups
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateFieldGroup>,
) -> AppResult<(StatusCode, Json<DataResponse<FieldGroup>>)> {
    input.validate()?;
    let settings = input.normalize()?;
    let group = FieldGroupRepo::create(&state.pool, &settings).await?;
    tracing::info!(group_id = group.id, slug = %group.slug, "Created field group");
    Ok((StatusCode::CREATED, Json(DataResponse { data: group })))
}

/// GET /api/v1/field-groups/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<FieldGroupDetail>>> {
    let group = find_group(&state, id).await?;
    let definitions = FieldRepo::list_by_group(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: FieldGroupDetail { group, definitions },
    }))
}

/// PUT /api/v1/field-groups/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateFieldGroup>,
) -> AppResult<Json<DataResponse<FieldGroup>>> {
    input.validate()?;
    let existing = find_group(&state, id).await?;
    let settings = input.apply_to(&existing)?;
    let group = FieldGroupRepo::update(&state.pool, id, &settings)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "FieldGroup",
            id,
        }))?;
    tracing::info!(group_id = id, "Updated field group");
    Ok(Json(DataResponse { data: group }))
}

/// DELETE /api/v1/field-groups/{id}
///
/// Removes the group's definitions, values and repeater instances with it.
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    if FieldGroupRepo::delete(&state.pool, id).await? {
        tracing::info!(group_id = id, "Deleted field group");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "FieldGroup",
            id,
        }))
    }
}

/// POST /api/v1/field-groups/bulk
pub async fn bulk(
    State(state): State<AppState>,
    Json(input): Json<BulkFieldGroupRequest>,
) -> AppResult<Json<DataResponse<BulkResult>>> {
    if input.ids.is_empty() {
        return Err(AppError::BadRequest("No field groups selected".into()));
    }
    let affected = FieldGroupRepo::bulk_apply(&state.pool, &input.ids, &input.action).await?;
    tracing::info!(action = ?input.action, ids = ?input.ids, affected, "Applied bulk field group action");
    Ok(Json(DataResponse {
        data: BulkResult { affected },
    }))
}
