//! Handlers for field definitions, nested under a group for listing and
//! creation and addressed directly for update and delete.

use analog_core::error::CoreError;
use analog_core::types::DbId;
use analog_db::models::field::{CreateField, Field, UpdateField};
use analog_db::repositories::FieldRepo;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::field_groups::find_group;
use crate::response::DataResponse;
use crate::state::AppState;

fn field_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Field", id })
}

/// GET /api/v1/field-groups/{group_id}/fields
pub async fn list_by_group(
    State(state): State<AppState>,
    Path(group_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Field>>>> {
    find_group(&state, group_id).await?;
    let fields = FieldRepo::list_by_group(&state.pool, group_id).await?;
    Ok(Json(DataResponse { data: fields }))
}

/// POST /api/v1/field-groups/{group_id}/fields
pub async fn create(
    State(state): State<AppState>,
    Path(group_id): Path<DbId>,
    Json(input): Json<CreateField>,
) -> AppResult<(StatusCode, Json<DataResponse<Field>>)> {
    input.validate()?;
    find_group(&state, group_id).await?;
    let settings = input.normalize()?;
    let field = FieldRepo::create(&state.pool, group_id, &settings).await?;
    tracing::info!(group_id, field_id = field.id, field_type = %field.field_type, "Created field");
    Ok((StatusCode::CREATED, Json(DataResponse { data: field })))
}

/// PUT /api/v1/fields/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateField>,
) -> AppResult<Json<DataResponse<Field>>> {
    input.validate()?;
    let existing = FieldRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| field_not_found(id))?;
    let settings = input.apply_to(&existing)?;
    let field = FieldRepo::update(&state.pool, id, &settings)
        .await?
        .ok_or_else(|| field_not_found(id))?;
    tracing::info!(field_id = id, "Updated field");
    Ok(Json(DataResponse { data: field }))
}

/// DELETE /api/v1/fields/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    if FieldRepo::delete(&state.pool, id).await? {
        tracing::info!(field_id = id, "Deleted field");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(field_not_found(id))
    }
}
