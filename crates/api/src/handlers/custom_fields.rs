//! Handlers for custom-field values: the edit form, the render tree, saves
//! and repeater maintenance.

use analog_core::submission::{FieldSubmission, UploadedFile, WriteMode};
use analog_core::types::DbId;
use analog_db::models::field_value::FieldValue;
use analog_db::models::repeater::{ReorderRepeaters, RepeaterInstance};
use analog_fields::{PurgeSummary, RenderTree, ResolvedFieldGroup, UpdateOutcome};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Form keys that select the write mode on the generic save route.
const IN_REPEATER_KEY: &str = "in_repeater";
const UPDATE_REPEATER_KEY: &str = "update_repeater";

/// Query parameters for `GET /api/v1/custom-fields`.
#[derive(Debug, Deserialize)]
pub struct CustomFieldsQuery {
    pub recipient: Option<String>,
    pub template: Option<String>,
    pub owner: Option<DbId>,
}

/// GET /api/v1/custom-fields?recipient=&template=&owner=
pub async fn get(
    State(state): State<AppState>,
    Query(query): Query<CustomFieldsQuery>,
) -> AppResult<Json<DataResponse<Vec<ResolvedFieldGroup>>>> {
    let groups = state
        .fields
        .get(
            query.recipient.as_deref().unwrap_or_default(),
            query.template.as_deref(),
            query.owner,
        )
        .await?;
    Ok(Json(DataResponse { data: groups }))
}

/// GET /api/v1/custom-fields/{owner}/render
pub async fn render(
    State(state): State<AppState>,
    Path(owner): Path<DbId>,
) -> AppResult<Json<DataResponse<RenderTree>>> {
    let tree = state.fields.render(Some(owner)).await?;
    Ok(Json(DataResponse { data: tree }))
}

/// POST /api/v1/custom-fields/{owner}
///
/// Saves plain values. The legacy `in_repeater` / `update_repeater` form
/// flags switch to the repeater modes.
pub async fn save(
    State(state): State<AppState>,
    Path(owner): Path<DbId>,
    multipart: Multipart,
) -> AppResult<Json<DataResponse<UpdateOutcome>>> {
    let submission = read_submission(multipart).await?;
    let mode = WriteMode::from_flags(
        is_set(&submission, IN_REPEATER_KEY),
        is_set(&submission, UPDATE_REPEATER_KEY),
    );
    let outcome = state.fields.update(submission, Some(owner), mode).await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/custom-fields/{owner}/repeaters
pub async fn create_repeater(
    State(state): State<AppState>,
    Path(owner): Path<DbId>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<UpdateOutcome>>)> {
    let submission = read_submission(multipart).await?;
    let outcome = state
        .fields
        .update(submission, Some(owner), WriteMode::NewRepeater)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: outcome })))
}

/// PUT /api/v1/custom-fields/{owner}/repeaters
pub async fn update_repeater(
    State(state): State<AppState>,
    Path(owner): Path<DbId>,
    multipart: Multipart,
) -> AppResult<Json<DataResponse<UpdateOutcome>>> {
    let submission = read_submission(multipart).await?;
    let outcome = state
        .fields
        .update(submission, Some(owner), WriteMode::RepeaterInPlace)
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// DELETE /api/v1/custom-fields/{owner}
///
/// Called when the content item itself is deleted.
pub async fn purge(
    State(state): State<AppState>,
    Path(owner): Path<DbId>,
) -> AppResult<Json<DataResponse<PurgeSummary>>> {
    let summary = state.fields.purge_owner(owner).await?;
    Ok(Json(DataResponse { data: summary }))
}

/// PUT /api/v1/repeaters/positions
pub async fn reorder_repeaters(
    State(state): State<AppState>,
    Json(input): Json<ReorderRepeaters>,
) -> AppResult<Json<DataResponse<Vec<RepeaterInstance>>>> {
    let instances = state.fields.reorder_repeaters(&input).await?;
    Ok(Json(DataResponse { data: instances }))
}

/// DELETE /api/v1/repeaters/{id}
pub async fn delete_repeater(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.fields.delete_repeater(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/field-values/{id}/file
pub async fn clear_file(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<FieldValue>>> {
    let value = state.fields.clear_file(id).await?;
    Ok(Json(DataResponse { data: value }))
}

/// Collect every multipart part into a [`FieldSubmission`].
///
/// Parts with a file name are files; empty file inputs (no name, no bytes)
/// are dropped so they read as "no upload".
async fn read_submission(mut multipart: Multipart) -> AppResult<FieldSubmission> {
    let mut submission = FieldSubmission::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                submission.push_file(
                    name,
                    UploadedFile {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    },
                );
            }
            None => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                submission.push_text(name, text);
            }
        }
    }

    Ok(submission)
}

fn is_set(submission: &FieldSubmission, key: &str) -> bool {
    matches!(submission.text(key), Some("true" | "1" | "on"))
}
