//! Route definitions for field groups and field definitions.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{field_groups, fields};
use crate::state::AppState;

/// Routes mounted at `/field-groups`.
///
/// ```text
/// GET    /                       -> list
/// POST   /                       -> create
/// POST   /bulk                   -> bulk
/// GET    /{id}                   -> get_by_id
/// PUT    /{id}                   -> update
/// DELETE /{id}                   -> delete
/// GET    /{id}/fields            -> fields::list_by_group
/// POST   /{id}/fields            -> fields::create
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(field_groups::list).post(field_groups::create))
        .route("/bulk", post(field_groups::bulk))
        .route(
            "/{id}",
            get(field_groups::get_by_id)
                .put(field_groups::update)
                .delete(field_groups::delete),
        )
        .route(
            "/{id}/fields",
            get(fields::list_by_group).post(fields::create),
        )
}

/// Routes mounted at `/fields`.
///
/// ```text
/// PUT    /{id}                   -> update
/// DELETE /{id}                   -> delete
/// ```
pub fn fields_router() -> Router<AppState> {
    Router::new().route("/{id}", put(fields::update).delete(fields::delete))
}
