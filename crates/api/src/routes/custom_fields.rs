//! Route definitions for custom-field values and repeater instances.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::custom_fields;
use crate::state::AppState;

/// Routes mounted at `/custom-fields`.
///
/// ```text
/// GET    /?recipient&template&owner  -> get
/// POST   /{owner}                    -> save (multipart)
/// DELETE /{owner}                    -> purge
/// GET    /{owner}/render             -> render
/// POST   /{owner}/repeaters          -> create_repeater (multipart)
/// PUT    /{owner}/repeaters          -> update_repeater (multipart)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(custom_fields::get))
        .route(
            "/{owner}",
            post(custom_fields::save).delete(custom_fields::purge),
        )
        .route("/{owner}/render", get(custom_fields::render))
        .route(
            "/{owner}/repeaters",
            post(custom_fields::create_repeater).put(custom_fields::update_repeater),
        )
}

/// Routes mounted at `/repeaters`.
///
/// ```text
/// PUT    /positions                  -> reorder_repeaters
/// DELETE /{id}                       -> delete_repeater
/// ```
pub fn repeaters_router() -> Router<AppState> {
    Router::new()
        .route("/positions", put(custom_fields::reorder_repeaters))
        .route("/{id}", delete(custom_fields::delete_repeater))
}

/// Routes mounted at `/field-values`.
///
/// ```text
/// DELETE /{id}/file                  -> clear_file
/// ```
pub fn field_values_router() -> Router<AppState> {
    Router::new().route("/{id}/file", delete(custom_fields::clear_file))
}
