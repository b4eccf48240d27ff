pub mod custom_fields;
pub mod field_groups;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /field-groups                                    list, create
/// /field-groups/bulk                               bulk action (POST)
/// /field-groups/{id}                               get, update, delete
/// /field-groups/{id}/fields                        list, create definitions
///
/// /fields/{id}                                     update, delete definition
///
/// /custom-fields?recipient&template&owner          edit form groups (GET)
/// /custom-fields/{owner}                           save (POST), purge (DELETE)
/// /custom-fields/{owner}/render                    render tree (GET)
/// /custom-fields/{owner}/repeaters                 new instance (POST), edit in place (PUT)
///
/// /repeaters/positions                             reorder (PUT)
/// /repeaters/{id}                                  delete instance
///
/// /field-values/{id}/file                          clear file (DELETE)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/field-groups", field_groups::router())
        .nest("/fields", field_groups::fields_router())
        .nest("/custom-fields", custom_fields::router())
        .nest("/repeaters", custom_fields::repeaters_router())
        .nest("/field-values", custom_fields::field_values_router())
}
