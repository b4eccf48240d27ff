use std::sync::Arc;

use analog_fields::FieldsEngine;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: the pool and engine are handles, the config is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: analog_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Custom-fields read/write engine.
    pub fields: FieldsEngine,
}
