//! The custom-fields engine.
//!
//! [`FieldsEngine`] resolves which field groups apply to a content item,
//! merges their definitions with stored values, renders the value tree used
//! by templates, and writes submitted field data back. Uploaded files go
//! through [`storage::Storage`].

pub mod engine;
pub mod error;
pub mod render;
pub mod resolve;
pub mod storage;

pub use engine::{FieldsEngine, PurgeSummary, UpdateOutcome};
pub use error::FieldsError;
pub use render::{RenderTree, RenderedGroup};
pub use resolve::{ResolvedField, ResolvedFieldGroup, ResolvedRepeater, ResolvedRepeaterValue};
pub use storage::{FileStore, LocalFileStore, Storage, StorageError};
