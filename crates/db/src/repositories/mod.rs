//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Methods suffixed `_in` take
//! an open transaction so callers can group several writes atomically.

pub mod field_group_repo;
pub mod field_repo;
pub mod field_value_repo;
pub mod media_repo;
pub mod repeater_repo;

pub use field_group_repo::{FieldGroupRepo, RepoError};
pub use field_repo::FieldRepo;
pub use field_value_repo::FieldValueRepo;
pub use media_repo::MediaRepo;
pub use repeater_repo::RepeaterRepo;
