//! Domain logic for the Analog custom-fields engine.
//!
//! This crate performs no I/O. It holds the rules shared by the persistence
//! layer, the fields resolver and the HTTP host: field kinds and their
//! parameters, field-group binding rules, slug generation, listing helpers and
//! the decoding of submitted field data.

pub mod error;
pub mod field_group;
pub mod field_kind;
pub mod listing;
pub mod slug;
pub mod submission;
pub mod types;
