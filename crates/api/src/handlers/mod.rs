pub mod custom_fields;
pub mod field_groups;
pub mod fields;
