mod entity;
mod field;

pub(crate) use entity::ParsedEntity;
pub(crate) use field::{ParsedField, RelationSpec};
