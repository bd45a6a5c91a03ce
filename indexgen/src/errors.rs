use std::fmt;

use thiserror::Error;

/// Top-level error type returned by schema derivation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// Construction inputs are malformed (bad descriptors, unreadable catalogue).
    #[error("configuration error: {message}")]
    Config { message: String },

    /// A selection option contradicts the entity's shape or another option.
    #[error("request malformed: {0}")]
    RequestMalformed(#[from] MalformedReason),

    /// The collection spec was built incorrectly (e.g. a geopoint that is not a pair).
    #[error("type error: {message}")]
    Type { message: String },
}

impl SchemaError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type {
            message: message.into(),
        }
    }

    /// Returns the domain reason when this is a `RequestMalformed` error.
    pub fn reason(&self) -> Option<&MalformedReason> {
        match self {
            SchemaError::RequestMalformed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Domain validation failures. Each variant names the offending set and members.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedReason {
    #[error("field `{field}` has unsupported storage type `{storage}`")]
    UnsupportedType { field: String, storage: String },

    #[error("`{set}` is not a subset of its base set; offending members: {members:?}")]
    NotASubset { set: &'static str, members: Vec<String> },

    #[error("fields are both indexed and skipped: {fields:?}")]
    Overlap { fields: Vec<String> },

    #[error("geopoint members must not be listed in index_fields: {fields:?}")]
    GeopointInIndexFields { fields: Vec<String> },

    #[error("relations must be selected through parents/children, not index_fields: {fields:?}")]
    RelationInIndexFields { fields: Vec<String> },

    #[error("duplicate output field name `{name}`")]
    DuplicateFieldName { name: String },

    #[error("`{set}` contains members that are not matching relations of the entity: {members:?}")]
    RelationMismatch { set: &'static str, members: Vec<String> },

    #[error("relation `{relation}` references its own entity `{entity}`")]
    SelfReference { entity: String, relation: String },

    #[error("many-to-many relation `{relation}` cannot be discovered implicitly; model it with a link entity")]
    ImplicitManyToMany { relation: String },

    #[error("relation `{relation}` uses a composite key and cannot be joined")]
    CompositeKeyNotAllowed { relation: String },

    #[error("geopoint member `{field}` must be a float or decimal field")]
    UnsupportedGeopointType { field: String },

    #[error("default sorting field `{field}` is invalid: {detail}")]
    InvalidDefaultSortingField { field: String, detail: String },

    #[error("`{set}` contains fields that do not belong to the entity: {fields:?}")]
    FieldMismatch { set: &'static str, fields: Vec<String> },
}

/// Non-fatal diagnostics reported alongside a successful derivation.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// Selected fields are not part of the entity's own catalogue.
    FieldMismatch { set: &'static str, fields: Vec<String> },
    /// Faceting a parent relation has no effect unless joins are enabled.
    FacetWithoutJoin { relations: Vec<String> },
    /// The default sorting field is selected but belongs to another entity.
    DefaultSortingFieldOutsideEntity { field: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::FieldMismatch { set, fields } => {
                write!(f, "some fields in `{set}` are not present in the entity: {fields:?}")
            }
            Warning::FacetWithoutJoin { relations } => {
                write!(f, "facets on relations {relations:?} have no effect without joins")
            }
            Warning::DefaultSortingFieldOutsideEntity { field } => {
                write!(f, "default sorting field `{field}` is not present in the entity")
            }
        }
    }
}

/// A value paired with the advisory warnings raised while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Derived<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Derived<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(value: T, warnings: Vec<Warning>) -> Self {
        Self { value, warnings }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Errors raised by [`crate::client::CollectionClient`] implementations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The schema could not be derived.
    #[error("schema derivation failed")]
    Schema(#[from] SchemaError),

    #[error("collection `{name}` already exists")]
    CollectionExists { name: String },

    #[error("collection `{name}` not found")]
    CollectionNotFound { name: String },

    /// The remote service rejected the request.
    #[error("remote error: {message}")]
    Remote { message: String },
}

/// Convenience alias used throughout the engine.
pub type SchemaResult<T> = Result<T, SchemaError>;
