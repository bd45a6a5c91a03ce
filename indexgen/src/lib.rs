//! indexgen core library.
//!
//! Derives search collection schemas from relational entity descriptors and
//! validates every selection option against the entity's shape.

extern crate self as indexgen;

pub mod catalog;
pub mod client;
pub mod engine;
pub mod errors;
pub mod naming;
pub mod registry;
pub mod schema;
pub mod spec;
pub mod types;

pub use catalog::{Catalog, CatalogCollection};
pub use client::{CollectionClient, CollectionInfo, MemoryClient, SchemaPatch, SyncOutcome, sync_collection};
pub use engine::{ResolvedSelection, SearchType, derive, derive_for};
pub use errors::*;
pub use indexgen_macros::IndexEntity;
pub use registry::{EntityRegistration, registered_entities};
pub use schema::{CollectionSchema, RelationField, ResolvedSchema, SchemaField, WireField};
pub use spec::{CollectionSpec, Geopoint, Selection};
pub use types::{
    EntityDescriptor, Field, FieldDescriptor, FieldKey, IndexEntity, RelationDescriptor, RelationKind, StorageType,
};

// Re-export inventory for auto-registration in the entity derive macro
pub use inventory;
