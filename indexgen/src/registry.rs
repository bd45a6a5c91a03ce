//! Entity auto-registration via inventory crate.
//!
//! `#[derive(IndexEntity)]` submits one [`EntityRegistration`] per struct, so every
//! derived entity linked into a binary can be listed without naming it.

use std::any::TypeId;

use crate::errors::SchemaResult;
use crate::types::EntityDescriptor;

/// Metadata for auto-discovered entities.
pub struct EntityRegistration {
    /// Returns the TypeId of the entity struct (`TypeId::of` is not const)
    pub type_id_fn: fn() -> TypeId,
    /// The entity name (e.g., "Book")
    pub entity_name: &'static str,
    /// The display name the collection name is derived from (e.g., "book")
    pub display_name: &'static str,
    /// Function to build the entity descriptor
    pub descriptor_fn: fn() -> SchemaResult<EntityDescriptor>,
}

inventory::collect!(EntityRegistration);

/// Get all registered entities.
pub fn registered_entities() -> impl Iterator<Item = &'static EntityRegistration> {
    inventory::iter::<EntityRegistration>()
}

/// Get a registered entity by entity name.
pub fn get_entity_by_name(entity_name: &str) -> Option<&'static EntityRegistration> {
    registered_entities().find(|e| e.entity_name == entity_name)
}

/// Check if an entity type is registered.
pub fn is_entity_registered<T: 'static>() -> bool {
    let type_id = TypeId::of::<T>();
    registered_entities().any(|e| (e.type_id_fn)() == type_id)
}
