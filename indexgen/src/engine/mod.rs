//! # Schema derivation
//!
//! The pipeline that turns an [`EntityDescriptor`] and a [`CollectionSpec`] into a
//! [`ResolvedSchema`]:
//!
//! | Step                     | Module          | Failure                                  |
//! |--------------------------|-----------------|------------------------------------------|
//! | Validate inputs          | this module     | `SchemaError::Config`                    |
//! | Resolve selections       | [`resolver`]    | `RequestMalformed`, `SchemaError::Type`  |
//! | Validate subsets         | [`subset`]      | `RequestMalformed(NotASubset)`           |
//! | Default sorting field    | [`default_sort`]| `RequestMalformed(InvalidDefault...)`    |
//! | Emit relation fields     | [`emitter`]     | `RequestMalformed(CompositeKey...)`      |
//! | Emit scalars / geopoints | [`emitter`]     | `RequestMalformed(UnsupportedType)`      |
//! | Check output names       | [`emitter`]     | `RequestMalformed(DuplicateFieldName)`   |
//!
//! Every step is pure. Warnings from all steps are collected into the returned
//! [`Derived`] and logged at `warn` level.

pub mod classifier;
pub mod default_sort;
pub mod emitter;
pub mod resolver;
pub mod subset;
pub mod type_mapper;

use std::collections::HashSet;

use log::{debug, warn};

use crate::errors::{Derived, SchemaError, SchemaResult};
use crate::schema::ResolvedSchema;
use crate::spec::CollectionSpec;
use crate::types::{EntityDescriptor, FieldDescriptor, IndexEntity, StorageType};

pub use classifier::{RelationRole, classify, ensure_joinable};
pub use resolver::{ResolvedGeopoint, ResolvedSelection};
pub use subset::resolve_subset_or_all;
pub use type_mapper::{SearchType, map_type};

/// Derives the search schema of `entity` under `spec`.
pub fn derive(entity: &EntityDescriptor, spec: &CollectionSpec) -> SchemaResult<Derived<ResolvedSchema>> {
    validate_entity(entity, spec)?;

    let resolved = resolver::resolve(entity, spec)?;
    let mut warnings = resolved.warnings;
    let subsets = subset::apply(resolved.value, spec)?;
    warnings.extend(subsets.warnings);
    let selection = subsets.value;

    let (default_sorting_field, warning) =
        default_sort::resolve_default_sorting_field(entity, &selection, spec.default_sorting_field.as_ref())?;
    warnings.extend(warning);

    let relation_fields = emitter::emit_relations(&selection, spec)?;
    let fields = emitter::emit_fields(&selection)?;
    emitter::ensure_unique_names(&fields, &relation_fields)?;

    let name = spec
        .name
        .clone()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| entity.collection_name());

    for warning in &warnings {
        warn!("{name}: {warning}");
    }
    debug!(
        "derived collection `{name}` with {} fields and {} relation fields",
        fields.len(),
        relation_fields.len()
    );

    let schema = ResolvedSchema {
        name,
        fields,
        relation_fields,
        default_sorting_field,
        token_separators: spec.token_separators.clone(),
        symbols_to_index: spec.symbols_to_index.clone(),
        selection,
    };
    Ok(Derived::with_warnings(schema, warnings))
}

/// Derives the schema of a `#[derive(IndexEntity)]` type.
pub fn derive_for<T: IndexEntity>(spec: &CollectionSpec) -> SchemaResult<Derived<ResolvedSchema>> {
    derive(&T::entity_descriptor()?, spec)
}

fn validate_entity(entity: &EntityDescriptor, spec: &CollectionSpec) -> SchemaResult<()> {
    if entity.name.trim().is_empty() {
        return Err(SchemaError::config("entity name must not be empty"));
    }
    let has_name_override = spec.name.as_deref().is_some_and(|name| !name.is_empty());
    if entity.display_name.trim().is_empty() && !has_name_override {
        return Err(SchemaError::config(format!(
            "entity `{}` has no display name and no collection name was given",
            entity.name
        )));
    }

    let mut names = HashSet::new();
    let members = entity
        .fields
        .iter()
        .map(|field| (field.name.as_str(), field.entity.as_str()))
        .chain(entity.relations.iter().map(|relation| (relation.name.as_str(), relation.entity.as_str())));
    for (name, owner) in members {
        if !names.insert(name) {
            return Err(SchemaError::config(format!(
                "entity `{}` declares `{name}` more than once",
                entity.name
            )));
        }
        if owner != entity.name {
            return Err(SchemaError::config(format!(
                "`{owner}.{name}` is listed in entity `{}`",
                entity.name
            )));
        }
    }

    let primary_keys = entity.fields.iter().filter(|field| field.primary_key).count();
    if primary_keys > 1 {
        return Err(SchemaError::config(format!(
            "entity `{}` declares {primary_keys} primary keys",
            entity.name
        )));
    }

    let targets = entity.relations.iter().map(|relation| &relation.target_field);
    for field in entity.fields.iter().chain(targets) {
        validate_storage(field)?;
    }
    Ok(())
}

fn validate_storage(field: &FieldDescriptor) -> SchemaResult<()> {
    match field.storage {
        StorageType::Decimal { precision, scale } if precision == 0 || precision < scale => Err(SchemaError::config(
            format!("`{}` has invalid decimal precision {precision} and scale {scale}", field.key()),
        )),
        _ => Ok(()),
    }
}
