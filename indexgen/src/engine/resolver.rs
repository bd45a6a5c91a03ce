use std::collections::HashSet;

use log::debug;

use crate::engine::classifier::{RelationRole, classify};
use crate::errors::{Derived, MalformedReason, SchemaError, SchemaResult, Warning};
use crate::spec::{CollectionSpec, Geopoint};
use crate::types::{EntityDescriptor, Field, FieldDescriptor, FieldKey, RelationDescriptor, RelationKind};

/// A validated latitude/longitude pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGeopoint {
    pub first: FieldDescriptor,
    pub second: FieldDescriptor,
}

impl ResolvedGeopoint {
    pub fn name(&self) -> String {
        format!("{}_{}", self.first.name, self.second.name)
    }

    pub fn members(&self) -> [&FieldDescriptor; 2] {
        [&self.first, &self.second]
    }
}

/// Every selection set after resolution and subset validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSelection {
    /// Fields and relations were discovered from the entity rather than listed.
    pub implicit: bool,
    pub index_fields: Vec<FieldDescriptor>,
    /// Scalars emitted with `index = false` and relations whose join/nested fields are not indexed.
    pub skip_index_fields: Vec<Field>,
    pub parents: Vec<RelationDescriptor>,
    pub children: Vec<RelationDescriptor>,
    pub geopoints: Vec<ResolvedGeopoint>,
    pub facets: Vec<Field>,
    pub sorting_fields: Vec<FieldDescriptor>,
    pub detailed_parents: Vec<RelationDescriptor>,
    pub detailed_children: Vec<RelationDescriptor>,
}

impl ResolvedSelection {
    pub fn skip_scalars(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.skip_index_fields.iter().filter_map(Field::as_scalar)
    }

    pub fn is_skipped(&self, key: &FieldKey) -> bool {
        contains_key(&self.skip_index_fields, key)
    }

    pub fn is_facet(&self, key: &FieldKey) -> bool {
        contains_key(&self.facets, key)
    }

    pub fn is_sorted(&self, key: &FieldKey) -> bool {
        self.sorting_fields.iter().any(|field| &field.key() == key)
    }

    /// Scalars of the index and skip sets, in emission order.
    pub fn scalars(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.index_fields.iter().chain(self.skip_scalars())
    }
}

pub(crate) fn contains_key(fields: &[Field], key: &FieldKey) -> bool {
    fields.iter().any(|field| &field.key() == key)
}

/// Drops repeated references to the same descriptor, keeping the first.
pub(crate) fn dedup_by_key(fields: &[Field]) -> Vec<Field> {
    let mut seen = HashSet::new();
    fields
        .iter()
        .filter(|field| seen.insert(field.key()))
        .cloned()
        .collect()
}

/// Collects mismatches into warnings, or fails on the first set when strict.
struct MismatchCollector {
    strict: bool,
    warnings: Vec<Warning>,
}

impl MismatchCollector {
    fn new(strict: bool) -> Self {
        Self {
            strict,
            warnings: Vec::new(),
        }
    }

    fn report(&mut self, set: &'static str, fields: Vec<String>) -> SchemaResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        if self.strict {
            return Err(MalformedReason::FieldMismatch { set, fields }.into());
        }
        self.warnings.push(Warning::FieldMismatch { set, fields });
        Ok(())
    }
}

fn foreign_members(entity: &EntityDescriptor, fields: &[Field]) -> Vec<String> {
    fields
        .iter()
        .filter(|field| !entity.owns(field))
        .map(|field| field.key().to_string())
        .collect()
}

/// Resolves index, skip, parent, child and geopoint sets for `entity`.
pub fn resolve(entity: &EntityDescriptor, spec: &CollectionSpec) -> SchemaResult<Derived<ResolvedSelection>> {
    let mut mismatches = MismatchCollector::new(spec.strict_fields);
    let skip_index_fields = dedup_by_key(&spec.skip_index_fields);
    mismatches.report("skip_index_fields", foreign_members(entity, &skip_index_fields))?;

    let selection = if spec.is_implicit() {
        debug!("discovering fields of `{}` implicitly", entity.name);
        resolve_implicit(entity, spec, skip_index_fields)?
    } else {
        debug!("using explicit field selection for `{}`", entity.name);
        resolve_explicit(entity, spec, skip_index_fields, &mut mismatches)?
    };

    debug!(
        "resolved {} index, {} skipped, {} parent and {} child members for `{}`",
        selection.index_fields.len(),
        selection.skip_index_fields.len(),
        selection.parents.len(),
        selection.children.len(),
        entity.name
    );
    Ok(Derived::with_warnings(selection, mismatches.warnings))
}

fn resolve_implicit(
    entity: &EntityDescriptor,
    spec: &CollectionSpec,
    skip_index_fields: Vec<Field>,
) -> SchemaResult<ResolvedSelection> {
    let index_fields = entity
        .fields
        .iter()
        .filter(|field| spec.override_id || !field.primary_key)
        .filter(|field| !contains_key(&skip_index_fields, &field.key()))
        .cloned()
        .collect();

    let mut parents = Vec::new();
    let mut children = Vec::new();
    for relation in &entity.relations {
        match classify(relation, entity)? {
            RelationRole::Parent => parents.push(relation.clone()),
            RelationRole::Child => children.push(relation.clone()),
        }
    }

    Ok(ResolvedSelection {
        implicit: true,
        index_fields,
        skip_index_fields,
        parents,
        children,
        ..ResolvedSelection::default()
    })
}

fn resolve_explicit(
    entity: &EntityDescriptor,
    spec: &CollectionSpec,
    skip_index_fields: Vec<Field>,
    mismatches: &mut MismatchCollector,
) -> SchemaResult<ResolvedSelection> {
    let geopoints = spec
        .geopoints
        .iter()
        .map(resolve_geopoint)
        .collect::<SchemaResult<Vec<_>>>()?;

    let requested = dedup_by_key(&spec.index_fields);

    let overlap: Vec<String> = requested
        .iter()
        .filter(|field| contains_key(&skip_index_fields, &field.key()))
        .map(|field| field.key().to_string())
        .collect();
    if !overlap.is_empty() {
        return Err(MalformedReason::Overlap { fields: overlap }.into());
    }

    let geopoint_keys: HashSet<FieldKey> = geopoints
        .iter()
        .flat_map(|geopoint| geopoint.members().map(FieldDescriptor::key))
        .collect();
    let in_geopoints: Vec<String> = requested
        .iter()
        .filter(|field| geopoint_keys.contains(&field.key()))
        .map(|field| field.key().to_string())
        .collect();
    if !in_geopoints.is_empty() {
        return Err(MalformedReason::GeopointInIndexFields { fields: in_geopoints }.into());
    }

    let relations: Vec<String> = requested
        .iter()
        .filter(|field| field.is_relation())
        .map(|field| field.key().to_string())
        .collect();
    if !relations.is_empty() {
        return Err(MalformedReason::RelationInIndexFields { fields: relations }.into());
    }

    let index_fields: Vec<FieldDescriptor> = requested.iter().filter_map(Field::as_scalar).cloned().collect();
    let mut names = HashSet::new();
    if let Some(duplicate) = index_fields.iter().find(|field| !names.insert(field.name.as_str())) {
        return Err(MalformedReason::DuplicateFieldName {
            name: duplicate.name.clone(),
        }
        .into());
    }

    mismatches.report("index_fields", foreign_members(entity, &requested))?;
    let geopoint_members: Vec<Field> = geopoints
        .iter()
        .flat_map(|geopoint| geopoint.members().map(Field::from))
        .collect();
    mismatches.report("geopoints", foreign_members(entity, &geopoint_members))?;

    let parents = resolve_relations(entity, "parents", &spec.parents, RelationKind::BelongsTo)?;
    let children = resolve_relations(entity, "children", &spec.children, RelationKind::HasMany)?;

    Ok(ResolvedSelection {
        implicit: false,
        index_fields,
        skip_index_fields,
        parents,
        children,
        geopoints,
        ..ResolvedSelection::default()
    })
}

fn resolve_geopoint(geopoint: &Geopoint) -> SchemaResult<ResolvedGeopoint> {
    let [first, second] = geopoint.members.as_slice() else {
        return Err(SchemaError::type_error(format!(
            "a geopoint needs exactly two members, got {}",
            geopoint.members.len()
        )));
    };
    let member = |field: &Field| match field {
        Field::Scalar(scalar) if scalar.storage.is_fractional() => Ok(scalar.clone()),
        other => Err(SchemaError::from(MalformedReason::UnsupportedGeopointType {
            field: other.key().to_string(),
        })),
    };
    Ok(ResolvedGeopoint {
        first: member(first)?,
        second: member(second)?,
    })
}

/// The entity's own relation when `member` is identical to it.
fn declared_relation<'a>(entity: &EntityDescriptor, member: &'a Field) -> Option<&'a RelationDescriptor> {
    member.as_relation().filter(|relation| entity.owns_relation(relation))
}

/// Keeps `members` that are `kind` relations declared by `entity`; anything else fails.
///
/// A copy of a declared relation with an altered kind, target or flag is a mismatch.
fn resolve_relations(
    entity: &EntityDescriptor,
    set: &'static str,
    members: &[Field],
    kind: RelationKind,
) -> SchemaResult<Vec<RelationDescriptor>> {
    let members = dedup_by_key(members);
    if let Some(relation) = members
        .iter()
        .filter_map(|member| declared_relation(entity, member))
        .find(|relation| relation.is_self_referential())
    {
        return Err(MalformedReason::SelfReference {
            entity: entity.name.clone(),
            relation: relation.name.clone(),
        }
        .into());
    }

    let mut resolved = Vec::new();
    let mut mismatched = Vec::new();
    for member in &members {
        match declared_relation(entity, member) {
            Some(relation) if relation.kind == kind => resolved.push(relation.clone()),
            _ => mismatched.push(member.key().to_string()),
        }
    }
    if !mismatched.is_empty() {
        return Err(MalformedReason::RelationMismatch {
            set,
            members: mismatched,
        }
        .into());
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StorageType;

    fn book() -> EntityDescriptor {
        let author_id = FieldDescriptor::new("Author", "id", StorageType::Int64).with_primary_key(true);
        let author = RelationDescriptor::new("Book", "author", RelationKind::BelongsTo, "author", author_id);
        EntityDescriptor::new("Book", "book")
            .with_descriptor(FieldDescriptor::new("Book", "id", StorageType::Int64).with_primary_key(true))
            .with_field("title", StorageType::Char)
            .with_field("pages", StorageType::Int32)
            .with_relation(author)
    }

    #[test]
    fn implicit_mode_excludes_primary_key_and_skipped_fields() {
        let entity = book();
        let spec = CollectionSpec::new().with_skip_index_fields([entity.scalar("pages").unwrap()]);
        let resolved = resolve(&entity, &spec).unwrap();
        assert!(resolved.value.implicit);
        let names: Vec<_> = resolved.value.index_fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["title"]);
        assert_eq!(resolved.value.parents.len(), 1);
        assert!(!resolved.has_warnings());
    }

    #[test]
    fn override_id_indexes_primary_key_implicitly() {
        let resolved = resolve(&book(), &CollectionSpec::new().with_override_id(true)).unwrap();
        assert_eq!(resolved.value.index_fields[0].name, "id");
    }

    #[test]
    fn explicit_mode_ignores_override_id() {
        let entity = book();
        let spec = CollectionSpec::new()
            .with_index_fields([entity.scalar("title").unwrap()])
            .with_override_id(true);
        let resolved = resolve(&entity, &spec).unwrap().into_inner();
        assert_eq!(resolved.index_fields.len(), 1);
        assert!(resolved.parents.is_empty());
    }

    #[test]
    fn foreign_fields_warn_unless_strict() {
        let entity = book();
        let foreign = FieldDescriptor::new("Chapter", "number", StorageType::Int32);
        let spec = CollectionSpec::new().with_index_fields([foreign]);
        let resolved = resolve(&entity, &spec).unwrap();
        assert_eq!(resolved.warnings.len(), 1);

        let err = resolve(&entity, &spec.with_strict_fields(true)).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::RequestMalformed(MalformedReason::FieldMismatch { set: "index_fields", .. })
        ));
    }

    #[test]
    fn geopoint_with_three_members_is_a_type_error() {
        let lat = FieldDescriptor::new("Book", "lat", StorageType::Float);
        let spec = CollectionSpec::new().with_geopoint(Geopoint::from_members([lat.clone(), lat.clone(), lat]));
        assert!(matches!(resolve(&book(), &spec).unwrap_err(), SchemaError::Type { .. }));
    }

    #[test]
    fn parent_must_be_belongs_to_relation() {
        let entity = book();
        let title = entity.scalar("title").unwrap().clone();
        let spec = CollectionSpec::new().with_parents([title]);
        let err = resolve(&entity, &spec).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::RequestMalformed(MalformedReason::RelationMismatch { set: "parents", .. })
        ));
    }

    #[test]
    fn rekinded_relation_is_not_a_parent() {
        let entity = book();
        let mut forged = entity.relation("author").unwrap().clone();
        forged.kind = RelationKind::HasMany;
        let err = resolve(&entity, &CollectionSpec::new().with_children([forged])).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::RequestMalformed(MalformedReason::RelationMismatch { set: "children", .. })
        ));
    }

    #[test]
    fn stale_scalar_copy_warns() {
        let entity = book();
        let mut stale = entity.scalar("title").unwrap().clone();
        stale.storage = StorageType::Int64;
        let resolved = resolve(&entity, &CollectionSpec::new().with_index_fields([stale])).unwrap();
        assert_eq!(
            resolved.warnings,
            vec![Warning::FieldMismatch {
                set: "index_fields",
                fields: vec!["Book.title".to_string()],
            }]
        );
    }
}
