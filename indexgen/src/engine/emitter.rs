use std::collections::HashSet;

use crate::engine::classifier::ensure_joinable;
use crate::engine::resolver::{ResolvedGeopoint, ResolvedSelection};
use crate::engine::type_mapper::{SearchType, map_type};
use crate::errors::{MalformedReason, SchemaResult};
use crate::schema::{RelationField, SchemaField};
use crate::spec::CollectionSpec;
use crate::types::{FieldDescriptor, RelationDescriptor};

/// Scalar fields (index set, then skipped scalars) followed by one field per geopoint.
pub fn emit_fields(selection: &ResolvedSelection) -> SchemaResult<Vec<SchemaField>> {
    let mut fields = selection
        .scalars()
        .map(|field| emit_scalar(selection, field))
        .collect::<SchemaResult<Vec<_>>>()?;
    fields.extend(selection.geopoints.iter().map(|geopoint| emit_geopoint(selection, geopoint)));
    Ok(fields)
}

fn emit_scalar(selection: &ResolvedSelection, field: &FieldDescriptor) -> SchemaResult<SchemaField> {
    let key = field.key();
    Ok(SchemaField {
        facet: selection.is_facet(&key),
        sort: selection.is_sorted(&key),
        optional: field.nullable,
        index: !selection.is_skipped(&key),
        ..SchemaField::new(field.name.clone(), map_type(field)?)
    })
}

fn emit_geopoint(selection: &ResolvedSelection, geopoint: &ResolvedGeopoint) -> SchemaField {
    let members = geopoint.members();
    SchemaField {
        facet: members.iter().any(|member| selection.is_facet(&member.key())),
        sort: true,
        optional: members.iter().any(|member| member.nullable),
        index: members.iter().any(|member| !selection.is_skipped(&member.key())),
        ..SchemaField::new(geopoint.name(), SearchType::Geopoint)
    }
}

/// Join fields (with joins enabled), then nested parents, then nested children.
pub fn emit_relations(selection: &ResolvedSelection, spec: &CollectionSpec) -> SchemaResult<Vec<RelationField>> {
    let mut fields = Vec::new();
    if spec.use_joins {
        for parent in &selection.parents {
            fields.push(emit_join(selection, parent)?);
        }
    }
    for parent in &selection.detailed_parents {
        fields.push(emit_nested(selection, parent, SearchType::Object, parent.nullable));
    }
    for child in &selection.detailed_children {
        fields.push(emit_nested(selection, child, SearchType::ObjectArray, true));
    }
    Ok(fields)
}

fn emit_join(selection: &ResolvedSelection, relation: &RelationDescriptor) -> SchemaResult<RelationField> {
    ensure_joinable(relation)?;
    let key = relation.key();
    let target = &relation.target_field;
    Ok(RelationField {
        name: format!("{}_{}", relation.name, target.name),
        field_type: map_type(target)?,
        facet: selection.is_facet(&key),
        index: !selection.is_skipped(&key),
        optional: relation.nullable,
        reference: Some(format!("{}.{}", relation.target_collection, target.name)),
    })
}

fn emit_nested(
    selection: &ResolvedSelection,
    relation: &RelationDescriptor,
    field_type: SearchType,
    optional: bool,
) -> RelationField {
    RelationField {
        name: relation.name.clone(),
        field_type,
        facet: false,
        index: !selection.is_skipped(&relation.key()),
        optional,
        reference: None,
    }
}

/// Fails on the first output name used twice across both field lists.
pub fn ensure_unique_names(fields: &[SchemaField], relation_fields: &[RelationField]) -> SchemaResult<()> {
    let mut seen = HashSet::new();
    let names = fields
        .iter()
        .map(|field| field.name.as_str())
        .chain(relation_fields.iter().map(|field| field.name.as_str()));
    for name in names {
        if !seen.insert(name) {
            return Err(MalformedReason::DuplicateFieldName { name: name.to_string() }.into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SchemaError;
    use crate::types::{Field, RelationKind, StorageType};

    fn author() -> RelationDescriptor {
        let id = FieldDescriptor::new("Author", "id", StorageType::Int64).with_primary_key(true);
        RelationDescriptor::new("Book", "author", RelationKind::BelongsTo, "author", id)
    }

    #[test]
    fn skipped_scalars_follow_index_fields() {
        let title = FieldDescriptor::new("Book", "title", StorageType::Char);
        let pages = FieldDescriptor::new("Book", "pages", StorageType::Int32).with_nullable(true);
        let selection = ResolvedSelection {
            index_fields: vec![title],
            skip_index_fields: vec![Field::from(pages.clone())],
            sorting_fields: vec![pages],
            ..ResolvedSelection::default()
        };
        let fields = emit_fields(&selection).unwrap();
        assert_eq!(fields[0].name, "title");
        assert!(fields[0].index);
        assert_eq!(fields[1].name, "pages");
        assert!(!fields[1].index);
        assert!(fields[1].sort);
        assert!(fields[1].optional);
    }

    #[test]
    fn join_uses_target_collection_and_field() {
        let selection = ResolvedSelection {
            parents: vec![author()],
            ..ResolvedSelection::default()
        };
        let spec = CollectionSpec::new().with_joins(true);
        let fields = emit_relations(&selection, &spec).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "author_id");
        assert_eq!(fields[0].field_type, SearchType::String);
        assert_eq!(fields[0].reference.as_deref(), Some("author.id"));
    }

    #[test]
    fn no_joins_without_flag() {
        let selection = ResolvedSelection {
            parents: vec![author()],
            detailed_parents: vec![author().with_nullable(true)],
            ..ResolvedSelection::default()
        };
        let fields = emit_relations(&selection, &CollectionSpec::new()).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field_type, SearchType::Object);
        assert!(fields[0].optional);
    }

    #[test]
    fn composite_join_is_rejected() {
        let selection = ResolvedSelection {
            parents: vec![author().with_composite(true)],
            ..ResolvedSelection::default()
        };
        let err = emit_relations(&selection, &CollectionSpec::new().with_joins(true)).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::RequestMalformed(MalformedReason::CompositeKeyNotAllowed { .. })
        ));
    }

    #[test]
    fn duplicate_names_across_lists() {
        let fields = vec![SchemaField::new("author", SearchType::String)];
        let relations = vec![RelationField {
            name: "author".to_string(),
            field_type: SearchType::Object,
            facet: false,
            index: true,
            optional: false,
            reference: None,
        }];
        assert!(ensure_unique_names(&fields, &relations).is_err());
        assert!(ensure_unique_names(&fields, &[]).is_ok());
    }
}
