use crate::engine::resolver::ResolvedSelection;
use crate::errors::{MalformedReason, SchemaError, SchemaResult, Warning};
use crate::types::{EntityDescriptor, Field};

fn invalid(field: &Field, detail: &str) -> SchemaError {
    MalformedReason::InvalidDefaultSortingField {
        field: field.key().to_string(),
        detail: detail.to_string(),
    }
    .into()
}

/// Validates the requested default sorting field and returns its output name.
///
/// An empty name means no default sorting field was requested.
pub fn resolve_default_sorting_field(
    entity: &EntityDescriptor,
    selection: &ResolvedSelection,
    requested: Option<&Field>,
) -> SchemaResult<(String, Option<Warning>)> {
    let Some(requested) = requested else {
        return Ok((String::new(), None));
    };
    let Some(field) = requested.as_scalar() else {
        return Err(invalid(requested, "relations cannot be sorted"));
    };
    if field.primary_key {
        return Err(invalid(requested, "the primary key cannot be the default sorting field"));
    }
    if !field.storage.is_sortable() {
        return Err(invalid(requested, "only numeric and date fields can be sorted"));
    }
    let key = field.key();
    if !selection.scalars().any(|selected| selected.key() == key) {
        return Err(invalid(requested, "field is not selected in index_fields or skip_index_fields"));
    }
    if field.nullable {
        return Err(invalid(requested, "optional fields cannot be the default sorting field"));
    }
    if !selection.is_sorted(&key) {
        return Err(invalid(requested, "field is not part of sorting_fields"));
    }

    let warning = (!entity.owns_scalar(field)).then(|| Warning::DefaultSortingFieldOutsideEntity {
        field: key.to_string(),
    });
    Ok((field.name.clone(), warning))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldDescriptor, StorageType};

    fn selection(fields: Vec<FieldDescriptor>) -> ResolvedSelection {
        ResolvedSelection {
            sorting_fields: fields.iter().filter(|f| f.storage.is_sortable()).cloned().collect(),
            index_fields: fields,
            ..ResolvedSelection::default()
        }
    }

    fn entity() -> EntityDescriptor {
        EntityDescriptor::new("Book", "book")
            .with_field("pages", StorageType::Int32)
            .with_field("title", StorageType::Char)
    }

    #[test]
    fn unset_default_is_empty() {
        let (name, warning) = resolve_default_sorting_field(&entity(), &selection(vec![]), None).unwrap();
        assert!(name.is_empty());
        assert!(warning.is_none());
    }

    #[test]
    fn numeric_selected_field_is_accepted() {
        let entity = entity();
        let pages = entity.scalar("pages").unwrap().clone();
        let requested = Field::from(pages.clone());
        let (name, warning) = resolve_default_sorting_field(&entity, &selection(vec![pages]), Some(&requested)).unwrap();
        assert_eq!(name, "pages");
        assert!(warning.is_none());
    }

    #[test]
    fn string_field_is_rejected() {
        let entity = entity();
        let title = entity.scalar("title").unwrap().clone();
        let requested = Field::from(title.clone());
        let err = resolve_default_sorting_field(&entity, &selection(vec![title]), Some(&requested)).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::RequestMalformed(MalformedReason::InvalidDefaultSortingField { .. })
        ));
    }

    #[test]
    fn foreign_selected_field_warns() {
        let number = FieldDescriptor::new("Chapter", "number", StorageType::Int32);
        let requested = Field::from(number.clone());
        let (name, warning) = resolve_default_sorting_field(&entity(), &selection(vec![number]), Some(&requested)).unwrap();
        assert_eq!(name, "number");
        assert!(matches!(warning, Some(Warning::DefaultSortingFieldOutsideEntity { .. })));
    }
}
