use log::debug;

use crate::engine::resolver::{ResolvedSelection, contains_key, dedup_by_key};
use crate::errors::{Derived, MalformedReason, SchemaResult, Warning};
use crate::spec::{CollectionSpec, Selection};
use crate::types::{Field, FieldDescriptor, RelationDescriptor};

/// Expands `All` to `universe`, or checks that an explicit set is contained in it.
///
/// Members must equal a universe entry; a copy with the right key but altered
/// attributes is outside.
pub fn resolve_subset_or_all(set: &'static str, selection: &Selection<Field>, universe: &[Field]) -> SchemaResult<Vec<Field>> {
    let members = match selection {
        Selection::All => return Ok(universe.to_vec()),
        Selection::Explicit(members) => dedup_by_key(members),
    };
    let outside: Vec<String> = members
        .iter()
        .filter(|member| !universe.contains(member))
        .map(|member| member.key().to_string())
        .collect();
    if !outside.is_empty() {
        return Err(MalformedReason::NotASubset { set, members: outside }.into());
    }
    Ok(members)
}

fn scalars(fields: Vec<Field>) -> Vec<FieldDescriptor> {
    fields.into_iter().filter_map(|field| field.as_scalar().cloned()).collect()
}

fn relations(fields: Vec<Field>) -> Vec<RelationDescriptor> {
    fields.into_iter().filter_map(|field| field.as_relation().cloned()).collect()
}

/// Fills facets, sorting fields and detailed relations of a resolved selection.
pub fn apply(mut selection: ResolvedSelection, spec: &CollectionSpec) -> SchemaResult<Derived<ResolvedSelection>> {
    let facet_universe: Vec<Field> = selection
        .index_fields
        .iter()
        .map(Field::from)
        .chain(selection.parents.iter().map(Field::from))
        .collect();
    let facets = resolve_subset_or_all("facets", &spec.facets, &facet_universe)?;

    // The primary key is emitted as a string, so it never sorts.
    let sort_universe: Vec<Field> = selection
        .scalars()
        .filter(|field| field.storage.is_sortable() && !field.primary_key)
        .map(Field::from)
        .collect();
    let sorting_fields = resolve_subset_or_all("sorting_fields", &spec.sorting_fields, &sort_universe)?;

    let parent_universe: Vec<Field> = selection.parents.iter().map(Field::from).collect();
    let detailed_parents = resolve_subset_or_all("detailed_parents", &spec.detailed_parents, &parent_universe)?;

    let child_universe: Vec<Field> = selection.children.iter().map(Field::from).collect();
    let detailed_children = resolve_subset_or_all("detailed_children", &spec.detailed_children, &child_universe)?;

    let mut warnings = Vec::new();
    let faceted_parents: Vec<String> = facets
        .iter()
        .filter(|facet| contains_key(&parent_universe, &facet.key()))
        .map(|facet| facet.name().to_string())
        .collect();
    if !faceted_parents.is_empty() && !spec.use_joins {
        warnings.push(Warning::FacetWithoutJoin {
            relations: faceted_parents,
        });
    }

    debug!(
        "{} facets, {} sorting fields, {} detailed parents, {} detailed children",
        facets.len(),
        sorting_fields.len(),
        detailed_parents.len(),
        detailed_children.len()
    );

    selection.facets = facets;
    selection.sorting_fields = scalars(sorting_fields);
    selection.detailed_parents = relations(detailed_parents);
    selection.detailed_children = relations(detailed_children);
    Ok(Derived::with_warnings(selection, warnings))
}
