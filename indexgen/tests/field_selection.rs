mod support;

use support::*;

#[test]
fn empty_spec_discovers_fields_and_relations() {
    let book = book();
    let schema = derive_ok(&book, &CollectionSpec::default());

    assert_eq!(schema.name, "book");
    assert_eq!(names(&schema), ["title", "pages", "price", "published", "in_print"]);
    assert!(schema.selection.implicit);

    let parents: Vec<_> = schema.selection.parents.iter().map(|p| p.name.as_str()).collect();
    let children: Vec<_> = schema.selection.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(parents, ["author"]);
    assert_eq!(children, ["chapters"]);
}

#[test]
fn explicit_index_fields_disable_relation_discovery() {
    let book = book();
    let spec = CollectionSpec::new().with_index_fields(fields(&book, &["title"]));
    let schema = derive_ok(&book, &spec);

    assert!(!schema.selection.implicit);
    assert_eq!(names(&schema), ["title"]);
    assert!(schema.selection.parents.is_empty());
    assert!(schema.selection.children.is_empty());
}

#[test]
fn explicit_fields_keep_their_order() {
    let book = book();
    let spec = CollectionSpec::new().with_index_fields(fields(&book, &["pages", "title", "price"]));
    assert_eq!(names(&derive_ok(&book, &spec)), ["pages", "title", "price"]);
}

#[test]
fn primary_key_is_only_emitted_with_override_id() {
    let book = book();
    assert!(derive_ok(&book, &CollectionSpec::default()).field("id").is_none());

    let schema = derive_ok(&book, &CollectionSpec::new().with_override_id(true));
    let id = schema.field("id").expect("id emitted");
    assert_eq!(id.field_type, SearchType::String);
    assert!(!id.sort);
}

#[test]
fn repeated_descriptor_is_emitted_once() {
    let book = book();
    let title = field(&book, "title");
    let spec = CollectionSpec::new().with_index_fields([title.clone(), title]);
    assert_eq!(names(&derive_ok(&book, &spec)), ["title"]);
}

#[test]
fn same_name_from_two_entities_is_a_duplicate() {
    let book = book();
    let chapter = chapter();
    let spec = CollectionSpec::new().with_index_fields([field(&book, "title"), field(&chapter, "title")]);
    assert_eq!(
        derive_reason(&book, &spec),
        MalformedReason::DuplicateFieldName {
            name: "title".to_string()
        }
    );
}

#[test]
fn field_in_index_and_skip_sets_is_an_overlap() {
    let book = book();
    let spec = CollectionSpec::new()
        .with_index_fields(fields(&book, &["title", "pages"]))
        .with_skip_index_fields(fields(&book, &["pages"]));
    assert_eq!(
        derive_reason(&book, &spec),
        MalformedReason::Overlap {
            fields: vec!["Book.pages".to_string()]
        }
    );
}

#[test]
fn relations_are_rejected_in_index_fields() {
    let book = book();
    let spec = CollectionSpec::new().with_index_fields(fields(&book, &["title", "author"]));
    assert!(matches!(
        derive_reason(&book, &spec),
        MalformedReason::RelationInIndexFields { .. }
    ));
}

#[test]
fn foreign_fields_warn_by_default() {
    let book = book();
    let chapter = chapter();
    let spec = CollectionSpec::new().with_index_fields([field(&book, "title"), field(&chapter, "number")]);
    let derived = derive(&book, &spec).expect("derivation succeeds");

    assert_eq!(derived.value.field_names(), ["title", "number"]);
    assert_eq!(
        derived.warnings,
        vec![Warning::FieldMismatch {
            set: "index_fields",
            fields: vec!["Chapter.number".to_string()],
        }]
    );
}

#[test]
fn strict_fields_turn_mismatches_into_errors() {
    let book = book();
    let chapter = chapter();
    let spec = CollectionSpec::new()
        .with_index_fields([field(&book, "title"), field(&chapter, "number")])
        .with_strict_fields(true);
    assert!(matches!(
        derive_reason(&book, &spec),
        MalformedReason::FieldMismatch { set: "index_fields", .. }
    ));
}

#[test]
fn skipped_fields_are_emitted_unindexed_after_index_fields() {
    let book = book();
    let spec = CollectionSpec::new().with_skip_index_fields(fields(&book, &["pages"]));
    let schema = derive_ok(&book, &spec);

    assert_eq!(names(&schema), ["title", "price", "published", "in_print", "pages"]);
    let pages = schema.field("pages").expect("pages emitted");
    assert!(!pages.index);
    assert!(schema.field("title").expect("title").index);
}

#[test]
fn skipped_fields_in_explicit_mode() {
    let book = book();
    let spec = CollectionSpec::new()
        .with_index_fields(fields(&book, &["title"]))
        .with_skip_index_fields(fields(&book, &["in_print"]));
    let schema = derive_ok(&book, &spec);
    assert_eq!(names(&schema), ["title", "in_print"]);
    assert!(!schema.field("in_print").expect("in_print").index);
}

#[test]
fn skipped_relation_produces_unindexed_join() {
    let book = book();
    let spec = CollectionSpec::new()
        .with_skip_index_fields(fields(&book, &["author"]))
        .with_joins(true);
    let schema = derive_ok(&book, &spec);
    let join = schema.relation_field("author_id").expect("join emitted");
    assert!(!join.index);
}

#[test]
fn nullable_fields_are_optional() {
    let entity = OptionalFields::entity_descriptor().expect("descriptor");
    let schema = derive_ok(&entity, &CollectionSpec::new().with_joins(true));

    assert!(schema.field("nickname").expect("nickname").optional);
    assert!(schema.field("age").expect("age").optional);
    assert!(!schema.field("score").expect("score").optional);
    assert!(schema.relation_field("mentor_id").expect("join").optional);
}

#[test]
fn derivation_is_deterministic() {
    let book = book();
    let spec = CollectionSpec::new()
        .with_facets(Selection::All)
        .with_detailed_children(Selection::All)
        .with_joins(true);
    assert_eq!(derive(&book, &spec), derive(&book, &spec));
}

fn retyped(entity: &EntityDescriptor, name: &str, storage: StorageType) -> FieldDescriptor {
    let mut field = entity.scalar(name).expect("scalar declared").clone();
    field.storage = storage;
    field
}

#[test]
fn stale_descriptor_copy_warns_as_mismatch() {
    let book = book();
    let spec = CollectionSpec::new().with_index_fields([retyped(&book, "title", StorageType::Int64)]);
    let derived = derive(&book, &spec).expect("derivation succeeds");

    assert_eq!(
        derived.warnings,
        vec![Warning::FieldMismatch {
            set: "index_fields",
            fields: vec!["Book.title".to_string()],
        }]
    );
}

#[test]
fn stale_descriptor_copy_fails_when_strict() {
    let book = book();
    let optional_pages = book.scalar("pages").expect("pages").clone().with_nullable(true);
    let spec = CollectionSpec::new()
        .with_index_fields(vec![Field::from(optional_pages)])
        .with_strict_fields(true);
    assert_eq!(
        derive_reason(&book, &spec),
        MalformedReason::FieldMismatch {
            set: "index_fields",
            fields: vec!["Book.pages".to_string()],
        }
    );
}

#[test]
fn stale_skip_descriptor_warns_as_mismatch() {
    let book = book();
    let spec = CollectionSpec::new().with_skip_index_fields([retyped(&book, "pages", StorageType::Char)]);
    let derived = derive(&book, &spec).expect("derivation succeeds");

    assert!(derived.warnings.contains(&Warning::FieldMismatch {
        set: "skip_index_fields",
        fields: vec!["Book.pages".to_string()],
    }));
}
