mod support;

use indexgen::registry::{get_entity_by_name, is_entity_registered};
use support::*;

#[test]
fn storage_is_inferred_from_rust_types() {
    let book = book();
    assert_eq!(book.name, "Book");
    assert_eq!(book.display_name, "book");

    let storage = |name: &str| book.scalar(name).expect("scalar present").storage;
    assert_eq!(storage("id"), StorageType::Int64);
    assert_eq!(storage("title"), StorageType::Text);
    assert_eq!(storage("pages"), StorageType::Int32);
    assert_eq!(storage("price"), StorageType::Decimal { precision: 9, scale: 2 });
    assert_eq!(storage("published"), StorageType::Date);
    assert_eq!(storage("in_print"), StorageType::Boolean);
}

#[test]
fn skipped_and_relation_fields_are_not_scalars() {
    let book = book();
    let scalar_names: Vec<_> = book.fields.iter().map(|field| field.name.as_str()).collect();
    assert_eq!(scalar_names, ["id", "title", "pages", "price", "published", "in_print"]);
    assert!(book.scalar("cover").is_none());
    assert!(book.scalar("author").is_none());
}

#[test]
fn primary_key_is_flagged() {
    let book = book();
    let id = book.primary_key().expect("primary key");
    assert_eq!(id.name, "id");
    assert!(!id.nullable);
    assert_eq!(book.fields.iter().filter(|field| field.primary_key).count(), 1);
}

#[test]
fn option_marks_fields_nullable() {
    let entity = OptionalFields::entity_descriptor().expect("descriptor");
    assert!(entity.scalar("nickname").expect("nickname").nullable);
    assert!(entity.scalar("age").expect("age").nullable);
    assert!(!entity.scalar("score").expect("score").nullable);
    assert!(entity.relation("mentor").expect("mentor").nullable);

    let author = author();
    assert_eq!(author.scalar("born").expect("born").storage, StorageType::Date);
    assert!(author.scalar("born").expect("born").nullable);
}

#[test]
fn relations_point_at_target_primary_key() {
    let book = book();
    let relation = book.relation("author").expect("author relation");
    assert_eq!(relation.kind, RelationKind::BelongsTo);
    assert_eq!(relation.entity, "Book");
    assert_eq!(relation.target, "Author");
    assert_eq!(relation.target_collection, "author");
    assert_eq!(relation.target_field.name, "id");
    assert!(relation.target_field.primary_key);

    let chapters = book.relation("chapters").expect("chapters relation");
    assert_eq!(chapters.kind, RelationKind::HasMany);
    assert_eq!(chapters.target, "Chapter");
}

#[test]
fn relation_options_are_carried() {
    let review = JoinOnAnotherField::entity_descriptor().expect("descriptor");
    let book = review.relation("book").expect("book relation");
    assert_eq!(book.target_field.name, "title");
    assert_eq!(book.target_field.storage, StorageType::Text);

    let edition = CompositeForeignKey::entity_descriptor().expect("descriptor");
    assert!(edition.relation("book").expect("book relation").composite);

    let reader = Reader::entity_descriptor().expect("descriptor");
    let books = reader.relation("books").expect("container relation");
    assert_eq!(books.kind, RelationKind::ManyToMany);
}

#[test]
fn display_name_defaults_to_split_identifier() {
    assert_eq!(JoinOnAnotherField::DISPLAY_NAME, "join on another field");
    assert_eq!(JoinOnAnotherField::collection_name(), "join_on_another_field");
    assert_eq!(GeoPoint::DISPLAY_NAME, "place");
    assert_eq!(VerboseName::collection_name(), "verbose_name");
}

#[test]
fn storage_override_is_applied() {
    let entity = VerboseName::entity_descriptor().expect("descriptor");
    assert_eq!(entity.scalar("contact").expect("contact").storage, StorageType::Email);
}

#[test]
fn derived_entities_are_registered() {
    assert!(is_entity_registered::<Book>());
    let registration = get_entity_by_name("Chapter").expect("chapter registered");
    assert_eq!(registration.display_name, "chapter");
    let descriptor = (registration.descriptor_fn)().expect("descriptor");
    assert_eq!(descriptor, chapter());
}
